// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The in-memory Avro schema tree: construction, validation, JSON
//! serialization and fingerprinting.

mod canonical;
mod name;
mod parser;

pub use canonical::{canonical_form, fingerprint};
pub use name::{Alias, Name};

pub(crate) use name::{validate_enum_symbol_name, validate_record_field_name};

use crate::error::Details;
use crate::AvroResult;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use strum_macros::EnumDiscriminants;

/// Represents documentation for complex Avro schemas.
pub type Documentation = Option<String>;

/// Represents any valid Avro schema.
///
/// More information about Avro schemas can be found in the
/// [Avro Specification](https://avro.apache.org/docs/++version++/specification/#schema-declaration)
#[derive(Clone, Debug, EnumDiscriminants)]
#[strum_discriminants(name(SchemaKind), derive(Hash, Ord, PartialOrd))]
pub enum Schema {
    /// A `null` Avro schema.
    Null,
    /// A `boolean` Avro schema.
    Boolean,
    /// An `int` Avro schema, optionally annotated with a logical type.
    Int { logical: Option<LogicalType> },
    /// A `long` Avro schema, optionally annotated with a logical type.
    Long { logical: Option<LogicalType> },
    /// A `float` Avro schema.
    Float,
    /// A `double` Avro schema.
    Double,
    /// A `bytes` Avro schema, optionally annotated with a logical type.
    Bytes { logical: Option<LogicalType> },
    /// A `string` Avro schema, optionally annotated with a logical type.
    String { logical: Option<LogicalType> },
    /// An `array` Avro schema. All items have the same schema.
    Array(Box<Schema>),
    /// A `map` Avro schema. Keys are always strings.
    Map(Box<Schema>),
    /// A `union` Avro schema.
    Union(UnionSchema),
    /// A `record` Avro schema.
    Record(RecordSchema),
    /// An `enum` Avro schema.
    Enum(EnumSchema),
    /// A `fixed` Avro schema.
    Fixed(FixedSchema),
    /// A reference to a named schema defined elsewhere in the same tree.
    Ref { name: Name },
}

/// A semantic tag layered on an underlying primitive or fixed type.
///
/// Logical types do not change the wire format; they are carried in the JSON
/// representation and stripped from the Parsing Canonical Form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogicalType {
    /// Days since the unix epoch, on `int`.
    Date,
    /// Milliseconds after midnight, on `int`.
    TimeMillis,
    /// Microseconds after midnight, on `long`.
    TimeMicros,
    /// Milliseconds since the unix epoch, on `long`.
    TimestampMillis,
    /// Microseconds since the unix epoch, on `long`.
    TimestampMicros,
    /// Local-time milliseconds since the unix epoch, on `long`.
    LocalTimestampMillis,
    /// Local-time microseconds since the unix epoch, on `long`.
    LocalTimestampMicros,
    /// Arbitrary-precision decimal, on `bytes` or `fixed`.
    Decimal { precision: usize, scale: usize },
    /// RFC 4122 UUID, on `string`.
    Uuid,
    /// Months/days/milliseconds duration, on `fixed` of size 12.
    Duration,
}

impl LogicalType {
    /// The `logicalType` tag as it appears in schema JSON.
    pub fn tag(&self) -> &'static str {
        match self {
            LogicalType::Date => "date",
            LogicalType::TimeMillis => "time-millis",
            LogicalType::TimeMicros => "time-micros",
            LogicalType::TimestampMillis => "timestamp-millis",
            LogicalType::TimestampMicros => "timestamp-micros",
            LogicalType::LocalTimestampMillis => "local-timestamp-millis",
            LogicalType::LocalTimestampMicros => "local-timestamp-micros",
            LogicalType::Decimal { .. } => "decimal",
            LogicalType::Uuid => "uuid",
            LogicalType::Duration => "duration",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A schema-level default literal, as found in record fields.
///
/// This is a closed sum: defaults for record-typed fields are expressed with
/// the `Map` variant, matching their JSON object form.
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    /// An enum symbol.
    Enum(String),
    Array(Vec<DefaultValue>),
    Map(Vec<(String, DefaultValue)>),
    /// A union default; parsed JSON defaults always target branch 0.
    Union(usize, Box<DefaultValue>),
}

impl DefaultValue {
    /// The JSON form of the default, as emitted back into schema JSON.
    ///
    /// Bytes map to a string of code points 0-255 and a union default is
    /// written as its branch value, both per the Avro specification.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Value as Json};
        match self {
            DefaultValue::Null => Json::Null,
            DefaultValue::Boolean(b) => json!(b),
            DefaultValue::Int(n) => json!(n),
            DefaultValue::Long(n) => json!(n),
            DefaultValue::Float(x) => serde_json::Number::from_f64(f64::from(*x))
                .map(Json::Number)
                .unwrap_or(Json::Null),
            DefaultValue::Double(x) => serde_json::Number::from_f64(*x)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            DefaultValue::Bytes(bytes) => {
                Json::String(bytes.iter().map(|&b| b as char).collect())
            }
            DefaultValue::String(s) => Json::String(s.clone()),
            DefaultValue::Enum(symbol) => Json::String(symbol.clone()),
            DefaultValue::Array(items) => {
                Json::Array(items.iter().map(DefaultValue::to_json).collect())
            }
            DefaultValue::Map(pairs) => Json::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            DefaultValue::Union(_, inner) => inner.to_json(),
        }
    }
}

/// An ordered sequence of union branch schemas.
#[derive(Clone, Debug)]
pub struct UnionSchema {
    schemas: Vec<Schema>,
}

impl UnionSchema {
    /// Build a union, rejecting empty unions, directly nested unions and
    /// branches that are duplicates by type key (primitive tag or fullname).
    pub fn new(schemas: Vec<Schema>) -> AvroResult<Self> {
        if schemas.is_empty() {
            return Err(Details::EmptyUnion.into());
        }
        let mut keys = HashSet::with_capacity(schemas.len());
        for schema in &schemas {
            if matches!(schema, Schema::Union(_)) {
                return Err(Details::GetNestedUnion.into());
            }
            if !keys.insert(schema.type_key()) {
                return Err(Details::GetUnionDuplicate.into());
            }
        }
        Ok(Self { schemas })
    }

    pub fn variants(&self) -> &[Schema] {
        &self.schemas
    }

    /// Whether the union has `null` as its first branch.
    pub fn is_nullable(&self) -> bool {
        matches!(self.schemas.first(), Some(Schema::Null))
    }
}

/// A field of a record schema.
#[derive(Clone, Debug)]
pub struct RecordField {
    pub name: String,
    pub doc: Documentation,
    pub aliases: Vec<String>,
    pub default: Option<DefaultValue>,
    pub schema: Schema,
}

/// A description of a record schema.
#[derive(bon::Builder, Clone, Debug)]
pub struct RecordSchema {
    /// The name of the schema.
    pub name: Name,
    /// The aliases of the schema.
    #[builder(default)]
    pub aliases: Vec<Alias>,
    /// The documentation of the schema.
    #[builder(default)]
    pub doc: Documentation,
    /// The fields of the schema, in declaration order.
    pub fields: Vec<RecordField>,
}

/// A description of an enum schema.
#[derive(bon::Builder, Clone, Debug)]
pub struct EnumSchema {
    /// The name of the schema.
    pub name: Name,
    /// The aliases of the schema.
    #[builder(default)]
    pub aliases: Vec<Alias>,
    /// The documentation of the schema.
    #[builder(default)]
    pub doc: Documentation,
    /// The set of symbols of the schema.
    pub symbols: Vec<String>,
    /// An optional default symbol used for compatibility.
    pub default: Option<String>,
}

/// A description of a fixed schema.
#[derive(bon::Builder, Clone, Debug)]
pub struct FixedSchema {
    /// The name of the schema.
    pub name: Name,
    /// The aliases of the schema.
    #[builder(default)]
    pub aliases: Vec<Alias>,
    /// The documentation of the schema.
    #[builder(default)]
    pub doc: Documentation,
    /// The number of bytes of the fixed schema.
    pub size: usize,
    /// An optional logical type annotation.
    pub logical: Option<LogicalType>,
}

impl Schema {
    /// An unannotated `int` schema.
    pub fn int() -> Schema {
        Schema::Int { logical: None }
    }

    /// An unannotated `long` schema.
    pub fn long() -> Schema {
        Schema::Long { logical: None }
    }

    /// An unannotated `bytes` schema.
    pub fn bytes() -> Schema {
        Schema::Bytes { logical: None }
    }

    /// An unannotated `string` schema.
    pub fn string() -> Schema {
        Schema::String { logical: None }
    }

    /// An `array` schema with the given item schema.
    pub fn array(items: Schema) -> Schema {
        Schema::Array(Box::new(items))
    }

    /// A `map` schema with the given value schema.
    pub fn map(values: Schema) -> Schema {
        Schema::Map(Box::new(values))
    }

    /// Create a `Schema` from a string representing a JSON Avro schema.
    pub fn parse_str(input: &str) -> AvroResult<Schema> {
        parser::parse_str(input)
    }

    /// Create a `Schema` from an already parsed JSON tree.
    pub fn parse(value: &serde_json::Value) -> AvroResult<Schema> {
        parser::parse(value)
    }

    /// Attach a logical type to an annotatable primitive or a fixed schema.
    ///
    /// Other schemas are returned unchanged.
    pub fn with_logical(self, logical: LogicalType) -> Schema {
        match self {
            Schema::Int { .. } => Schema::Int {
                logical: Some(logical),
            },
            Schema::Long { .. } => Schema::Long {
                logical: Some(logical),
            },
            Schema::Bytes { .. } => Schema::Bytes {
                logical: Some(logical),
            },
            Schema::String { .. } => Schema::String {
                logical: Some(logical),
            },
            Schema::Fixed(fixed) => Schema::Fixed(FixedSchema {
                logical: Some(logical),
                ..fixed
            }),
            other => other,
        }
    }

    /// The logical type annotation, if any.
    pub fn logical_type(&self) -> Option<&LogicalType> {
        match self {
            Schema::Int { logical }
            | Schema::Long { logical }
            | Schema::Bytes { logical }
            | Schema::String { logical } => logical.as_ref(),
            Schema::Fixed(fixed) => fixed.logical.as_ref(),
            _ => None,
        }
    }

    /// The name of a named schema (record, enum, fixed or reference).
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Record(RecordSchema { name, .. })
            | Schema::Enum(EnumSchema { name, .. })
            | Schema::Fixed(FixedSchema { name, .. })
            | Schema::Ref { name } => Some(name),
            _ => None,
        }
    }

    /// The fullname of a named schema.
    pub fn fullname(&self) -> Option<String> {
        self.name().map(|n| n.fullname(None))
    }

    /// The aliases of a named schema.
    pub fn aliases(&self) -> Option<&[Alias]> {
        match self {
            Schema::Record(RecordSchema { aliases, .. })
            | Schema::Enum(EnumSchema { aliases, .. })
            | Schema::Fixed(FixedSchema { aliases, .. }) => Some(aliases),
            _ => None,
        }
    }

    pub fn is_named(&self) -> bool {
        self.name().is_some()
    }

    /// Converts `self` into its [Parsing Canonical Form].
    ///
    /// [Parsing Canonical Form]:
    /// https://avro.apache.org/docs/++version++/specification/#parsing-canonical-form-for-schemas
    pub fn canonical_form(&self) -> String {
        canonical_form(self)
    }

    /// The CRC-64-AVRO fingerprint of the schema's Parsing Canonical Form.
    pub fn fingerprint(&self) -> u64 {
        fingerprint(self)
    }

    /// Check the structural invariants of the schema tree, reporting the
    /// first violation found.
    pub fn validate(&self) -> AvroResult<()> {
        let mut defined = HashSet::new();
        let mut referenced = Vec::new();
        self.validate_inner(&mut defined, &mut referenced)?;
        for name in referenced {
            if !defined.contains(&name) {
                return Err(Details::SchemaRefNotFound(name).into());
            }
        }
        Ok(())
    }

    fn validate_inner(
        &self,
        defined: &mut HashSet<String>,
        referenced: &mut Vec<String>,
    ) -> AvroResult<()> {
        match self {
            Schema::Null
            | Schema::Boolean
            | Schema::Int { .. }
            | Schema::Long { .. }
            | Schema::Float
            | Schema::Double
            | Schema::Bytes { .. }
            | Schema::String { .. } => Ok(()),
            Schema::Array(items) => items.validate_inner(defined, referenced),
            Schema::Map(values) => values.validate_inner(defined, referenced),
            Schema::Union(union) => {
                let mut keys = HashSet::with_capacity(union.variants().len());
                for branch in union.variants() {
                    if matches!(branch, Schema::Union(_)) {
                        return Err(Details::GetNestedUnion.into());
                    }
                    if !keys.insert(branch.type_key()) {
                        return Err(Details::GetUnionDuplicate.into());
                    }
                    branch.validate_inner(defined, referenced)?;
                }
                Ok(())
            }
            Schema::Record(record) => {
                let fullname = record.name.fullname(None);
                if !defined.insert(fullname.clone()) {
                    return Err(Details::SchemaRedefinition(fullname).into());
                }
                if record.fields.is_empty() {
                    return Err(Details::EmptyRecordFields(fullname).into());
                }
                let mut field_names = HashSet::with_capacity(record.fields.len());
                for field in &record.fields {
                    validate_record_field_name(&field.name)?;
                    if !field_names.insert(field.name.as_str()) {
                        return Err(Details::FieldNameDuplicate(field.name.clone()).into());
                    }
                    field.schema.validate_inner(defined, referenced)?;
                }
                Ok(())
            }
            Schema::Enum(enumeration) => {
                let fullname = enumeration.name.fullname(None);
                if !defined.insert(fullname.clone()) {
                    return Err(Details::SchemaRedefinition(fullname).into());
                }
                if enumeration.symbols.is_empty() {
                    return Err(Details::EmptyEnumSymbols(fullname).into());
                }
                let mut symbols = HashSet::with_capacity(enumeration.symbols.len());
                for symbol in &enumeration.symbols {
                    validate_enum_symbol_name(symbol)?;
                    if !symbols.insert(symbol.as_str()) {
                        return Err(Details::EnumSymbolDuplicate(symbol.clone()).into());
                    }
                }
                if let Some(default) = &enumeration.default {
                    if !enumeration.symbols.contains(default) {
                        return Err(Details::EnumDefaultUnknown {
                            symbol: default.clone(),
                            name: fullname,
                        }
                        .into());
                    }
                }
                Ok(())
            }
            Schema::Fixed(fixed) => {
                let fullname = fixed.name.fullname(None);
                if !defined.insert(fullname.clone()) {
                    return Err(Details::SchemaRedefinition(fullname).into());
                }
                if fixed.size == 0 {
                    return Err(Details::FixedSizeZero(fullname).into());
                }
                Ok(())
            }
            Schema::Ref { name } => {
                referenced.push(name.fullname(None));
                Ok(())
            }
        }
    }

    /// Collect all named type definitions of the tree, keyed by fullname.
    pub(crate) fn collect_named<'s>(&'s self, names: &mut HashMap<String, &'s Schema>) {
        match self {
            Schema::Array(items) | Schema::Map(items) => items.collect_named(names),
            Schema::Union(union) => {
                for branch in union.variants() {
                    branch.collect_named(names);
                }
            }
            Schema::Record(record) => {
                names.insert(record.name.fullname(None), self);
                for field in &record.fields {
                    field.schema.collect_named(names);
                }
            }
            Schema::Enum(enumeration) => {
                names.insert(enumeration.name.fullname(None), self);
            }
            Schema::Fixed(fixed) => {
                names.insert(fixed.name.fullname(None), self);
            }
            _ => {}
        }
    }

    /// The key under which a schema competes for uniqueness inside a union:
    /// the fullname for named types, the type tag otherwise.
    fn type_key(&self) -> String {
        match self.fullname() {
            Some(fullname) => fullname,
            None => format!("{:?}", SchemaKind::from(self)),
        }
    }
}

impl fmt::Display for Schema {
    /// The full JSON representation of the schema.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl PartialEq for Schema {
    /// Assess equality of two `Schema`s based on the Parsing Canonical Form.
    fn eq(&self, other: &Self) -> bool {
        self.canonical_form() == other.canonical_form()
    }
}

impl Serialize for Alias {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.fullname(None))
    }
}

impl Serialize for RecordField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", &self.schema)?;
        if let Some(default) = &self.default {
            map.serialize_entry("default", &default.to_json())?;
        }
        if let Some(doc) = &self.doc {
            map.serialize_entry("doc", doc)?;
        }
        if !self.aliases.is_empty() {
            map.serialize_entry("aliases", &self.aliases)?;
        }
        map.end()
    }
}

fn serialize_annotated<S>(
    serializer: S,
    primitive: &str,
    logical: &Option<LogicalType>,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match logical {
        None => serializer.serialize_str(primitive),
        Some(logical) => {
            let mut map = serializer.serialize_map(None)?;
            map.serialize_entry("type", primitive)?;
            map.serialize_entry("logicalType", logical.tag())?;
            if let LogicalType::Decimal { precision, scale } = logical {
                map.serialize_entry("precision", precision)?;
                map.serialize_entry("scale", scale)?;
            }
            map.end()
        }
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Schema::Null => serializer.serialize_str("null"),
            Schema::Boolean => serializer.serialize_str("boolean"),
            Schema::Int { logical } => serialize_annotated(serializer, "int", logical),
            Schema::Long { logical } => serialize_annotated(serializer, "long", logical),
            Schema::Float => serializer.serialize_str("float"),
            Schema::Double => serializer.serialize_str("double"),
            Schema::Bytes { logical } => serialize_annotated(serializer, "bytes", logical),
            Schema::String { logical } => serialize_annotated(serializer, "string", logical),
            Schema::Array(items) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items)?;
                map.end()
            }
            Schema::Map(values) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("values", values)?;
                map.end()
            }
            Schema::Union(union) => {
                let mut seq = serializer.serialize_seq(Some(union.variants().len()))?;
                for branch in union.variants() {
                    seq.serialize_element(branch)?;
                }
                seq.end()
            }
            Schema::Record(record) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "record")?;
                map.serialize_entry("name", record.name.name())?;
                if let Some(namespace) = record.name.namespace() {
                    map.serialize_entry("namespace", namespace)?;
                }
                if let Some(doc) = &record.doc {
                    map.serialize_entry("doc", doc)?;
                }
                map.serialize_entry("fields", &record.fields)?;
                if !record.aliases.is_empty() {
                    map.serialize_entry("aliases", &record.aliases)?;
                }
                map.end()
            }
            Schema::Enum(enumeration) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "enum")?;
                map.serialize_entry("name", enumeration.name.name())?;
                if let Some(namespace) = enumeration.name.namespace() {
                    map.serialize_entry("namespace", namespace)?;
                }
                if let Some(doc) = &enumeration.doc {
                    map.serialize_entry("doc", doc)?;
                }
                map.serialize_entry("symbols", &enumeration.symbols)?;
                if let Some(default) = &enumeration.default {
                    map.serialize_entry("default", default)?;
                }
                if !enumeration.aliases.is_empty() {
                    map.serialize_entry("aliases", &enumeration.aliases)?;
                }
                map.end()
            }
            Schema::Fixed(fixed) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "fixed")?;
                map.serialize_entry("name", fixed.name.name())?;
                if let Some(namespace) = fixed.name.namespace() {
                    map.serialize_entry("namespace", namespace)?;
                }
                if let Some(doc) = &fixed.doc {
                    map.serialize_entry("doc", doc)?;
                }
                map.serialize_entry("size", &fixed.size)?;
                if let Some(logical) = &fixed.logical {
                    map.serialize_entry("logicalType", logical.tag())?;
                    if let LogicalType::Decimal { precision, scale } = logical {
                        map.serialize_entry("precision", precision)?;
                        map.serialize_entry("scale", scale)?;
                    }
                }
                if !fixed.aliases.is_empty() {
                    map.serialize_entry("aliases", &fixed.aliases)?;
                }
                map.end()
            }
            Schema::Ref { name } => serializer.serialize_str(&name.fullname(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn person_schema() -> Schema {
        Schema::Record(
            RecordSchema::builder()
                .name(Name::new("Person").unwrap())
                .fields(vec![
                    RecordField {
                        name: "name".to_string(),
                        doc: None,
                        aliases: vec![],
                        default: None,
                        schema: Schema::string(),
                    },
                    RecordField {
                        name: "age".to_string(),
                        doc: None,
                        aliases: vec![],
                        default: Some(DefaultValue::Int(0)),
                        schema: Schema::int(),
                    },
                ])
                .build(),
        )
    }

    #[test]
    fn test_validate_accepts_record() -> TestResult {
        person_schema().validate()?;
        Ok(())
    }

    #[test]
    fn test_validate_rejects_duplicate_fields() {
        let schema = Schema::Record(
            RecordSchema::builder()
                .name(Name::new("Dup").unwrap())
                .fields(vec![
                    RecordField {
                        name: "x".to_string(),
                        doc: None,
                        aliases: vec![],
                        default: None,
                        schema: Schema::int(),
                    },
                    RecordField {
                        name: "x".to_string(),
                        doc: None,
                        aliases: vec![],
                        default: None,
                        schema: Schema::long(),
                    },
                ])
                .build(),
        );
        match schema.validate().map_err(Error::into_details) {
            Err(Details::FieldNameDuplicate(name)) => assert_eq!(name, "x"),
            other => panic!("expected FieldNameDuplicate, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_sized_fixed() {
        let schema = Schema::Fixed(
            FixedSchema::builder()
                .name(Name::new("Empty").unwrap())
                .size(0)
                .build(),
        );
        assert!(matches!(
            schema.validate().map_err(Error::into_details),
            Err(Details::FixedSizeZero(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_union_branches() {
        assert!(matches!(
            UnionSchema::new(vec![Schema::int(), Schema::int()])
                .map_err(Error::into_details),
            Err(Details::GetUnionDuplicate)
        ));
    }

    #[test]
    fn test_validate_rejects_nested_union() {
        let inner = UnionSchema::new(vec![Schema::Null, Schema::int()]).unwrap();
        assert!(matches!(
            UnionSchema::new(vec![Schema::Union(inner), Schema::string()])
                .map_err(Error::into_details),
            Err(Details::GetNestedUnion)
        ));
    }

    #[test]
    fn test_validate_rejects_unresolved_ref() {
        let schema = Schema::Record(
            RecordSchema::builder()
                .name(Name::new("Node").unwrap())
                .fields(vec![RecordField {
                    name: "next".to_string(),
                    doc: None,
                    aliases: vec![],
                    default: None,
                    schema: Schema::Ref {
                        name: Name::new("Elsewhere").unwrap(),
                    },
                }])
                .build(),
        );
        assert!(matches!(
            schema.validate().map_err(Error::into_details),
            Err(Details::SchemaRefNotFound(_))
        ));
    }

    #[test]
    fn test_with_logical_annotates_primitives_only() {
        let date = Schema::int().with_logical(LogicalType::Date);
        assert_eq!(date.logical_type(), Some(&LogicalType::Date));

        let unchanged = Schema::Double.with_logical(LogicalType::Date);
        assert_eq!(unchanged.logical_type(), None);
    }

    #[test]
    fn test_display_matches_json() -> TestResult {
        let schema = Schema::array(Schema::string());
        assert_eq!(schema.to_string(), r#"{"type":"array","items":"string"}"#);
        Ok(())
    }

    #[test]
    fn test_union_serializes_as_json_array() -> TestResult {
        let schema = Schema::Union(UnionSchema::new(vec![Schema::Null, Schema::long()])?);
        assert_eq!(schema.to_string(), r#"["null","long"]"#);
        Ok(())
    }

    #[test]
    fn test_logical_type_round_trips_through_json() -> TestResult {
        let schema = Schema::long().with_logical(LogicalType::TimestampMicros);
        assert_eq!(
            schema.to_string(),
            r#"{"type":"long","logicalType":"timestamp-micros"}"#
        );
        let reparsed = Schema::parse_str(&schema.to_string())?;
        assert_eq!(
            reparsed.logical_type(),
            Some(&LogicalType::TimestampMicros)
        );
        Ok(())
    }

    #[test]
    fn test_schemas_equal_by_canonical_form() -> TestResult {
        let with_doc = Schema::Record(
            RecordSchema::builder()
                .name(Name::new("Person").unwrap())
                .doc(Some("A person".to_string()))
                .fields(vec![RecordField {
                    name: "name".to_string(),
                    doc: Some("their name".to_string()),
                    aliases: vec![],
                    default: None,
                    schema: Schema::string(),
                }])
                .build(),
        );
        let without_doc = Schema::Record(
            RecordSchema::builder()
                .name(Name::new("Person").unwrap())
                .fields(vec![RecordField {
                    name: "name".to_string(),
                    doc: None,
                    aliases: vec![],
                    default: None,
                    schema: Schema::string(),
                }])
                .build(),
        );
        assert_eq!(with_doc, without_doc);
        Ok(())
    }
}
