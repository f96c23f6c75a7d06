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

//! Parsing of JSON Avro schemas into [`Schema`] trees.

use crate::error::Details;
use crate::schema::{
    validate_record_field_name, Alias, DefaultValue, EnumSchema, FixedSchema, LogicalType, Name,
    RecordField, RecordSchema, Schema, SchemaKind, UnionSchema,
};
use crate::AvroResult;
use log::warn;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

pub(crate) fn parse_str(input: &str) -> AvroResult<Schema> {
    let value = serde_json::from_str(input).map_err(Details::ParseSchemaJson)?;
    parse(&value)
}

pub(crate) fn parse(value: &JsonValue) -> AvroResult<Schema> {
    let mut parser = Parser::default();
    let schema = parser.parse(value, None)?;
    schema.validate()?;
    Ok(schema)
}

/// Accessors over a JSON object, named after the schema keys they fetch.
trait MapHelper {
    fn string(&self, key: &str) -> Option<String>;

    fn name(&self) -> Option<String> {
        self.string("name")
    }

    fn doc(&self) -> Option<String> {
        self.string("doc")
    }

    fn alias_strings(&self) -> Option<Vec<String>>;
}

impl MapHelper for Map<String, JsonValue> {
    fn string(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
    }

    fn alias_strings(&self) -> Option<Vec<String>> {
        self.get("aliases")
            .and_then(|aliases| aliases.as_array())
            .and_then(|aliases| {
                aliases
                    .iter()
                    .map(|alias| alias.as_str().map(|a| a.to_string()))
                    .collect::<Option<_>>()
            })
    }
}

#[derive(Default)]
struct Parser {
    /// Fullnames of named types defined so far, to resolve references and
    /// detect redefinitions.
    defined_names: HashSet<String>,
}

impl Parser {
    fn parse(&mut self, value: &JsonValue, enclosing_namespace: Option<&str>) -> AvroResult<Schema> {
        match value {
            JsonValue::String(t) => self.parse_known_schema(t.as_str(), enclosing_namespace),
            JsonValue::Object(data) => self.parse_complex(data, enclosing_namespace),
            JsonValue::Array(data) => self.parse_union(data, enclosing_namespace),
            _ => Err(Details::ParseSchemaFromValidJson.into()),
        }
    }

    /// Parse a string as a primitive type or a reference to an already
    /// defined named type.
    fn parse_known_schema(
        &mut self,
        name: &str,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        match name {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            "int" => Ok(Schema::int()),
            "long" => Ok(Schema::long()),
            "double" => Ok(Schema::Double),
            "float" => Ok(Schema::Float),
            "bytes" => Ok(Schema::bytes()),
            "string" => Ok(Schema::string()),
            _ => {
                let name = Name::new_with_enclosing_namespace(name, enclosing_namespace)?;
                if self.defined_names.contains(&name.fullname(None)) {
                    Ok(Schema::Ref { name })
                } else {
                    Err(Details::ParsePrimitive(name.fullname(None)).into())
                }
            }
        }
    }

    fn parse_union(
        &mut self,
        branches: &[JsonValue],
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let schemas = branches
            .iter()
            .map(|branch| self.parse(branch, enclosing_namespace))
            .collect::<AvroResult<Vec<_>>>()?;
        Ok(Schema::Union(UnionSchema::new(schemas)?))
    }

    fn parse_complex(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        match complex.get("type") {
            Some(JsonValue::String(t)) => match t.as_str() {
                "record" => self.parse_record(complex, enclosing_namespace),
                "enum" => self.parse_enum(complex, enclosing_namespace),
                "fixed" => self.parse_fixed(complex, enclosing_namespace),
                "array" => {
                    let items = complex.get("items").ok_or(Details::GetArrayItemsField)?;
                    Ok(Schema::array(self.parse(items, enclosing_namespace)?))
                }
                "map" => {
                    let values = complex.get("values").ok_or(Details::GetMapValuesField)?;
                    Ok(Schema::map(self.parse(values, enclosing_namespace)?))
                }
                primitive => {
                    let schema = self.parse_known_schema(primitive, enclosing_namespace)?;
                    Ok(annotate_logical(schema, complex))
                }
            },
            // Avro supports nested type definitions, e.g. {"type": {"type": "string"}}.
            Some(nested @ (JsonValue::Object(_) | JsonValue::Array(_))) => {
                self.parse(nested, enclosing_namespace)
            }
            Some(other) => Err(Details::GetComplexType(other.clone()).into()),
            None => Err(Details::GetComplexTypeField.into()),
        }
    }

    fn parse_name(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Name> {
        let name_field = complex.name().ok_or(Details::GetNameField)?;
        let name = Name::new_with_enclosing_namespace(
            &name_field,
            complex.string("namespace").as_deref().or(enclosing_namespace),
        )?;
        let fullname = name.fullname(None);
        if !self.defined_names.insert(fullname.clone()) {
            return Err(Details::SchemaRedefinition(fullname).into());
        }
        Ok(name)
    }

    fn parse_aliases(&self, complex: &Map<String, JsonValue>) -> AvroResult<Vec<Alias>> {
        complex
            .alias_strings()
            .unwrap_or_default()
            .iter()
            .map(|alias| Alias::new(alias))
            .collect()
    }

    fn parse_record(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let name = self.parse_name(complex, enclosing_namespace)?;
        let aliases = self.parse_aliases(complex)?;
        // Nested unqualified named types live in this record's namespace;
        // the enclosing namespace is restored when this call returns.
        let namespace = name.namespace().map(|ns| ns.to_string());

        let fields_json = complex
            .get("fields")
            .and_then(|f| f.as_array())
            .ok_or(Details::GetRecordFields)?;

        let mut fields = Vec::with_capacity(fields_json.len());
        for field in fields_json {
            let field = field.as_object().ok_or(Details::GetRecordFields)?;
            let field_name = field.name().ok_or(Details::GetNameField)?;
            validate_record_field_name(&field_name)?;

            let schema = field
                .get("type")
                .map(|t| self.parse(t, namespace.as_deref()))
                .transpose()?
                .ok_or(Details::GetComplexTypeField)?;

            let default = field
                .get("default")
                .map(|json| parse_default(json, &schema))
                .transpose()?;

            fields.push(RecordField {
                name: field_name,
                doc: field.doc(),
                aliases: field.alias_strings().unwrap_or_default(),
                default,
                schema,
            });
        }

        Ok(Schema::Record(
            RecordSchema::builder()
                .name(name)
                .aliases(aliases)
                .doc(complex.doc())
                .fields(fields)
                .build(),
        ))
    }

    fn parse_enum(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let name = self.parse_name(complex, enclosing_namespace)?;
        let aliases = self.parse_aliases(complex)?;

        let symbols = complex
            .get("symbols")
            .and_then(|s| s.as_array())
            .ok_or(Details::GetEnumSymbolsField)?
            .iter()
            .map(|symbol| symbol.as_str().map(|s| s.to_string()))
            .collect::<Option<Vec<_>>>()
            .ok_or(Details::GetEnumSymbolsField)?;

        Ok(Schema::Enum(
            EnumSchema::builder()
                .name(name)
                .aliases(aliases)
                .doc(complex.doc())
                .symbols(symbols)
                .maybe_default(complex.string("default"))
                .build(),
        ))
    }

    fn parse_fixed(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let name = self.parse_name(complex, enclosing_namespace)?;
        let aliases = self.parse_aliases(complex)?;

        let size = complex
            .get("size")
            .and_then(|s| s.as_u64())
            .ok_or(Details::GetFixedSizeField)? as usize;

        let fixed = Schema::Fixed(
            FixedSchema::builder()
                .name(name)
                .aliases(aliases)
                .doc(complex.doc())
                .size(size)
                .build(),
        );
        Ok(annotate_logical(fixed, complex))
    }
}

/// Recognize a `logicalType` tag on an annotatable schema; tags that don't
/// fit their underlying type are ignored with a warning, as are unknown tags.
fn annotate_logical(schema: Schema, complex: &Map<String, JsonValue>) -> Schema {
    let Some(tag) = complex.get("logicalType").and_then(|v| v.as_str()) else {
        return schema;
    };
    let logical = match (tag, &schema) {
        ("date", Schema::Int { .. }) => Some(LogicalType::Date),
        ("time-millis", Schema::Int { .. }) => Some(LogicalType::TimeMillis),
        ("time-micros", Schema::Long { .. }) => Some(LogicalType::TimeMicros),
        ("timestamp-millis", Schema::Long { .. }) => Some(LogicalType::TimestampMillis),
        ("timestamp-micros", Schema::Long { .. }) => Some(LogicalType::TimestampMicros),
        ("local-timestamp-millis", Schema::Long { .. }) => Some(LogicalType::LocalTimestampMillis),
        ("local-timestamp-micros", Schema::Long { .. }) => Some(LogicalType::LocalTimestampMicros),
        ("uuid", Schema::String { .. }) => Some(LogicalType::Uuid),
        ("decimal", Schema::Bytes { .. } | Schema::Fixed(_)) => parse_decimal(complex),
        ("duration", Schema::Fixed(fixed)) if fixed.size == 12 => Some(LogicalType::Duration),
        _ => None,
    };
    match logical {
        Some(logical) => schema.with_logical(logical),
        None => {
            warn!("Ignoring invalid logical type '{tag}' on {:?}", SchemaKind::from(&schema));
            schema
        }
    }
}

fn parse_decimal(complex: &Map<String, JsonValue>) -> Option<LogicalType> {
    let precision = complex.get("precision").and_then(|v| v.as_u64())? as usize;
    let scale = complex
        .get("scale")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize;
    if precision == 0 || scale > precision {
        return None;
    }
    Some(LogicalType::Decimal { precision, scale })
}

/// Parse a JSON default literal against the schema of its field.
pub(crate) fn parse_default(json: &JsonValue, schema: &Schema) -> AvroResult<DefaultValue> {
    let mismatch = || {
        Details::DefaultValueMismatch {
            kind: SchemaKind::from(schema),
            value: json.clone(),
        }
        .into()
    };
    match schema {
        Schema::Null => match json {
            JsonValue::Null => Ok(DefaultValue::Null),
            _ => Err(mismatch()),
        },
        Schema::Boolean => json
            .as_bool()
            .map(DefaultValue::Boolean)
            .ok_or_else(mismatch),
        Schema::Int { .. } => json
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(DefaultValue::Int)
            .ok_or_else(mismatch),
        Schema::Long { .. } => json.as_i64().map(DefaultValue::Long).ok_or_else(mismatch),
        Schema::Float => json
            .as_f64()
            .map(|x| DefaultValue::Float(x as f32))
            .ok_or_else(mismatch),
        Schema::Double => json.as_f64().map(DefaultValue::Double).ok_or_else(mismatch),
        Schema::Bytes { .. } | Schema::Fixed(_) => match json {
            // Byte defaults are strings of code points 0-255.
            JsonValue::String(s) => s
                .chars()
                .map(|c| u8::try_from(u32::from(c)).ok())
                .collect::<Option<Vec<u8>>>()
                .map(DefaultValue::Bytes)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        Schema::String { .. } => match json {
            JsonValue::String(s) => Ok(DefaultValue::String(s.clone())),
            _ => Err(mismatch()),
        },
        Schema::Enum(enumeration) => match json {
            JsonValue::String(symbol) if enumeration.symbols.contains(symbol) => {
                Ok(DefaultValue::Enum(symbol.clone()))
            }
            _ => Err(mismatch()),
        },
        Schema::Array(items) => match json {
            JsonValue::Array(values) => values
                .iter()
                .map(|v| parse_default(v, items))
                .collect::<AvroResult<Vec<_>>>()
                .map(DefaultValue::Array),
            _ => Err(mismatch()),
        },
        Schema::Map(values_schema) => match json {
            JsonValue::Object(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), parse_default(v, values_schema)?)))
                .collect::<AvroResult<Vec<_>>>()
                .map(DefaultValue::Map),
            _ => Err(mismatch()),
        },
        // A union default is matched against the first branch.
        Schema::Union(union) => {
            let first = union.variants().first().ok_or_else(mismatch)?;
            let inner = parse_default(json, first)?;
            Ok(DefaultValue::Union(0, Box::new(inner)))
        }
        Schema::Record(record) => match json {
            JsonValue::Object(entries) => {
                let mut pairs = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let value = match entries.get(&field.name) {
                        Some(v) => parse_default(v, &field.schema)?,
                        None => field.default.clone().ok_or_else(mismatch)?,
                    };
                    pairs.push((field.name.clone(), value));
                }
                Ok(DefaultValue::Map(pairs))
            }
            _ => Err(mismatch()),
        },
        Schema::Ref { .. } => Err(mismatch()),
    }
}
