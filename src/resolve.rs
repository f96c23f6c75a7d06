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

//! Schema resolution: fusing a reader schema with a writer schema into a
//! [`ReadPlan`] the generic decoder can interpret.
//!
//! Resolution is a compile step executed once per `(reader, writer)` pair.
//! The plan follows the writer's wire layout and carries everything needed
//! to produce values in the reader's shape: numeric promotions, record field
//! positions and defaults, enum symbol remapping and union routing.

use crate::error::ResolutionError;
use crate::schema::{Alias, Name, Schema, SchemaKind};
use crate::value::Value;
use crate::AvroResult;
use std::collections::HashMap;

/// The output of [`resolve`]: a plan for the root schema plus a table of
/// plans for named types, consulted when the plan re-enters a recursive type.
#[derive(Clone, Debug)]
pub struct ReadPlan {
    pub(crate) root: Plan,
    pub(crate) named: HashMap<String, Plan>,
}

impl ReadPlan {
    /// The plan for the schema root.
    pub fn root(&self) -> &Plan {
        &self.root
    }

    /// Decode one datum against this plan.
    pub fn decode(&self, source: &mut crate::io::Source<'_>) -> AvroResult<Value> {
        crate::decode::decode_with_plan(self, source)
    }
}

/// One node of a read plan. Leaves are promotion-aware: `IntAsLong` reads
/// the writer's `int` wire format and widens it to the reader's `long`.
#[derive(Clone, Debug, PartialEq)]
pub enum Plan {
    Null,
    Boolean,
    Int,
    IntAsLong,
    IntAsFloat,
    IntAsDouble,
    Long,
    LongAsFloat,
    LongAsDouble,
    Float,
    FloatAsDouble,
    Double,
    Bytes,
    String,
    Fixed(FixedPlan),
    Array(Box<Plan>),
    Map(Box<Plan>),
    Record(RecordPlan),
    Enum(EnumPlan),
    /// Writer union read by a reader union: indexed by writer branch,
    /// yielding the reader branch index and the branch plan.
    Union(Vec<(usize, Plan)>),
    /// Writer non-union read by a reader union.
    AsUnion(usize, Box<Plan>),
    /// Writer union read by a reader non-union; the value is unwrapped.
    UnwrapUnion(Vec<Plan>),
    /// Re-entry into a named type, resolved through the plan table.
    NamedRef(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FixedPlan {
    pub name: String,
    pub size: usize,
}

/// Record plan: writer fields in writer order, then defaults for reader-only
/// fields.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordPlan {
    pub name: String,
    pub fields: Vec<FieldPlan>,
    pub defaults: Vec<DefaultPlan>,
    /// Total number of reader fields the decoded record must carry.
    pub reader_fields: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldPlan {
    /// The reader's field name when the field is kept, the writer's when it
    /// is decoded and discarded.
    pub name: String,
    pub plan: Plan,
    /// Position in the reader's field list; `None` means the field exists
    /// only in the writer and its value is dropped after decoding.
    pub reader_position: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DefaultPlan {
    pub reader_position: usize,
    pub name: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumPlan {
    pub name: String,
    pub symbols: Vec<String>,
    /// Reader symbol index for each writer symbol index.
    pub symbol_map: Vec<usize>,
}

/// Produce a read plan for data written with `writer` and read as `reader`.
pub fn resolve(reader: &Schema, writer: &Schema) -> AvroResult<ReadPlan> {
    let mut reader_names = HashMap::new();
    reader.collect_named(&mut reader_names);
    let mut writer_names = HashMap::new();
    writer.collect_named(&mut writer_names);

    let mut resolver = Resolver {
        reader_names,
        writer_names,
        env: HashMap::new(),
        named: HashMap::new(),
    };
    let root = resolver.resolve(reader, writer, false)?;
    Ok(ReadPlan {
        root,
        named: resolver.named,
    })
}

struct Resolver<'s> {
    reader_names: HashMap<String, &'s Schema>,
    writer_names: HashMap<String, &'s Schema>,
    /// Named-type environment: writer fullname -> reader fullname, entered
    /// before descending into a named type's body so recursive references
    /// collapse to [`Plan::NamedRef`].
    env: HashMap<String, String>,
    named: HashMap<String, Plan>,
}

impl<'s> Resolver<'s> {
    /// `discard` marks self-resolution of a writer-only field: both sides
    /// are the writer's schema and reader references dereference through the
    /// writer's name table.
    fn resolve(
        &mut self,
        reader: &'s Schema,
        writer: &'s Schema,
        discard: bool,
    ) -> AvroResult<Plan> {
        // Dereference a reader-side named reference.
        let reader = match reader {
            Schema::Ref { name } => {
                let fullname = name.fullname(None);
                let names = if discard {
                    &self.writer_names
                } else {
                    &self.reader_names
                };
                *names
                    .get(&fullname)
                    .ok_or(ResolutionError::NamedTypeUnresolved { name: fullname })?
            }
            other => other,
        };

        // A writer-side reference either re-enters a type already being
        // resolved, or names a definition elsewhere in the writer tree.
        let writer = match writer {
            Schema::Ref { name } => {
                let fullname = name.fullname(None);
                match self.env.get(&fullname) {
                    // A union reader routes the reference through the branch
                    // search below, which recurses back here per branch.
                    Some(_) if matches!(reader, Schema::Union(_)) => writer,
                    Some(mapped_reader) => {
                        let reader_fullname = reader.fullname().unwrap_or_default();
                        if discard || &reader_fullname == mapped_reader {
                            return Ok(Plan::NamedRef(fullname));
                        }
                        return Err(mismatch(reader, writer).into());
                    }
                    None => *self
                        .writer_names
                        .get(&fullname)
                        .ok_or(ResolutionError::NamedTypeUnresolved { name: fullname })?,
                }
            }
            other => other,
        };

        match (reader, writer) {
            (Schema::Null, Schema::Null) => Ok(Plan::Null),
            (Schema::Boolean, Schema::Boolean) => Ok(Plan::Boolean),

            // The numeric promotion matrix.
            (Schema::Int { .. }, Schema::Int { .. }) => Ok(Plan::Int),
            (Schema::Long { .. }, Schema::Int { .. }) => Ok(Plan::IntAsLong),
            (Schema::Long { .. }, Schema::Long { .. }) => Ok(Plan::Long),
            (Schema::Float, Schema::Int { .. }) => Ok(Plan::IntAsFloat),
            (Schema::Float, Schema::Long { .. }) => Ok(Plan::LongAsFloat),
            (Schema::Float, Schema::Float) => Ok(Plan::Float),
            (Schema::Double, Schema::Int { .. }) => Ok(Plan::IntAsDouble),
            (Schema::Double, Schema::Long { .. }) => Ok(Plan::LongAsDouble),
            (Schema::Double, Schema::Float) => Ok(Plan::FloatAsDouble),
            (Schema::Double, Schema::Double) => Ok(Plan::Double),

            // bytes and string share a wire format and read as each other.
            (Schema::Bytes { .. }, Schema::Bytes { .. } | Schema::String { .. }) => {
                Ok(Plan::Bytes)
            }
            (Schema::String { .. }, Schema::String { .. } | Schema::Bytes { .. }) => {
                Ok(Plan::String)
            }

            (Schema::Array(reader_items), Schema::Array(writer_items)) => Ok(Plan::Array(
                Box::new(self.resolve(reader_items, writer_items, discard)?),
            )),
            (Schema::Map(reader_values), Schema::Map(writer_values)) => Ok(Plan::Map(Box::new(
                self.resolve(reader_values, writer_values, discard)?,
            ))),

            (Schema::Union(reader_union), Schema::Union(writer_union)) => {
                let mut branches = Vec::with_capacity(writer_union.variants().len());
                for writer_branch in writer_union.variants() {
                    branches
                        .push(self.first_matching_branch(reader_union.variants(), writer_branch, discard)?);
                }
                Ok(Plan::Union(branches))
            }
            (Schema::Union(reader_union), writer_branch) => {
                let (index, plan) =
                    self.first_matching_branch(reader_union.variants(), writer_branch, discard)?;
                Ok(Plan::AsUnion(index, Box::new(plan)))
            }
            (reader_nonunion, Schema::Union(writer_union)) => {
                let mut branches = Vec::with_capacity(writer_union.variants().len());
                for writer_branch in writer_union.variants() {
                    branches.push(self.resolve(reader_nonunion, writer_branch, discard)?);
                }
                Ok(Plan::UnwrapUnion(branches))
            }

            (Schema::Record(reader_record), Schema::Record(writer_record)) => {
                if !names_compatible(
                    &reader_record.name,
                    &reader_record.aliases,
                    &writer_record.name,
                ) {
                    return Err(mismatch(reader, writer).into());
                }
                let reader_fullname = reader_record.name.fullname(None);
                let writer_fullname = writer_record.name.fullname(None);
                self.env
                    .insert(writer_fullname.clone(), reader_fullname.clone());

                let mut fields = Vec::with_capacity(writer_record.fields.len());
                let mut consumed = vec![false; reader_record.fields.len()];
                for writer_field in &writer_record.fields {
                    let matched = reader_record.fields.iter().enumerate().find(|(_, rf)| {
                        rf.name == writer_field.name
                            || rf.aliases.iter().any(|a| a == &writer_field.name)
                    });
                    match matched {
                        Some((position, reader_field)) => {
                            let plan = self
                                .resolve(&reader_field.schema, &writer_field.schema, discard)
                                .map_err(|_| ResolutionError::FieldMismatch {
                                    record: reader_fullname.clone(),
                                    field: writer_field.name.clone(),
                                })?;
                            consumed[position] = true;
                            fields.push(FieldPlan {
                                name: reader_field.name.clone(),
                                plan,
                                reader_position: Some(position),
                            });
                        }
                        None => {
                            // Writer-only field: decode it with its own
                            // schema and throw the value away.
                            let plan =
                                self.resolve(&writer_field.schema, &writer_field.schema, true)?;
                            fields.push(FieldPlan {
                                name: writer_field.name.clone(),
                                plan,
                                reader_position: None,
                            });
                        }
                    }
                }

                let mut defaults = Vec::new();
                for (position, reader_field) in reader_record.fields.iter().enumerate() {
                    if consumed[position] {
                        continue;
                    }
                    let default = reader_field.default.as_ref().ok_or_else(|| {
                        ResolutionError::MissingField {
                            record: reader_fullname.clone(),
                            field: reader_field.name.clone(),
                        }
                    })?;
                    defaults.push(DefaultPlan {
                        reader_position: position,
                        name: reader_field.name.clone(),
                        value: Value::from_default(default, &reader_field.schema)?,
                    });
                }

                let plan = Plan::Record(RecordPlan {
                    name: reader_fullname,
                    fields,
                    defaults,
                    reader_fields: reader_record.fields.len(),
                });
                self.named.insert(writer_fullname, plan.clone());
                Ok(plan)
            }

            (Schema::Enum(reader_enum), Schema::Enum(writer_enum)) => {
                if !names_compatible(&reader_enum.name, &reader_enum.aliases, &writer_enum.name) {
                    return Err(mismatch(reader, writer).into());
                }
                let default_index = reader_enum
                    .default
                    .as_ref()
                    .and_then(|d| reader_enum.symbols.iter().position(|s| s == d));
                let symbol_map = writer_enum
                    .symbols
                    .iter()
                    .map(|symbol| {
                        reader_enum
                            .symbols
                            .iter()
                            .position(|s| s == symbol)
                            .or(default_index)
                            .ok_or(ResolutionError::MissingSymbol {
                                symbol: symbol.clone(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let reader_fullname = reader_enum.name.fullname(None);
                let writer_fullname = writer_enum.name.fullname(None);
                self.env
                    .insert(writer_fullname.clone(), reader_fullname.clone());
                let plan = Plan::Enum(EnumPlan {
                    name: reader_fullname,
                    symbols: reader_enum.symbols.clone(),
                    symbol_map,
                });
                self.named.insert(writer_fullname, plan.clone());
                Ok(plan)
            }

            (Schema::Fixed(reader_fixed), Schema::Fixed(writer_fixed)) => {
                if !names_compatible(&reader_fixed.name, &reader_fixed.aliases, &writer_fixed.name)
                {
                    return Err(mismatch(reader, writer).into());
                }
                let reader_fullname = reader_fixed.name.fullname(None);
                if reader_fixed.size != writer_fixed.size {
                    return Err(ResolutionError::FixedSizeMismatch {
                        name: reader_fullname,
                        reader: reader_fixed.size,
                        writer: writer_fixed.size,
                    }
                    .into());
                }
                let writer_fullname = writer_fixed.name.fullname(None);
                self.env
                    .insert(writer_fullname.clone(), reader_fullname.clone());
                let plan = Plan::Fixed(FixedPlan {
                    name: reader_fullname,
                    size: reader_fixed.size,
                });
                self.named.insert(writer_fullname, plan.clone());
                Ok(plan)
            }

            (reader, writer) => Err(mismatch(reader, writer).into()),
        }
    }

    /// Search reader branches in order for the first that resolves against
    /// the writer branch, undoing any partial state a failed attempt left.
    fn first_matching_branch(
        &mut self,
        reader_branches: &'s [Schema],
        writer_branch: &'s Schema,
        discard: bool,
    ) -> AvroResult<(usize, Plan)> {
        for (index, reader_branch) in reader_branches.iter().enumerate() {
            let env_snapshot = self.env.clone();
            let named_snapshot = self.named.clone();
            match self.resolve(reader_branch, writer_branch, discard) {
                Ok(plan) => return Ok((index, plan)),
                Err(_) => {
                    self.env = env_snapshot;
                    self.named = named_snapshot;
                }
            }
        }
        Err(ResolutionError::MissingUnionBranch {
            name: schema_label(writer_branch),
        }
        .into())
    }
}

/// The name-compatibility rule for records, enums and fixeds: equal base
/// names, or the writer's fullname appears among the reader's aliases. A
/// simple alias matches the writer's base name; a qualified one must match
/// the writer's fullname.
fn names_compatible(reader_name: &Name, reader_aliases: &[Alias], writer_name: &Name) -> bool {
    if reader_name.name() == writer_name.name() {
        return true;
    }
    reader_aliases.iter().any(|alias| match alias.namespace() {
        Some(_) => alias.fullname(None) == writer_name.fullname(None),
        None => alias.name() == writer_name.name(),
    })
}

fn mismatch(reader: &Schema, writer: &Schema) -> ResolutionError {
    ResolutionError::TypeMismatch {
        reader: SchemaKind::from(reader),
        writer: SchemaKind::from(writer),
    }
}

fn schema_label(schema: &Schema) -> String {
    schema
        .fullname()
        .unwrap_or_else(|| format!("{:?}", SchemaKind::from(schema)).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Details, Error};
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn parse(json: &str) -> Schema {
        Schema::parse_str(json).unwrap()
    }

    fn resolution_error(result: AvroResult<ReadPlan>) -> ResolutionError {
        match result.err().map(Error::into_details) {
            Some(Details::Resolution(err)) => err,
            other => panic!("expected a resolution error, got {other:?}"),
        }
    }

    #[test]
    fn test_identity_resolution_is_pointwise() -> TestResult {
        let schema = parse(
            r#"{
                "type": "record",
                "name": "Person",
                "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "age", "type": "int"}
                ]
            }"#,
        );
        let plan = resolve(&schema, &schema)?;
        let Plan::Record(record) = plan.root() else {
            panic!("expected a record plan");
        };
        assert_eq!(record.reader_fields, 2);
        assert!(record.defaults.is_empty());
        assert_eq!(record.fields[0].plan, Plan::String);
        assert_eq!(record.fields[0].reader_position, Some(0));
        assert_eq!(record.fields[1].plan, Plan::Int);
        assert_eq!(record.fields[1].reader_position, Some(1));
        Ok(())
    }

    #[test]
    fn test_promotion_matrix() -> TestResult {
        for (reader, writer, expected) in [
            ("\"long\"", "\"int\"", Plan::IntAsLong),
            ("\"float\"", "\"int\"", Plan::IntAsFloat),
            ("\"double\"", "\"int\"", Plan::IntAsDouble),
            ("\"float\"", "\"long\"", Plan::LongAsFloat),
            ("\"double\"", "\"long\"", Plan::LongAsDouble),
            ("\"double\"", "\"float\"", Plan::FloatAsDouble),
            ("\"bytes\"", "\"string\"", Plan::Bytes),
            ("\"string\"", "\"bytes\"", Plan::String),
        ] {
            let plan = resolve(&parse(reader), &parse(writer))?;
            assert_eq!(plan.root(), &expected, "{reader} <- {writer}");
        }
        Ok(())
    }

    #[test]
    fn test_narrowing_is_rejected() {
        let result = resolve(&parse("\"int\""), &parse("\"long\""));
        assert_eq!(
            resolution_error(result),
            ResolutionError::TypeMismatch {
                reader: SchemaKind::Int,
                writer: SchemaKind::Long
            }
        );
    }

    #[test]
    fn test_missing_reader_field_needs_default() {
        let writer = parse(
            r#"{"type": "record", "name": "Person",
                "fields": [{"name": "name", "type": "string"}]}"#,
        );
        let reader = parse(
            r#"{"type": "record", "name": "Person",
                "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "age", "type": "int"}
                ]}"#,
        );
        assert_eq!(
            resolution_error(resolve(&reader, &writer)),
            ResolutionError::MissingField {
                record: "Person".to_string(),
                field: "age".to_string()
            }
        );
    }

    #[test]
    fn test_added_field_with_default_plans_a_lift() -> TestResult {
        let writer = parse(
            r#"{"type": "record", "name": "Person",
                "fields": [{"name": "name", "type": "string"}]}"#,
        );
        let reader = parse(
            r#"{"type": "record", "name": "Person",
                "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "age", "type": "int", "default": 0}
                ]}"#,
        );
        let plan = resolve(&reader, &writer)?;
        let Plan::Record(record) = plan.root() else {
            panic!("expected a record plan");
        };
        assert_eq!(record.defaults.len(), 1);
        assert_eq!(record.defaults[0].reader_position, 1);
        assert_eq!(record.defaults[0].value, Value::Int(0));
        Ok(())
    }

    #[test]
    fn test_writer_only_field_is_discarded() -> TestResult {
        let writer = parse(
            r#"{"type": "record", "name": "Person",
                "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "ssn", "type": "string"}
                ]}"#,
        );
        let reader = parse(
            r#"{"type": "record", "name": "Person",
                "fields": [{"name": "name", "type": "string"}]}"#,
        );
        let plan = resolve(&reader, &writer)?;
        let Plan::Record(record) = plan.root() else {
            panic!("expected a record plan");
        };
        assert_eq!(record.fields[1].reader_position, None);
        assert_eq!(record.reader_fields, 1);
        Ok(())
    }

    #[test]
    fn test_field_reordering_keeps_writer_order() -> TestResult {
        let writer = parse(
            r#"{"type": "record", "name": "Pair",
                "fields": [
                    {"name": "a", "type": "int"},
                    {"name": "b", "type": "string"}
                ]}"#,
        );
        let reader = parse(
            r#"{"type": "record", "name": "Pair",
                "fields": [
                    {"name": "b", "type": "string"},
                    {"name": "a", "type": "int"}
                ]}"#,
        );
        let plan = resolve(&reader, &writer)?;
        let Plan::Record(record) = plan.root() else {
            panic!("expected a record plan");
        };
        // Wire order is the writer's; reader positions do the reordering.
        assert_eq!(record.fields[0].name, "a");
        assert_eq!(record.fields[0].reader_position, Some(1));
        assert_eq!(record.fields[1].name, "b");
        assert_eq!(record.fields[1].reader_position, Some(0));
        Ok(())
    }

    #[test]
    fn test_field_alias_matches_writer_name() -> TestResult {
        let writer = parse(
            r#"{"type": "record", "name": "Person",
                "fields": [{"name": "name", "type": "string"}]}"#,
        );
        let reader = parse(
            r#"{"type": "record", "name": "Person",
                "fields": [
                    {"name": "full_name", "type": "string", "aliases": ["name"]}
                ]}"#,
        );
        let plan = resolve(&reader, &writer)?;
        let Plan::Record(record) = plan.root() else {
            panic!("expected a record plan");
        };
        assert_eq!(record.fields[0].name, "full_name");
        assert_eq!(record.fields[0].reader_position, Some(0));
        Ok(())
    }

    #[test]
    fn test_record_alias_matches_renamed_writer() -> TestResult {
        let writer = parse(
            r#"{"type": "record", "name": "Employee",
                "fields": [{"name": "name", "type": "string"}]}"#,
        );
        let reader = parse(
            r#"{"type": "record", "name": "Person", "aliases": ["Employee"],
                "fields": [{"name": "name", "type": "string"}]}"#,
        );
        assert!(resolve(&reader, &writer).is_ok());

        let unrelated = parse(
            r#"{"type": "record", "name": "Company",
                "fields": [{"name": "name", "type": "string"}]}"#,
        );
        assert!(matches!(
            resolution_error(resolve(&unrelated, &writer)),
            ResolutionError::TypeMismatch { .. }
        ));
        Ok(())
    }

    #[test]
    fn test_enum_reordering_maps_writer_indices() -> TestResult {
        let writer = parse(
            r#"{"type": "enum", "name": "Color",
                "symbols": ["GREEN", "BLUE", "RED"]}"#,
        );
        let reader = parse(
            r#"{"type": "enum", "name": "Color",
                "symbols": ["RED", "GREEN", "BLUE"]}"#,
        );
        let plan = resolve(&reader, &writer)?;
        let Plan::Enum(enum_plan) = plan.root() else {
            panic!("expected an enum plan");
        };
        assert_eq!(enum_plan.symbol_map, vec![1, 2, 0]);
        Ok(())
    }

    #[test]
    fn test_unknown_symbol_uses_reader_default() -> TestResult {
        let writer = parse(
            r#"{"type": "enum", "name": "Color",
                "symbols": ["RED", "ULTRAVIOLET"]}"#,
        );
        let reader = parse(
            r#"{"type": "enum", "name": "Color",
                "symbols": ["RED", "OTHER"], "default": "OTHER"}"#,
        );
        let plan = resolve(&reader, &writer)?;
        let Plan::Enum(enum_plan) = plan.root() else {
            panic!("expected an enum plan");
        };
        assert_eq!(enum_plan.symbol_map, vec![0, 1]);

        let strict_reader = parse(
            r#"{"type": "enum", "name": "Color", "symbols": ["RED", "OTHER"]}"#,
        );
        assert_eq!(
            resolution_error(resolve(&strict_reader, &writer)),
            ResolutionError::MissingSymbol {
                symbol: "ULTRAVIOLET".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn test_fixed_size_mismatch_is_its_own_error() {
        let writer = parse(r#"{"type": "fixed", "name": "Hash", "size": 16}"#);
        let reader = parse(r#"{"type": "fixed", "name": "Hash", "size": 32}"#);
        assert_eq!(
            resolution_error(resolve(&reader, &writer)),
            ResolutionError::FixedSizeMismatch {
                name: "Hash".to_string(),
                reader: 32,
                writer: 16
            }
        );
    }

    #[test]
    fn test_union_to_union_routes_branches() -> TestResult {
        let writer = parse(r#"["int", "string"]"#);
        let reader = parse(r#"["string", "long"]"#);
        let plan = resolve(&reader, &writer)?;
        let Plan::Union(branches) = plan.root() else {
            panic!("expected a union plan");
        };
        // Writer int goes to reader long (index 1), promoted.
        assert_eq!(branches[0], (1, Plan::IntAsLong));
        assert_eq!(branches[1], (0, Plan::String));
        Ok(())
    }

    #[test]
    fn test_nonunion_writer_into_union_reader() -> TestResult {
        let writer = parse("\"int\"");
        let reader = parse(r#"["null", "long"]"#);
        let plan = resolve(&reader, &writer)?;
        assert_eq!(plan.root(), &Plan::AsUnion(1, Box::new(Plan::IntAsLong)));
        Ok(())
    }

    #[test]
    fn test_union_writer_into_nonunion_reader() -> TestResult {
        let writer = parse(r#"["int", "long"]"#);
        let reader = parse("\"double\"");
        let plan = resolve(&reader, &writer)?;
        assert_eq!(
            plan.root(),
            &Plan::UnwrapUnion(vec![Plan::IntAsDouble, Plan::LongAsDouble])
        );
        Ok(())
    }

    #[test]
    fn test_union_branch_without_home_fails() {
        let writer = parse(r#"["int", "bytes"]"#);
        let reader = parse(r#"["long"]"#);
        assert_eq!(
            resolution_error(resolve(&reader, &writer)),
            ResolutionError::MissingUnionBranch {
                name: "bytes".to_string()
            }
        );
    }

    #[test]
    fn test_containers_resolve_elementwise() -> TestResult {
        let plan = resolve(&parse(r#"{"type": "array", "items": "long"}"#),
                           &parse(r#"{"type": "array", "items": "int"}"#))?;
        assert_eq!(plan.root(), &Plan::Array(Box::new(Plan::IntAsLong)));

        let plan = resolve(&parse(r#"{"type": "map", "values": "double"}"#),
                           &parse(r#"{"type": "map", "values": "float"}"#))?;
        assert_eq!(plan.root(), &Plan::Map(Box::new(Plan::FloatAsDouble)));

        // Element mismatch fails the whole container.
        assert!(matches!(
            resolution_error(resolve(
                &parse(r#"{"type": "array", "items": "int"}"#),
                &parse(r#"{"type": "array", "items": "string"}"#)
            )),
            ResolutionError::TypeMismatch { .. }
        ));
        Ok(())
    }

    #[test]
    fn test_recursive_record_resolves_to_named_ref() -> TestResult {
        let schema = parse(
            r#"{"type": "record", "name": "Node",
                "fields": [
                    {"name": "value", "type": "long"},
                    {"name": "next", "type": ["null", "Node"]}
                ]}"#,
        );
        let plan = resolve(&schema, &schema)?;
        let Plan::Record(record) = plan.root() else {
            panic!("expected a record plan");
        };
        let Plan::Union(branches) = &record.fields[1].plan else {
            panic!("expected a union plan");
        };
        assert_eq!(branches[1], (1, Plan::NamedRef("Node".to_string())));
        assert!(plan.named.contains_key("Node"));
        Ok(())
    }
}
