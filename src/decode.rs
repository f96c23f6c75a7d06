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

//! The schema-resolving decoder: interprets a [`ReadPlan`] against a binary
//! [`Source`], yielding dynamically typed [`Value`]s in the reader's shape.

use crate::codec::read_block_count;
use crate::error::{Details, ResolutionError};
use crate::io::Source;
use crate::resolve::{resolve, Plan, ReadPlan};
use crate::schema::Schema;
use crate::value::Value;
use crate::AvroResult;
use std::collections::HashMap;

/// Resolve `reader` against `writer` and decode one datum from `bytes`.
pub fn decode_with_schemas(reader: &Schema, writer: &Schema, bytes: &[u8]) -> AvroResult<Value> {
    let plan = resolve(reader, writer)?;
    decode_with_plan(&plan, &mut Source::new(bytes))
}

/// Decode one datum against a previously resolved plan.
pub fn decode_with_plan(plan: &ReadPlan, source: &mut Source<'_>) -> AvroResult<Value> {
    decode_plan(&plan.root, &plan.named, source)
}

fn decode_plan(
    plan: &Plan,
    named: &HashMap<String, Plan>,
    source: &mut Source<'_>,
) -> AvroResult<Value> {
    match plan {
        Plan::Null => source.read_null().map(|()| Value::Null),
        Plan::Boolean => source.read_boolean().map(Value::Boolean),
        Plan::Int => source.read_int().map(Value::Int),
        Plan::IntAsLong => source.read_int().map(|n| Value::Long(i64::from(n))),
        Plan::IntAsFloat => source.read_int().map(|n| Value::Float(n as f32)),
        Plan::IntAsDouble => source.read_int().map(|n| Value::Double(f64::from(n))),
        Plan::Long => source.read_long().map(Value::Long),
        Plan::LongAsFloat => source.read_long().map(|n| Value::Float(n as f32)),
        Plan::LongAsDouble => source.read_long().map(|n| Value::Double(n as f64)),
        Plan::Float => source.read_float().map(Value::Float),
        Plan::FloatAsDouble => source.read_float().map(|x| Value::Double(f64::from(x))),
        Plan::Double => source.read_double().map(Value::Double),
        Plan::Bytes => source.read_bytes().map(Value::Bytes),
        Plan::String => source.read_str().map(Value::String),
        Plan::Fixed(fixed) => source
            .read_fixed(fixed.size)
            .map(|bytes| Value::Fixed(fixed.size, bytes)),
        Plan::Array(items) => {
            let mut out = Vec::new();
            loop {
                let count = read_block_count(source)?;
                if count == 0 {
                    break;
                }
                out.reserve(count);
                for _ in 0..count {
                    out.push(decode_plan(items, named, source)?);
                }
            }
            Ok(Value::Array(out))
        }
        Plan::Map(values) => {
            let mut out = HashMap::new();
            loop {
                let count = read_block_count(source)?;
                if count == 0 {
                    break;
                }
                out.reserve(count);
                for _ in 0..count {
                    let key = source.read_str()?;
                    out.insert(key, decode_plan(values, named, source)?);
                }
            }
            Ok(Value::Map(out))
        }
        Plan::Record(record) => {
            let mut slots: Vec<Option<(String, Value)>> = vec![None; record.reader_fields];
            for field in &record.fields {
                let value = decode_plan(&field.plan, named, source)?;
                match field.reader_position {
                    Some(position) => slots[position] = Some((field.name.clone(), value)),
                    // Field exists only in the writer; the value is dropped.
                    None => {}
                }
            }
            for default in &record.defaults {
                slots[default.reader_position] =
                    Some((default.name.clone(), default.value.clone()));
            }
            let fields = slots
                .into_iter()
                .enumerate()
                .map(|(position, slot)| {
                    slot.ok_or_else(|| {
                        Details::MalformedBlock(format!(
                            "reader field {position} of record {} was never produced",
                            record.name
                        ))
                        .into()
                    })
                })
                .collect::<AvroResult<Vec<_>>>()?;
            Ok(Value::Record(fields))
        }
        Plan::Enum(enumeration) => {
            let index = source.read_long()?;
            let writer_index = usize::try_from(index)
                .ok()
                .filter(|i| *i < enumeration.symbol_map.len())
                .ok_or(Details::GetEnumValue {
                    index: index.max(0) as usize,
                    nsymbols: enumeration.symbol_map.len(),
                })?;
            let reader_index = enumeration.symbol_map[writer_index];
            Ok(Value::Enum(
                reader_index as u32,
                enumeration.symbols[reader_index].clone(),
            ))
        }
        Plan::Union(branches) => {
            let index = source.read_long()?;
            let (reader_index, branch_plan) = usize::try_from(index)
                .ok()
                .and_then(|i| branches.get(i))
                .ok_or(Details::GetUnionVariant {
                    index,
                    num_variants: branches.len(),
                })?;
            let value = decode_plan(branch_plan, named, source)?;
            Ok(Value::Union(*reader_index as u32, Box::new(value)))
        }
        Plan::AsUnion(reader_index, inner) => {
            let value = decode_plan(inner, named, source)?;
            Ok(Value::Union(*reader_index as u32, Box::new(value)))
        }
        Plan::UnwrapUnion(branches) => {
            let index = source.read_long()?;
            let branch_plan = usize::try_from(index)
                .ok()
                .and_then(|i| branches.get(i))
                .ok_or(Details::GetUnionVariant {
                    index,
                    num_variants: branches.len(),
                })?;
            decode_plan(branch_plan, named, source)
        }
        Plan::NamedRef(name) => {
            let plan = named.get(name).ok_or_else(|| {
                ResolutionError::NamedTypeUnresolved { name: name.clone() }
            })?;
            decode_plan(plan, named, source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn parse(json: &str) -> Schema {
        Schema::parse_str(json).unwrap()
    }

    #[test]
    fn test_identity_decode_lifts_typed_value() -> TestResult {
        let schema = parse("\"string\"");
        let bytes = codec::string().encode_to_vec(&"Alice".to_string())?;
        assert_eq!(
            decode_with_schemas(&schema, &schema, &bytes)?,
            Value::String("Alice".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_promoted_value_is_numerically_equal() -> TestResult {
        let bytes = codec::int().encode_to_vec(&42)?;
        for (reader, expected) in [
            ("\"long\"", Value::Long(42)),
            ("\"float\"", Value::Float(42.0)),
            ("\"double\"", Value::Double(42.0)),
        ] {
            assert_eq!(
                decode_with_schemas(&parse(reader), &parse("\"int\""), &bytes)?,
                expected
            );
        }
        Ok(())
    }

    #[test]
    fn test_int_into_union_long() -> TestResult {
        // Writer wrote a bare int; the reader sees ["null", "long"].
        let bytes = codec::int().encode_to_vec(&42)?;
        let value = decode_with_schemas(&parse(r#"["null", "long"]"#), &parse("\"int\""), &bytes)?;
        assert_eq!(value, Value::Union(1, Box::new(Value::Long(42))));
        Ok(())
    }

    #[test]
    fn test_optional_field_evolution() -> TestResult {
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
        let bytes = codec::string().encode_to_vec(&"Alice".to_string())?;
        assert_eq!(
            decode_with_schemas(&reader, &writer, &bytes)?,
            Value::Record(vec![
                ("name".to_string(), Value::String("Alice".to_string())),
                ("age".to_string(), Value::Int(0)),
            ])
        );
        Ok(())
    }

    #[test]
    fn test_enum_reorder_decodes_to_reader_index() -> TestResult {
        let writer = parse(
            r#"{"type": "enum", "name": "Color",
                "symbols": ["GREEN", "BLUE", "RED"]}"#,
        );
        let reader = parse(
            r#"{"type": "enum", "name": "Color",
                "symbols": ["RED", "GREEN", "BLUE"]}"#,
        );
        // Writer index 0 is GREEN, which the reader knows as index 1.
        let bytes = codec::long().encode_to_vec(&0)?;
        assert_eq!(
            decode_with_schemas(&reader, &writer, &bytes)?,
            Value::Enum(1, "GREEN".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_record_reordering_emits_reader_order() -> TestResult {
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
        let mut sink = crate::io::Sink::new();
        sink.write_int(7);
        sink.write_str("x");
        assert_eq!(
            decode_with_schemas(&reader, &writer, sink.as_slice())?,
            Value::Record(vec![
                ("b".to_string(), Value::String("x".to_string())),
                ("a".to_string(), Value::Int(7)),
            ])
        );
        Ok(())
    }

    #[test]
    fn test_writer_union_unwraps_into_reader_primitive() -> TestResult {
        let writer = parse(r#"["int", "long"]"#);
        let reader = parse("\"double\"");
        // Branch 1 (long), value 100.
        let mut sink = crate::io::Sink::new();
        sink.write_long(1);
        sink.write_long(100);
        assert_eq!(
            decode_with_schemas(&reader, &writer, sink.as_slice())?,
            Value::Double(100.0)
        );
        Ok(())
    }

    #[test]
    fn test_recursive_value_decodes_through_named_ref() -> TestResult {
        let schema = parse(
            r#"{"type": "record", "name": "Node",
                "fields": [
                    {"name": "value", "type": "long"},
                    {"name": "next", "type": ["null", "Node"]}
                ]}"#,
        );
        // Node { value: 1, next: Node { value: 2, next: null } }
        let mut sink = crate::io::Sink::new();
        sink.write_long(1);
        sink.write_long(1); // next: branch 1
        sink.write_long(2);
        sink.write_long(0); // next: branch 0 (null)
        let value = decode_with_schemas(&schema, &schema, sink.as_slice())?;
        assert_eq!(
            value,
            Value::Record(vec![
                ("value".to_string(), Value::Long(1)),
                (
                    "next".to_string(),
                    Value::Union(
                        1,
                        Box::new(Value::Record(vec![
                            ("value".to_string(), Value::Long(2)),
                            ("next".to_string(), Value::Union(0, Box::new(Value::Null))),
                        ]))
                    )
                ),
            ])
        );
        Ok(())
    }

    #[test]
    fn test_discarded_field_is_skipped_not_surfaced() -> TestResult {
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
        let mut sink = crate::io::Sink::new();
        sink.write_str("Alice");
        sink.write_str("000-00-0000");
        assert_eq!(
            decode_with_schemas(&reader, &writer, sink.as_slice())?,
            Value::Record(vec![(
                "name".to_string(),
                Value::String("Alice".to_string())
            )])
        );
        Ok(())
    }

    #[test]
    fn test_truncated_input_is_an_error() {
        let schema = parse("\"string\"");
        let bytes = [0x0A, 0x41];
        assert!(decode_with_schemas(&schema, &schema, &bytes).is_err());
    }
}
