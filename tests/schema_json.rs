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

//! JSON schema parsing, printing and canonical-form behavior across
//! realistic schema declarations.

use avrokit::Schema;
use pretty_assertions::assert_eq;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const INTEROP_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Interop",
    "namespace": "org.apache.avro",
    "fields": [
        {"name": "intField", "type": "int"},
        {"name": "longField", "type": "long"},
        {"name": "stringField", "type": "string"},
        {"name": "boolField", "type": "boolean"},
        {"name": "floatField", "type": "float"},
        {"name": "doubleField", "type": "double"},
        {"name": "bytesField", "type": "bytes"},
        {"name": "nullField", "type": "null"},
        {"name": "arrayField", "type": {"type": "array", "items": "double"}},
        {"name": "mapField", "type": {"type": "map", "values": {
            "type": "record", "name": "Foo",
            "fields": [{"name": "label", "type": "string"}]
        }}},
        {"name": "unionField", "type": ["boolean", "double", {"type": "array", "items": "bytes"}]},
        {"name": "enumField", "type": {"type": "enum", "name": "Kind", "symbols": ["A", "B", "C"]}},
        {"name": "fixedField", "type": {"type": "fixed", "name": "MD5", "size": 16}},
        {"name": "recordField", "type": {
            "type": "record", "name": "Node",
            "fields": [
                {"name": "label", "type": "string"},
                {"name": "children", "type": {"type": "array", "items": "Node"}}
            ]
        }}
    ]
}"#;

#[test]
fn test_interop_schema_parses() -> TestResult {
    let schema = Schema::parse_str(INTEROP_SCHEMA)?;
    assert_eq!(schema.fullname(), Some("org.apache.avro.Interop".to_string()));
    schema.validate()?;
    Ok(())
}

#[test]
fn test_print_parse_fixpoint() -> TestResult {
    // Printing and reparsing reaches a fixpoint after one round.
    let parsed = Schema::parse_str(INTEROP_SCHEMA)?;
    let printed = parsed.to_string();
    let reparsed = Schema::parse_str(&printed)?;
    assert_eq!(parsed, reparsed);
    assert_eq!(printed, reparsed.to_string());
    Ok(())
}

#[test]
fn test_fingerprint_is_stable_across_print_cycles() -> TestResult {
    let parsed = Schema::parse_str(INTEROP_SCHEMA)?;
    let reparsed = Schema::parse_str(&parsed.to_string())?;
    assert_eq!(parsed.fingerprint(), reparsed.fingerprint());
    Ok(())
}

#[test]
fn test_canonical_form_drops_namespace_into_fullname() -> TestResult {
    let schema = Schema::parse_str(
        r#"{"type": "fixed", "name": "MD5", "namespace": "org.apache.avro", "size": 16}"#,
    )?;
    assert_eq!(
        schema.canonical_form(),
        r#"{"name":"org.apache.avro.MD5","type":"fixed","size":16}"#
    );
    Ok(())
}

#[test]
fn test_canonical_form_of_nested_records_inlines_once() -> TestResult {
    let schema = Schema::parse_str(
        r#"{
            "type": "record", "name": "Tree",
            "fields": [
                {"name": "left", "type": ["null", "Tree"], "default": null},
                {"name": "right", "type": ["null", "Tree"], "default": null}
            ]
        }"#,
    )?;
    assert_eq!(
        schema.canonical_form(),
        concat!(
            r#"{"name":"Tree","type":"record","fields":["#,
            r#"{"name":"left","type":["null","Tree"]},"#,
            r#"{"name":"right","type":["null","Tree"]}]}"#
        )
    );
    Ok(())
}

#[test]
fn test_defaults_survive_the_round_trip() -> TestResult {
    let schema = Schema::parse_str(
        r#"{
            "type": "record", "name": "Defaults",
            "fields": [
                {"name": "count", "type": "long", "default": 42},
                {"name": "label", "type": "string", "default": "none"},
                {"name": "tags", "type": {"type": "array", "items": "string"}, "default": ["a"]},
                {"name": "note", "type": ["null", "string"], "default": null}
            ]
        }"#,
    )?;
    let printed = schema.to_string();
    assert!(printed.contains(r#""default":42"#));
    assert!(printed.contains(r#""default":"none""#));
    assert!(printed.contains(r#""default":["a"]"#));
    assert!(printed.contains(r#""default":null"#));

    let reparsed = Schema::parse_str(&printed)?;
    assert_eq!(printed, reparsed.to_string());
    Ok(())
}

#[test]
fn test_equal_schemas_differ_only_in_stripped_attributes() -> TestResult {
    let documented = Schema::parse_str(
        r#"{"type": "enum", "name": "Suit", "doc": "cards",
            "aliases": ["Colour"], "symbols": ["S", "H"]}"#,
    )?;
    let bare = Schema::parse_str(r#"{"type": "enum", "name": "Suit", "symbols": ["S", "H"]}"#)?;
    assert_eq!(documented, bare);
    assert_eq!(documented.fingerprint(), bare.fingerprint());
    Ok(())
}

#[test]
fn test_distinct_schemas_have_distinct_fingerprints() -> TestResult {
    let names = ["A", "B", "C"];
    let mut fingerprints = Vec::new();
    for name in names {
        let schema = Schema::parse_str(&format!(
            r#"{{"type": "record", "name": "{name}",
                "fields": [{{"name": "x", "type": "long"}}]}}"#
        ))?;
        fingerprints.push(schema.fingerprint());
    }
    fingerprints.sort();
    fingerprints.dedup();
    assert_eq!(fingerprints.len(), names.len());
    Ok(())
}
