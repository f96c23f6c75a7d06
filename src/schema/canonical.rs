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

//! The [Parsing Canonical Form] of a schema and its CRC-64-AVRO fingerprint.
//!
//! [Parsing Canonical Form]:
//! https://avro.apache.org/docs/++version++/specification/#parsing-canonical-form-for-schemas

use crate::schema::Schema;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Converts a schema into its Parsing Canonical Form.
pub fn canonical_form(schema: &Schema) -> String {
    let json = serde_json::to_value(schema)
        .unwrap_or_else(|e| panic!("Cannot convert Schema to JSON: {e}"));
    let mut defined_names = HashSet::new();
    pcf(&json, &mut defined_names)
}

/// The CRC-64-AVRO fingerprint of the schema's Parsing Canonical Form.
pub fn fingerprint(schema: &Schema) -> u64 {
    fingerprint_bytes(canonical_form(schema).as_bytes())
}

fn pcf(schema: &JsonValue, defined_names: &mut HashSet<String>) -> String {
    match schema {
        JsonValue::Object(map) => pcf_map(map, defined_names),
        JsonValue::String(s) => pcf_string(s),
        JsonValue::Array(v) => pcf_array(v, defined_names),
        json => panic!("got invalid JSON value for canonical form of schema: {json}"),
    }
}

fn pcf_map(schema: &Map<String, JsonValue>, defined_names: &mut HashSet<String>) -> String {
    let typ = schema.get("type").and_then(|v| v.as_str());
    let name = if is_named_type(typ) {
        let ns = schema.get("namespace").and_then(|v| v.as_str());
        let raw_name = schema.get("name").and_then(|v| v.as_str());
        Some(format!(
            "{}{}",
            ns.map_or(String::new(), |n| format!("{n}.")),
            raw_name.unwrap_or_default()
        ))
    } else {
        None
    };

    // A named type that was already emitted collapses to a name reference.
    if let Some(ref n) = name {
        if defined_names.contains(n) {
            return pcf_string(n);
        } else {
            defined_names.insert(n.clone());
        }
    }

    // Reduce primitive types to their simple form once stripped attributes
    // (such as logicalType) are discounted. ([PRIMITIVE] rule)
    if let Some(JsonValue::String(t)) = schema.get("type") {
        let only_type = schema
            .keys()
            .all(|k| k == "type" || field_ordering_position(k).is_none());
        if only_type && !is_named_type(typ) {
            return pcf_string(t);
        }
    }

    let mut fields = Vec::new();
    for (k, v) in schema {
        // Strip out unused fields. ([STRIP] rule)
        if field_ordering_position(k).is_none() {
            continue;
        }

        // Fully qualify the name, if it isn't already. ([FULLNAMES] rule)
        if k == "name" {
            if let Some(ref n) = name {
                fields.push(("name", format!("{}:{}", pcf_string(k), pcf_string(n))));
                continue;
            }
        }

        // Strip off quotes surrounding "size", if they exist. ([INTEGERS] rule)
        if k == "size" {
            let i = match v.as_str() {
                Some(s) => s.parse::<i64>().expect("Only valid schemas are accepted!"),
                None => v.as_i64().unwrap(),
            };
            fields.push((k, format!("{}:{}", pcf_string(k), i)));
            continue;
        }

        // For anything else, recursively process the result.
        fields.push((k, format!("{}:{}", pcf_string(k), pcf(v, defined_names))));
    }

    // Sort the fields by their canonical ordering. ([ORDER] rule)
    fields.sort_unstable_by_key(|(k, _)| field_ordering_position(k).unwrap());
    let inter = fields
        .into_iter()
        .map(|(_, v)| v)
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{inter}}}")
}

fn is_named_type(typ: Option<&str>) -> bool {
    matches!(typ, Some("record") | Some("enum") | Some("fixed"))
}

fn pcf_array(arr: &[JsonValue], defined_names: &mut HashSet<String>) -> String {
    let inter = arr
        .iter()
        .map(|a| pcf(a, defined_names))
        .collect::<Vec<String>>()
        .join(",");
    format!("[{inter}]")
}

fn pcf_string(s: &str) -> String {
    format!(r#""{s}""#)
}

/// Fields kept by the canonical form, in canonical order.
const RESERVED_FIELDS: &[&str] = &["name", "type", "fields", "symbols", "items", "values", "size"];

fn field_ordering_position(field: &str) -> Option<usize> {
    RESERVED_FIELDS
        .iter()
        .position(|&f| f == field)
        .map(|pos| pos + 1)
}

const CRC_64_AVRO_POLY: u64 = 0xC96C_5795_D787_0F42;

fn crc_table() -> &'static [u64; 256] {
    static TABLE: OnceLock<[u64; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u64; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut fp = i as u64;
            for _ in 0..8 {
                fp = (fp >> 1) ^ (CRC_64_AVRO_POLY & 0u64.wrapping_sub(fp & 1));
            }
            *entry = fp;
        }
        table
    })
}

/// CRC-64-AVRO over a byte string: all-ones initial value, table-driven,
/// no post-inversion.
pub(crate) fn fingerprint_bytes(bytes: &[u8]) -> u64 {
    let table = crc_table();
    let mut fp = u64::MAX;
    for &byte in bytes {
        fp = (fp >> 8) ^ table[((fp ^ u64::from(byte)) & 0xFF) as usize];
    }
    fp
}
