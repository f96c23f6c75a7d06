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

//! The dynamically typed representation of Avro data.
//!
//! [`Value`] is produced by the schema-resolving decoder only; the typed
//! codec path never materializes it.

use crate::error::Details;
use crate::schema::{DefaultValue, EnumSchema, FixedSchema, Schema, SchemaKind};
use crate::AvroResult;
use std::collections::HashMap;
use strum_macros::EnumDiscriminants;

/// Any Avro datum, dynamically typed.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(ValueKind))]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Record fields in reader order, as `(field_name, value)` pairs.
    Record(Vec<(String, Value)>),
    /// An enum symbol: its position in the reader's symbol list and its name.
    Enum(u32, String),
    /// A union value: the reader branch index and the branch value.
    Union(u32, Box<Value>),
    /// A fixed value: its declared size and the raw bytes.
    Fixed(usize, Vec<u8>),
}

impl Value {
    /// Lift a schema-level default literal into a [`Value`], directed by the
    /// (reader) schema of the field the default belongs to.
    pub fn from_default(default: &DefaultValue, schema: &Schema) -> AvroResult<Value> {
        let mismatch = || {
            Details::DefaultValueMismatch {
                kind: SchemaKind::from(schema),
                value: default.to_json(),
            }
            .into()
        };
        match (default, schema) {
            (DefaultValue::Null, Schema::Null) => Ok(Value::Null),
            (DefaultValue::Boolean(b), Schema::Boolean) => Ok(Value::Boolean(*b)),
            (DefaultValue::Int(n), Schema::Int { .. }) => Ok(Value::Int(*n)),
            // The JSON parser produces `Int` for any integer literal in range.
            (DefaultValue::Int(n), Schema::Long { .. }) => Ok(Value::Long(i64::from(*n))),
            (DefaultValue::Long(n), Schema::Long { .. }) => Ok(Value::Long(*n)),
            (DefaultValue::Float(x), Schema::Float) => Ok(Value::Float(*x)),
            (DefaultValue::Double(x), Schema::Double) => Ok(Value::Double(*x)),
            (DefaultValue::Bytes(b), Schema::Bytes { .. }) => Ok(Value::Bytes(b.clone())),
            (DefaultValue::Bytes(b), Schema::Fixed(FixedSchema { size, .. })) => {
                if b.len() == *size {
                    Ok(Value::Fixed(*size, b.clone()))
                } else {
                    Err(mismatch())
                }
            }
            (DefaultValue::String(s), Schema::String { .. }) => Ok(Value::String(s.clone())),
            (DefaultValue::Enum(symbol), Schema::Enum(EnumSchema { symbols, .. })) => symbols
                .iter()
                .position(|s| s == symbol)
                .map(|idx| Value::Enum(idx as u32, symbol.clone()))
                .ok_or_else(mismatch),
            (DefaultValue::Array(items), Schema::Array(item_schema)) => items
                .iter()
                .map(|item| Value::from_default(item, item_schema))
                .collect::<AvroResult<Vec<_>>>()
                .map(Value::Array),
            (DefaultValue::Map(pairs), Schema::Map(value_schema)) => pairs
                .iter()
                .map(|(k, v)| Ok((k.clone(), Value::from_default(v, value_schema)?)))
                .collect::<AvroResult<HashMap<_, _>>>()
                .map(Value::Map),
            (DefaultValue::Map(pairs), Schema::Record(record)) => {
                let mut fields = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let default = pairs
                        .iter()
                        .find(|(name, _)| name == &field.name)
                        .map(|(_, v)| v)
                        .or(field.default.as_ref())
                        .ok_or_else(mismatch)?;
                    fields.push((
                        field.name.clone(),
                        Value::from_default(default, &field.schema)?,
                    ));
                }
                Ok(Value::Record(fields))
            }
            (DefaultValue::Union(branch, inner), Schema::Union(union)) => {
                let branch_schema = union.variants().get(*branch).ok_or_else(mismatch)?;
                Ok(Value::Union(
                    *branch as u32,
                    Box::new(Value::from_default(inner, branch_schema)?),
                ))
            }
            // A non-union default against a union schema targets branch 0.
            (other, Schema::Union(union)) => {
                let first = union.variants().first().ok_or_else(mismatch)?;
                Ok(Value::Union(0, Box::new(Value::from_default(other, first)?)))
            }
            _ => Err(mismatch()),
        }
    }
}
