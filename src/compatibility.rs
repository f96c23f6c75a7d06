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

//! Compatibility checks between reader and writer schemas.
//!
//! These answer the yes/no question without keeping the read plan around;
//! compatibility holds exactly when resolution succeeds.

use crate::resolve::resolve;
use crate::schema::Schema;
use crate::AvroResult;

pub struct SchemaCompatibility;

impl SchemaCompatibility {
    /// Can data written with `writers_schema` be read as `readers_schema`?
    /// The error carries the first incompatibility found.
    pub fn can_read(writers_schema: &Schema, readers_schema: &Schema) -> AvroResult<()> {
        resolve(readers_schema, writers_schema).map(|_| ())
    }

    /// Can each schema read data written with the other?
    pub fn mutual_read(schema_one: &Schema, schema_two: &Schema) -> AvroResult<()> {
        Self::can_read(schema_one, schema_two)?;
        Self::can_read(schema_two, schema_one)
    }
}
