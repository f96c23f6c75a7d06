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

//! **avrokit** is a combinator-based implementation of [Apache
//! Avro](https://avro.apache.org/) binary serialization, schema evolution and
//! object container file I/O.
//!
//! The central notion is the typed [`Codec<T>`](codec::Codec): a bundled
//! [`Schema`] plus an encoder and decoder for a Rust type, composed from the
//! combinators in [`codec`]. A codec marshals values to and from the Avro
//! wire format and drives the object container [`Writer`] and [`Reader`].
//!
//! ```
//! use avrokit::{codec, Reader, Writer};
//!
//! #[derive(Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! let person = codec::record("Person")?
//!     .field("name", codec::string(), |p: &Person| &p.name)?
//!     .field("age", codec::int(), |p: &Person| &p.age)?
//!     .finish(|(((), name), age)| Person { name, age })?;
//!
//! let mut writer = Writer::new(person.clone(), Vec::new())?;
//! writer.write(&Person { name: "Alice".into(), age: 30 })?;
//! let bytes = writer.into_inner()?;
//!
//! let mut reader = Reader::new(person, &bytes[..])?;
//! let decoded = reader.next().unwrap()?;
//! assert_eq!(decoded, Person { name: "Alice".into(), age: 30 });
//! # Ok::<(), avrokit::Error>(())
//! ```
//!
//! When reader and writer schemas differ, [`resolve`] fuses them into a
//! [`ReadPlan`](resolve::ReadPlan) and [`decode_with_schemas`] decodes the
//! writer's bytes into generic [`Value`]s shaped like the reader expects —
//! with numeric promotions, field defaults and reordering, enum remapping
//! and union routing applied.
//!
//! # Features
//!
//! - `snappy`: enable the Snappy block compression codec
//! - `zstandard`: enable the Zstandard block compression codec

pub mod codec;
pub mod compatibility;
pub mod compression;
pub mod error;
pub mod io;
pub mod reader;
pub mod resolve;
pub mod schema;
pub mod single_object;
pub mod util;
pub mod value;
pub mod writer;

mod decode;

pub use codec::Codec;
pub use decode::{decode_with_plan, decode_with_schemas};
pub use error::Error;
pub use reader::Reader;
pub use resolve::{resolve, ReadPlan};
pub use schema::Schema;
pub use value::Value;
pub use writer::Writer;

/// A convenience type alias for `Result`s with `Error`s.
pub type AvroResult<T> = Result<T, Error>;
