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

//! The staged record builder.
//!
//! Fields are added one at a time; each addition threads the field's type
//! into a nested tuple type parameter, so [`RecordBuilder::finish`] can take
//! a constructor from exactly the fields that were declared. Fields encode
//! in declaration order; any reordering between schema versions is the
//! resolver's job, never the codec's.
//!
//! ```
//! use avrokit::codec::{self, Codec};
//!
//! #[derive(Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: Option<i32>,
//! }
//!
//! let person: Codec<Person> = codec::record("Person")?
//!     .field("name", codec::string(), |p: &Person| &p.name)?
//!     .field_opt("age", codec::int(), |p: &Person| &p.age)?
//!     .finish(|(((), name), age)| Person { name, age })?;
//!
//! let alice = Person { name: "Alice".into(), age: None };
//! let bytes = person.encode_to_vec(&alice)?;
//! assert_eq!(person.decode_slice(&bytes)?, alice);
//! # Ok::<(), avrokit::Error>(())
//! ```

use crate::codec::{option, Codec, DecodeFn, EncodeFn};
use crate::error::Details;
use crate::schema::{
    validate_record_field_name, DefaultValue, Name, RecordField, RecordSchema, Schema,
};
use crate::AvroResult;
use std::sync::Arc;

/// Start building a record codec for values of type `T`.
///
/// `name` may be a dotted fullname; the namespace is split off the last dot.
pub fn record<T: 'static>(name: &str) -> AvroResult<RecordBuilder<T, ()>> {
    let name = Name::new(name)?;
    Ok(RecordBuilder {
        name,
        doc: None,
        fields: Vec::new(),
        encode: Arc::new(|_, _| Ok(())),
        decode: Arc::new(|_| Ok(())),
    })
}

/// Accumulates record fields; `A` is the nested tuple of field types
/// decoded so far.
pub struct RecordBuilder<T, A> {
    name: Name,
    doc: Option<String>,
    fields: Vec<RecordField>,
    encode: EncodeFn<T>,
    decode: DecodeFn<A>,
}

impl<T: 'static, A: 'static> RecordBuilder<T, A> {
    /// Attach documentation to the record schema.
    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    /// Add a field with the given codec and getter.
    pub fn field<F: 'static>(
        self,
        name: &str,
        codec: Codec<F>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
    ) -> AvroResult<RecordBuilder<T, (A, F)>> {
        self.push_field(name, codec, get, None)
    }

    /// Add an optional field: the codec is wrapped in
    /// [`option`](crate::codec::option) and the field defaults to `null`.
    pub fn field_opt<F: 'static>(
        self,
        name: &str,
        codec: Codec<F>,
        get: impl Fn(&T) -> &Option<F> + Send + Sync + 'static,
    ) -> AvroResult<RecordBuilder<T, (A, Option<F>)>> {
        let default = DefaultValue::Union(0, Box::new(DefaultValue::Null));
        self.push_field(name, option(codec)?, get, Some(default))
    }

    fn push_field<F: 'static>(
        mut self,
        name: &str,
        codec: Codec<F>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        default: Option<DefaultValue>,
    ) -> AvroResult<RecordBuilder<T, (A, F)>> {
        validate_record_field_name(name)?;
        if self.fields.iter().any(|f| f.name == name) {
            return Err(Details::FieldNameDuplicate(name.to_string()).into());
        }
        self.fields.push(RecordField {
            name: name.to_string(),
            doc: None,
            aliases: Vec::new(),
            default,
            schema: codec.schema().clone(),
        });

        let encode_prev = self.encode;
        let field_encode = codec.encode_fn();
        let encode: EncodeFn<T> = Arc::new(move |value, sink| {
            encode_prev(value, sink)?;
            field_encode(get(value), sink)
        });

        let decode_prev = self.decode;
        let field_decode = codec.decode_fn();
        let decode: DecodeFn<(A, F)> = Arc::new(move |source| {
            let acc = decode_prev(source)?;
            let field = field_decode(source)?;
            Ok((acc, field))
        });

        Ok(RecordBuilder {
            name: self.name,
            doc: self.doc,
            fields: self.fields,
            encode,
            decode,
        })
    }

    /// Fix the field list and produce the codec, constructing decoded values
    /// with `build` from the accumulated field tuple.
    pub fn finish(self, build: impl Fn(A) -> T + Send + Sync + 'static) -> AvroResult<Codec<T>> {
        if self.fields.is_empty() {
            return Err(Details::EmptyRecordFields(self.name.fullname(None)).into());
        }
        let schema = Schema::Record(
            RecordSchema::builder()
                .name(self.name)
                .doc(self.doc)
                .fields(self.fields)
                .build(),
        );
        let decode_fields = self.decode;
        let decode: DecodeFn<T> = Arc::new(move |source| Ok(build(decode_fields(source)?)));
        Ok(Codec::from_parts(schema, self.encode, decode))
    }
}
