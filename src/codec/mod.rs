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

//! Typed codecs and the combinators that compose them.
//!
//! A [`Codec<T>`] bundles an Avro [`Schema`] with an encoder and a decoder
//! for the Rust type `T`. Primitive codecs map 1:1 to the binary wire
//! operations; `array`, `map`, `option`, [`UnionBuilder`], the record builder
//! and [`recursive`] compose them into codecs for arbitrary domain types.
//!
//! ```
//! use avrokit::codec::{self, Codec};
//!
//! let ages: Codec<Vec<i32>> = codec::array(codec::int());
//! let bytes = ages.encode_to_vec(&vec![1, 2, 3])?;
//! assert_eq!(ages.decode_slice(&bytes)?, vec![1, 2, 3]);
//! # Ok::<(), avrokit::Error>(())
//! ```

mod record;
mod recursive;

pub use record::{record, RecordBuilder};
pub use recursive::recursive;

use crate::error::Details;
use crate::io::{Sink, Source};
use crate::schema::{FixedSchema, LogicalType, Name, Schema, UnionSchema};
use crate::util::safe_len;
use crate::AvroResult;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type EncodeFn<T> = Arc<dyn Fn(&T, &mut Sink) -> AvroResult<()> + Send + Sync>;
pub(crate) type DecodeFn<T> = Arc<dyn Fn(&mut Source<'_>) -> AvroResult<T> + Send + Sync>;

/// A bundled schema plus encoder/decoder pair for values of type `T`.
///
/// Codecs are immutable once constructed and cheap to clone; the closures
/// inside are shared.
pub struct Codec<T> {
    schema: Schema,
    encode: EncodeFn<T>,
    decode: DecodeFn<T>,
}

impl<T> Clone for Codec<T> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            encode: Arc::clone(&self.encode),
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<T> std::fmt::Debug for Codec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec").field("schema", &self.schema).finish_non_exhaustive()
    }
}

impl<T> Codec<T> {
    pub(crate) fn from_parts(schema: Schema, encode: EncodeFn<T>, decode: DecodeFn<T>) -> Self {
        Self {
            schema,
            encode,
            decode,
        }
    }

    pub(crate) fn encode_fn(&self) -> EncodeFn<T> {
        Arc::clone(&self.encode)
    }

    pub(crate) fn decode_fn(&self) -> DecodeFn<T> {
        Arc::clone(&self.decode)
    }

    /// The Avro schema of the values this codec handles.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Encode `value` onto `sink`.
    pub fn encode(&self, value: &T, sink: &mut Sink) -> AvroResult<()> {
        (self.encode)(value, sink)
    }

    /// Decode one value from `source`.
    pub fn decode(&self, source: &mut Source<'_>) -> AvroResult<T> {
        (self.decode)(source)
    }

    /// Encode a single datum to a fresh byte vector.
    pub fn encode_to_vec(&self, value: &T) -> AvroResult<Vec<u8>> {
        let mut sink = Sink::new();
        self.encode(value, &mut sink)?;
        Ok(sink.into_bytes())
    }

    /// Decode a single datum from a byte slice.
    pub fn decode_slice(&self, bytes: &[u8]) -> AvroResult<T> {
        self.decode(&mut Source::new(bytes))
    }

    /// Annotate the codec's schema with a logical type.
    ///
    /// The wire format is unchanged; only the schema JSON carries the tag.
    pub fn with_logical(self, logical: LogicalType) -> Codec<T> {
        Codec {
            schema: self.schema.with_logical(logical),
            encode: self.encode,
            decode: self.decode,
        }
    }
}

/// The `null` codec: zero bytes on the wire.
pub fn null() -> Codec<()> {
    Codec::from_parts(
        Schema::Null,
        Arc::new(|_, sink| {
            sink.write_null();
            Ok(())
        }),
        Arc::new(|source| source.read_null()),
    )
}

pub fn boolean() -> Codec<bool> {
    Codec::from_parts(
        Schema::Boolean,
        Arc::new(|&b, sink| {
            sink.write_boolean(b);
            Ok(())
        }),
        Arc::new(|source| source.read_boolean()),
    )
}

pub fn int() -> Codec<i32> {
    Codec::from_parts(
        Schema::int(),
        Arc::new(|&n, sink| {
            sink.write_int(n);
            Ok(())
        }),
        Arc::new(|source| source.read_int()),
    )
}

pub fn long() -> Codec<i64> {
    Codec::from_parts(
        Schema::long(),
        Arc::new(|&n, sink| {
            sink.write_long(n);
            Ok(())
        }),
        Arc::new(|source| source.read_long()),
    )
}

pub fn float() -> Codec<f32> {
    Codec::from_parts(
        Schema::Float,
        Arc::new(|&x, sink| {
            sink.write_float(x);
            Ok(())
        }),
        Arc::new(|source| source.read_float()),
    )
}

pub fn double() -> Codec<f64> {
    Codec::from_parts(
        Schema::Double,
        Arc::new(|&x, sink| {
            sink.write_double(x);
            Ok(())
        }),
        Arc::new(|source| source.read_double()),
    )
}

pub fn bytes() -> Codec<Vec<u8>> {
    Codec::from_parts(
        Schema::bytes(),
        Arc::new(|b: &Vec<u8>, sink| {
            sink.write_bytes(b);
            Ok(())
        }),
        Arc::new(|source| source.read_bytes()),
    )
}

pub fn string() -> Codec<String> {
    Codec::from_parts(
        Schema::string(),
        Arc::new(|s: &String, sink| {
            sink.write_str(s);
            Ok(())
        }),
        Arc::new(|source| source.read_str()),
    )
}

/// A named `fixed` codec of exactly `size` bytes.
///
/// The encoder rejects values whose length differs from `size`.
pub fn fixed(name: &str, size: usize) -> AvroResult<Codec<Vec<u8>>> {
    let name = Name::new(name)?;
    let schema = Schema::Fixed(FixedSchema::builder().name(name).size(size).build());
    schema.validate()?;
    Ok(Codec::from_parts(
        schema,
        Arc::new(move |b: &Vec<u8>, sink| {
            if b.len() != size {
                return Err(Details::CompareFixedSizes {
                    size,
                    n: b.len(),
                }
                .into());
            }
            sink.write_fixed(b);
            Ok(())
        }),
        Arc::new(move |source| source.read_fixed(size)),
    ))
}

/// Read one block count for an array or map, normalizing the negative-count
/// form: a negative count is `-N` items followed by their byte size.
pub(crate) fn read_block_count(source: &mut Source<'_>) -> AvroResult<usize> {
    let count = source.read_long()?;
    if count < 0 {
        // The byte size hint is only useful for skipping; decoders read on.
        let _byte_size = source.read_long()?;
        safe_len(count.unsigned_abs() as usize)
    } else {
        safe_len(count as usize)
    }
}

/// An `array` codec over any element codec.
///
/// Encoding emits a single block followed by the zero terminator; decoding
/// accepts any sequence of blocks, including the negative-count form other
/// implementations emit.
pub fn array<T: 'static>(elem: Codec<T>) -> Codec<Vec<T>> {
    let schema = Schema::array(elem.schema().clone());
    let elem_encode = elem.encode_fn();
    let elem_decode = elem.decode_fn();
    Codec::from_parts(
        schema,
        Arc::new(move |items: &Vec<T>, sink| {
            if !items.is_empty() {
                sink.write_long(items.len() as i64);
                for item in items {
                    elem_encode(item, sink)?;
                }
            }
            sink.write_long(0);
            Ok(())
        }),
        Arc::new(move |source| {
            let mut items = Vec::new();
            loop {
                let count = read_block_count(source)?;
                if count == 0 {
                    break;
                }
                items.reserve(count);
                for _ in 0..count {
                    items.push(elem_decode(source)?);
                }
            }
            Ok(items)
        }),
    )
}

/// A `map` codec over any value codec. Keys are strings.
pub fn map<T: 'static>(elem: Codec<T>) -> Codec<HashMap<String, T>> {
    let schema = Schema::map(elem.schema().clone());
    let elem_encode = elem.encode_fn();
    let elem_decode = elem.decode_fn();
    Codec::from_parts(
        schema,
        Arc::new(move |entries: &HashMap<String, T>, sink| {
            if !entries.is_empty() {
                sink.write_long(entries.len() as i64);
                for (key, value) in entries {
                    sink.write_str(key);
                    elem_encode(value, sink)?;
                }
            }
            sink.write_long(0);
            Ok(())
        }),
        Arc::new(move |source| {
            let mut entries = HashMap::new();
            loop {
                let count = read_block_count(source)?;
                if count == 0 {
                    break;
                }
                entries.reserve(count);
                for _ in 0..count {
                    let key = source.read_str()?;
                    entries.insert(key, elem_decode(source)?);
                }
            }
            Ok(entries)
        }),
    )
}

/// An optional value as the union `["null", T]`; `None` is branch 0.
pub fn option<T: 'static>(inner: Codec<T>) -> AvroResult<Codec<Option<T>>> {
    let schema = Schema::Union(UnionSchema::new(vec![
        Schema::Null,
        inner.schema().clone(),
    ])?);
    let inner_encode = inner.encode_fn();
    let inner_decode = inner.decode_fn();
    Ok(Codec::from_parts(
        schema,
        Arc::new(move |value: &Option<T>, sink| match value {
            None => {
                sink.write_long(0);
                Ok(())
            }
            Some(v) => {
                sink.write_long(1);
                inner_encode(v, sink)
            }
        }),
        Arc::new(move |source| match source.read_long()? {
            0 => Ok(None),
            1 => Ok(Some(inner_decode(source)?)),
            index => Err(Details::GetUnionVariant {
                index,
                num_variants: 2,
            }
            .into()),
        }),
    ))
}

type ProjectFn<T> = Box<dyn Fn(&T, &mut Sink) -> Option<AvroResult<()>> + Send + Sync>;

/// Builds a union codec for a Rust enum (or any sum-shaped type).
///
/// Every branch supplies a codec, a projection that recognizes values of
/// that branch, and an injection that rebuilds the value on decode. The
/// encoder picks the first branch whose projection matches; the branch
/// index is written as a `long` before the value.
///
/// ```
/// use avrokit::codec::{self, UnionBuilder};
///
/// #[derive(Debug, PartialEq)]
/// enum Id {
///     Number(i64),
///     Tag(String),
/// }
///
/// let id = UnionBuilder::new()
///     .variant(codec::long(), |v: &Id| match v {
///         Id::Number(n) => Some(n),
///         _ => None,
///     }, Id::Number)
///     .variant(codec::string(), |v: &Id| match v {
///         Id::Tag(s) => Some(s),
///         _ => None,
///     }, Id::Tag)
///     .build()?;
///
/// let bytes = id.encode_to_vec(&Id::Tag("a".into()))?;
/// assert_eq!(id.decode_slice(&bytes)?, Id::Tag("a".into()));
/// # Ok::<(), avrokit::Error>(())
/// ```
pub struct UnionBuilder<T> {
    branches: Vec<Schema>,
    encoders: Vec<ProjectFn<T>>,
    decoders: Vec<DecodeFn<T>>,
}

impl<T: 'static> Default for UnionBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> UnionBuilder<T> {
    pub fn new() -> Self {
        Self {
            branches: Vec::new(),
            encoders: Vec::new(),
            decoders: Vec::new(),
        }
    }

    /// Add a branch with its codec, projection and injection.
    pub fn variant<F: 'static>(
        mut self,
        codec: Codec<F>,
        project: impl Fn(&T) -> Option<&F> + Send + Sync + 'static,
        inject: impl Fn(F) -> T + Send + Sync + 'static,
    ) -> Self {
        let index = self.branches.len() as i64;
        self.branches.push(codec.schema().clone());
        let encode = codec.encode_fn();
        self.encoders.push(Box::new(move |value, sink| {
            project(value).map(|v| {
                sink.write_long(index);
                encode(v, sink)
            })
        }));
        let decode = codec.decode_fn();
        self.decoders
            .push(Arc::new(move |source| Ok(inject(decode(source)?))));
        self
    }

    /// Validate the branches and produce the union codec.
    pub fn build(self) -> AvroResult<Codec<T>> {
        let schema = Schema::Union(UnionSchema::new(self.branches)?);
        let encoders = self.encoders;
        let decoders = self.decoders;
        let num_variants = decoders.len();
        Ok(Codec::from_parts(
            schema,
            Arc::new(move |value, sink| {
                for encoder in &encoders {
                    if let Some(result) = encoder(value, sink) {
                        return result;
                    }
                }
                Err(Details::NoMatchingUnionBranch.into())
            }),
            Arc::new(move |source| {
                let index = source.read_long()?;
                let decoder = usize::try_from(index)
                    .ok()
                    .and_then(|i| decoders.get(i))
                    .ok_or(Details::GetUnionVariant {
                        index,
                        num_variants,
                    })?;
                decoder(source)
            }),
        ))
    }
}
