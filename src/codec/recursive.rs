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

//! The fixpoint combinator for self-referential codecs.

use crate::codec::{Codec, DecodeFn, EncodeFn};
use crate::error::Details;
use crate::schema::{Name, Schema};
use crate::AvroResult;
use std::sync::{Arc, OnceLock};

/// Build a codec for a recursive type.
///
/// `f` receives a placeholder codec whose schema is a reference to `name`
/// and whose encoder/decoder dereference backpatched cells; it must return
/// the codec for the body, which must be a named type carrying exactly
/// `name`. Inner occurrences of the placeholder emit a name reference in
/// the schema JSON, keeping the canonical form finite.
///
/// ```
/// use avrokit::codec::{self, Codec};
///
/// #[derive(Debug, PartialEq)]
/// struct Node {
///     value: i64,
///     next: Option<Box<Node>>,
/// }
///
/// let node: Codec<Box<Node>> = codec::recursive("Node", |node| {
///     codec::record("Node")?
///         .field("value", codec::long(), |n: &Box<Node>| &n.value)?
///         .field_opt("next", node, |n: &Box<Node>| &n.next)?
///         .finish(|(((), value), next)| Box::new(Node { value, next }))
/// })?;
///
/// let list = Box::new(Node { value: 1, next: Some(Box::new(Node { value: 2, next: None })) });
/// let bytes = node.encode_to_vec(&list)?;
/// assert_eq!(node.decode_slice(&bytes)?, list);
/// # Ok::<(), avrokit::Error>(())
/// ```
pub fn recursive<T, F>(name: &str, f: F) -> AvroResult<Codec<T>>
where
    T: 'static,
    F: FnOnce(Codec<T>) -> AvroResult<Codec<T>>,
{
    let name = Name::new(name)?;
    let cell: Arc<OnceLock<(EncodeFn<T>, DecodeFn<T>)>> = Arc::new(OnceLock::new());

    let placeholder = Codec::from_parts(
        Schema::Ref { name: name.clone() },
        {
            let cell = Arc::clone(&cell);
            let fullname = name.fullname(None);
            Arc::new(move |value, sink| match cell.get() {
                Some((encode, _)) => encode(value, sink),
                None => Err(Details::RecursiveCodecIncomplete(fullname.clone()).into()),
            })
        },
        {
            let cell = Arc::clone(&cell);
            let fullname = name.fullname(None);
            Arc::new(move |source| match cell.get() {
                Some((_, decode)) => decode(source),
                None => Err(Details::RecursiveCodecIncomplete(fullname.clone()).into()),
            })
        },
    );

    let body = f(placeholder)?;
    match body.schema().name() {
        Some(body_name) if *body_name == name => {}
        other => {
            return Err(Details::RecursiveCodecName {
                expected: name.fullname(None),
                found: other
                    .map(|n| n.fullname(None))
                    .unwrap_or_else(|| "an anonymous type".to_string()),
            }
            .into());
        }
    }

    // Backpatch; descents through the placeholder now reach the body.
    let _ = cell.set((body.encode_fn(), body.decode_fn()));
    Ok(body)
}
