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

//! Avro single-object encoding: a two-byte marker, the schema fingerprint
//! and one datum, for messages that travel outside a container file.

use crate::codec::Codec;
use crate::error::Details;
use crate::io::Sink;
use crate::schema::Schema;
use crate::AvroResult;
use std::io::{Read, Write};

/// Produces the header prefixed to every single-object message.
pub trait HeaderBuilder {
    fn build_header(&self) -> Vec<u8>;
}

/// The standard header: marker bytes `C3 01` followed by the 8-byte
/// little-endian CRC-64-AVRO fingerprint of the schema.
pub struct FingerprintHeader {
    fingerprint: u64,
}

impl FingerprintHeader {
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            fingerprint: schema.fingerprint(),
        }
    }
}

impl HeaderBuilder for FingerprintHeader {
    fn build_header(&self) -> Vec<u8> {
        let mut header = vec![0xC3, 0x01];
        header.extend_from_slice(&self.fingerprint.to_le_bytes());
        header
    }
}

/// Writes single-object messages with a typed codec.
pub struct SingleObjectWriter<T> {
    codec: Codec<T>,
    header: Vec<u8>,
}

impl<T> SingleObjectWriter<T> {
    pub fn new(codec: Codec<T>) -> Self {
        let header = FingerprintHeader::from_schema(codec.schema()).build_header();
        Self { codec, header }
    }

    pub fn with_header_builder(codec: Codec<T>, header_builder: impl HeaderBuilder) -> Self {
        let header = header_builder.build_header();
        Self { codec, header }
    }

    /// Write header and datum, returning the number of bytes written.
    pub fn write_value<W: Write>(&self, value: &T, writer: &mut W) -> AvroResult<usize> {
        let mut body = Sink::new();
        self.codec.encode(value, &mut body)?;
        writer
            .write_all(&self.header)
            .and_then(|()| writer.write_all(body.as_slice()))
            .map_err(Details::WriteBytes)?;
        Ok(self.header.len() + body.len())
    }

    /// The message as a fresh byte vector.
    pub fn to_bytes(&self, value: &T) -> AvroResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_value(value, &mut bytes)?;
        Ok(bytes)
    }
}

/// Reads single-object messages, verifying the header before decoding.
pub struct SingleObjectReader<T> {
    codec: Codec<T>,
    expected_header: Vec<u8>,
}

impl<T> SingleObjectReader<T> {
    pub fn new(codec: Codec<T>) -> Self {
        let expected_header = FingerprintHeader::from_schema(codec.schema()).build_header();
        Self {
            codec,
            expected_header,
        }
    }

    pub fn with_header_builder(codec: Codec<T>, header_builder: impl HeaderBuilder) -> Self {
        let expected_header = header_builder.build_header();
        Self {
            codec,
            expected_header,
        }
    }

    pub fn read_value<R: Read>(&self, reader: &mut R) -> AvroResult<T> {
        let mut header = vec![0; self.expected_header.len()];
        reader.read_exact(&mut header).map_err(Details::ReadHeader)?;
        if header != self.expected_header {
            return Err(Details::SingleObjectHeaderMismatch(
                self.expected_header.clone(),
                header,
            )
            .into());
        }
        let mut body = Vec::new();
        reader.read_to_end(&mut body).map_err(Details::ReadBytes)?;
        self.codec.decode_slice(&body)
    }

    pub fn read_from_slice(&self, bytes: &[u8]) -> AvroResult<T> {
        self.read_value(&mut &bytes[..])
    }
}
