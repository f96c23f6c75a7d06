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

//! Writing Avro object container files.

use crate::codec::Codec;
use crate::compression::{self, Compression};
use crate::error::Details;
use crate::io::Sink;
use crate::schema::Schema;
use crate::AvroResult;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Number of buffered records that triggers an automatic block flush.
pub const DEFAULT_SYNC_INTERVAL: usize = 4000;

pub(crate) const AVRO_OBJECT_HEADER: &[u8] = b"Obj\x01";

/// Writes values to an Avro object container file.
///
/// The header (magic, metadata map, sync marker) is written once, ahead of
/// the first block. Records buffer in a write-ahead block that is compressed
/// and framed every `sync_interval` records, on [`flush`](Writer::flush),
/// and on [`close`](Writer::close).
///
/// It is critical to call [`flush`](Writer::flush) or [`close`](Writer::close)
/// before the `Writer` is dropped; dropping does not flush.
pub struct Writer<T, W: Write> {
    codec: Codec<T>,
    writer: W,
    compression: Arc<dyn Compression>,
    sync_interval: usize,
    buffer: Sink,
    num_values: usize,
    marker: [u8; 16],
    user_metadata: HashMap<String, Vec<u8>>,
    has_header: bool,
}

#[bon::bon]
impl<T: 'static, W: Write> Writer<T, W> {
    /// Configure a writer. Nothing is written until the first flush.
    #[builder(finish_fn = build)]
    pub fn builder(
        codec: Codec<T>,
        writer: W,
        /// Compression codec name, looked up in the registry.
        #[builder(default = String::from("null"))]
        compression: String,
        #[builder(default = DEFAULT_SYNC_INTERVAL)] sync_interval: usize,
        #[builder(default = generate_sync_marker())] marker: [u8; 16],
        /// User metadata pairs written after the reserved entries.
        /// Keys must not start with `avro.`.
        #[builder(default)]
        metadata: HashMap<String, Vec<u8>>,
        /// Skip the header to continue an existing container; `marker` must
        /// then be the file's original sync marker.
        #[builder(default = false)]
        append: bool,
    ) -> AvroResult<Self> {
        let compression = compression::lookup_required(&compression)?;
        for key in metadata.keys() {
            if key.starts_with("avro.") {
                return Err(Details::InvalidMetadataKey(key.clone()).into());
            }
        }
        Ok(Writer {
            codec,
            writer,
            compression,
            sync_interval,
            buffer: Sink::new(),
            num_values: 0,
            marker,
            user_metadata: metadata,
            has_header: append,
        })
    }
}

impl<T: 'static, W: Write> Writer<T, W> {
    /// A writer with default settings: no compression, default sync interval.
    pub fn new(codec: Codec<T>, writer: W) -> AvroResult<Self> {
        Self::builder().codec(codec).writer(writer).build()
    }

    /// A writer compressing blocks with the named registry codec.
    pub fn with_compression(codec: Codec<T>, writer: W, compression: &str) -> AvroResult<Self> {
        Self::builder()
            .codec(codec)
            .writer(writer)
            .compression(compression.to_string())
            .build()
    }

    /// A writer that appends blocks to an already populated container,
    /// using that file's sync `marker`.
    pub fn append_to(codec: Codec<T>, writer: W, marker: [u8; 16]) -> AvroResult<Self> {
        Self::builder()
            .codec(codec)
            .writer(writer)
            .marker(marker)
            .append(true)
            .build()
    }

    /// The schema of the record codec.
    pub fn schema(&self) -> &Schema {
        self.codec.schema()
    }

    /// The sync marker separating blocks of this file.
    pub fn sync_marker(&self) -> [u8; 16] {
        self.marker
    }

    /// Add custom metadata to the file header.
    ///
    /// Keys starting with `avro.` are reserved, and no metadata can be added
    /// once the header has been written.
    pub fn add_user_metadata<V: AsRef<[u8]>>(&mut self, key: String, value: V) -> AvroResult<()> {
        if self.has_header {
            return Err(Details::FileHeaderAlreadyWritten.into());
        }
        if key.starts_with("avro.") {
            return Err(Details::InvalidMetadataKey(key).into());
        }
        self.user_metadata.insert(key, value.as_ref().to_vec());
        Ok(())
    }

    /// Serialize one value into the pending block, flushing the block when
    /// it reaches the sync interval.
    pub fn write(&mut self, value: &T) -> AvroResult<()> {
        self.encode_buffered(value)?;
        self.num_values += 1;
        if self.num_values >= self.sync_interval {
            self.flush_block()?;
        }
        Ok(())
    }

    /// Emit the supplied values as exactly one block, flushing any pending
    /// buffer first. An empty slice writes nothing.
    pub fn write_block(&mut self, values: &[T]) -> AvroResult<()> {
        self.flush_block()?;
        for value in values {
            self.encode_buffered(value)?;
        }
        self.num_values = values.len();
        self.flush_block()
    }

    /// Encode into the block buffer, undoing partial bytes on failure so a
    /// failed record cannot corrupt the block.
    fn encode_buffered(&mut self, value: &T) -> AvroResult<()> {
        let clean_len = self.buffer.len();
        self.codec.encode(value, &mut self.buffer).inspect_err(|_| {
            self.buffer.truncate(clean_len);
        })
    }

    /// Flush the pending block and the underlying writer. This also writes
    /// the header if it has not been written yet.
    pub fn flush(&mut self) -> AvroResult<()> {
        self.flush_block()?;
        self.writer.flush().map_err(|e| Details::FlushWriter(e).into())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> AvroResult<W> {
        self.flush()?;
        Ok(self.writer)
    }

    /// Flush and release the underlying writer.
    pub fn close(self) -> AvroResult<()> {
        self.into_inner().map(drop)
    }

    /// Serialize, compress and frame the buffered records as one block,
    /// writing the header first if needed. No-op on an empty buffer.
    fn flush_block(&mut self) -> AvroResult<()> {
        self.maybe_write_header()?;
        if self.num_values == 0 {
            return Ok(());
        }
        let compressed = self.compression.compress(self.buffer.as_slice())?;

        let mut frame = Sink::new();
        frame.write_long(self.num_values as i64);
        frame.write_long(compressed.len() as i64);
        self.writer
            .write_all(frame.as_slice())
            .map_err(Details::WriteBytes)?;
        self.writer
            .write_all(&compressed)
            .map_err(Details::WriteBytes)?;
        self.writer
            .write_all(&self.marker)
            .map_err(Details::WriteMarker)?;

        self.buffer.clear();
        self.num_values = 0;
        Ok(())
    }

    /// Magic, metadata map (one Avro map block) and sync marker, emitted
    /// exactly once, ahead of the first block.
    fn maybe_write_header(&mut self) -> AvroResult<()> {
        if self.has_header {
            return Ok(());
        }
        let schema_json =
            serde_json::to_string(self.codec.schema()).map_err(Details::ConvertJsonToString)?;

        let mut header = Sink::new();
        header.write_fixed(AVRO_OBJECT_HEADER);
        header.write_long((2 + self.user_metadata.len()) as i64);
        header.write_str("avro.schema");
        header.write_bytes(schema_json.as_bytes());
        header.write_str("avro.codec");
        header.write_bytes(self.compression.name().as_bytes());
        let mut user_entries: Vec<_> = self.user_metadata.iter().collect();
        user_entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (key, value) in user_entries {
            header.write_str(key);
            header.write_bytes(value);
        }
        header.write_long(0);
        header.write_fixed(&self.marker);

        self.writer
            .write_all(header.as_slice())
            .map_err(Details::WriteBytes)?;
        self.has_header = true;
        Ok(())
    }
}

impl<T: 'static> Writer<T, BufWriter<File>> {
    /// Create (or truncate) a container file at `path`.
    pub fn create(path: impl AsRef<Path>, codec: Codec<T>) -> AvroResult<Self> {
        let file = File::create(path).map_err(Details::CreateFile)?;
        Self::new(codec, BufWriter::new(file))
    }
}

fn generate_sync_marker() -> [u8; 16] {
    rand::random()
}
