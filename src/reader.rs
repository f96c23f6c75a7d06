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

//! Reading Avro object container files.

use crate::codec::Codec;
use crate::compression::{self, Compression};
use crate::error::Details;
use crate::io::{read_long_stream, Source};
use crate::schema::Schema;
use crate::util::safe_len;
use crate::writer::AVRO_OBJECT_HEADER;
use crate::AvroResult;
use log::warn;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

/// Reads values from an Avro object container file.
///
/// The header is parsed at construction. [`read_block`](Reader::read_block)
/// is the primitive; the [`Iterator`] implementation yields one record at a
/// time across block boundaries, and [`blocks`](Reader::blocks) iterates
/// whole blocks. Peak memory is one block's compressed plus decompressed
/// payload; abandoning iteration stops reading the file.
///
/// ```no_run
/// use avrokit::{codec, Reader};
///
/// let mut reader = Reader::open("events.avro", codec::long())?;
/// for record in &mut reader {
///     println!("{}", record?);
/// }
/// # Ok::<(), avrokit::Error>(())
/// ```
pub struct Reader<T, R: Read> {
    codec: Codec<T>,
    reader: R,
    compression: Arc<dyn Compression>,
    compression_name: String,
    writer_schema: Schema,
    metadata: HashMap<String, Vec<u8>>,
    marker: [u8; 16],
    current_block: VecDeque<T>,
    finished: bool,
}

impl<T, R: Read> Reader<T, R> {
    /// Open a container from any byte source and parse its header.
    pub fn new(codec: Codec<T>, mut reader: R) -> AvroResult<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(Details::ReadHeader)?;
        if &magic[..] != AVRO_OBJECT_HEADER {
            return Err(Details::BadHeaderMagic.into());
        }

        let metadata = read_metadata(&mut reader)?;

        let schema_bytes = metadata
            .get("avro.schema")
            .ok_or(Details::MissingSchemaMetadata)?;
        let schema_json = std::str::from_utf8(schema_bytes)
            .map_err(|_| Details::MissingSchemaMetadata)?;
        let writer_schema = Schema::parse_str(schema_json)?;

        let compression_name = match metadata.get("avro.codec") {
            Some(bytes) => std::str::from_utf8(bytes)
                .map_err(|_| Details::BadCodecMetadata)?
                .to_string(),
            None => "null".to_string(),
        };
        let compression = compression::lookup_required(&compression_name)?;

        for key in metadata.keys() {
            if key.starts_with("avro.") && key != "avro.schema" && key != "avro.codec" {
                warn!("Ignoring unknown reserved metadata key: {key}");
            }
        }

        let mut marker = [0u8; 16];
        reader.read_exact(&mut marker).map_err(Details::ReadMarker)?;

        Ok(Self {
            codec,
            reader,
            compression,
            compression_name,
            writer_schema,
            metadata,
            marker,
            current_block: VecDeque::new(),
            finished: false,
        })
    }

    /// The schema embedded in the file header.
    pub fn writer_schema(&self) -> &Schema {
        &self.writer_schema
    }

    /// The name of the compression codec the file was written with.
    pub fn codec_name(&self) -> &str {
        &self.compression_name
    }

    /// The complete metadata map, reserved entries included.
    pub fn metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.metadata
    }

    /// The sync marker separating the blocks of this file.
    pub fn sync_marker(&self) -> [u8; 16] {
        self.marker
    }

    /// Read and decode the next block, or `None` at end of file.
    ///
    /// The trailing sync marker of every block is verified against the
    /// header marker; mid-block truncation is a malformed block.
    pub fn read_block(&mut self) -> AvroResult<Option<Vec<T>>> {
        if self.finished {
            return Ok(None);
        }
        let count = match self.read_block_count()? {
            None => {
                self.finished = true;
                return Ok(None);
            }
            Some(count) => count,
        };
        if count < 0 {
            return Err(Details::MalformedBlock(format!("negative record count {count}")).into());
        }
        let count = safe_len(count as usize)?;

        let compressed_size = read_long_stream(&mut self.reader).map_err(truncated)?;
        if compressed_size < 0 {
            return Err(Details::MalformedBlock(format!(
                "negative block size {compressed_size}"
            ))
            .into());
        }
        let mut compressed = vec![0u8; safe_len(compressed_size as usize)?];
        self.reader
            .read_exact(&mut compressed)
            .map_err(|e| Details::MalformedBlock(format!("truncated block payload: {e}")))?;

        let mut trailing = [0u8; 16];
        self.reader
            .read_exact(&mut trailing)
            .map_err(|e| Details::MalformedBlock(format!("truncated sync marker: {e}")))?;
        if trailing != self.marker {
            return Err(Details::SyncMarkerMismatch.into());
        }

        let decompressed = self.compression.decompress(&compressed)?;
        let mut source = Source::new(&decompressed);
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(self.codec.decode(&mut source)?);
        }
        if !source.is_empty() {
            return Err(Details::MalformedBlock(format!(
                "{} unconsumed byte(s) after {count} record(s)",
                source.remaining()
            ))
            .into());
        }
        Ok(Some(records))
    }

    /// The lazy record sequence: one record at a time, block boundaries
    /// internal. Equivalent to iterating the reader itself.
    pub fn records(&mut self) -> Records<'_, T, R> {
        Records { reader: self }
    }

    /// Iterate whole blocks instead of single records.
    pub fn blocks(&mut self) -> Blocks<'_, T, R> {
        Blocks {
            reader: self,
            errored: false,
        }
    }

    /// Read the record count of the next block, or `None` on a clean end of
    /// file (no bytes where the next block would start).
    fn read_block_count(&mut self) -> AvroResult<Option<i64>> {
        let mut first = [0u8; 1];
        loop {
            match self.reader.read(&mut first) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Details::ReadBlock(e).into()),
            }
        }

        // Continue the varint whose first byte is already in hand.
        let mut z = u64::from(first[0] & 0x7F);
        let mut shift = 7u32;
        let mut byte = first[0];
        while byte & 0x80 != 0 {
            if shift > 63 {
                return Err(Details::IntegerOverflow.into());
            }
            let mut buf = [0u8; 1];
            self.reader
                .read_exact(&mut buf)
                .map_err(|e| Details::MalformedBlock(format!("truncated record count: {e}")))?;
            byte = buf[0];
            z |= u64::from(byte & 0x7F) << shift;
            shift += 7;
        }
        let n = if z & 0x1 == 0 {
            (z >> 1) as i64
        } else {
            !(z >> 1) as i64
        };
        Ok(Some(n))
    }
}

impl<T> Reader<T, BufReader<File>> {
    /// Open the container file at `path`.
    pub fn open(path: impl AsRef<Path>, codec: Codec<T>) -> AvroResult<Self> {
        let file = File::open(path).map_err(Details::OpenFile)?;
        Self::new(codec, BufReader::new(file))
    }
}

/// Records are yielded one at a time; block boundaries are internal. After
/// an error the iterator fuses.
impl<T, R: Read> Iterator for Reader<T, R> {
    type Item = AvroResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.current_block.pop_front() {
                return Some(Ok(value));
            }
            match self.read_block() {
                Ok(Some(block)) => self.current_block = block.into(),
                Ok(None) => return None,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Iterator over single records, created by [`Reader::records`].
pub struct Records<'r, T, R: Read> {
    reader: &'r mut Reader<T, R>,
}

impl<T, R: Read> Iterator for Records<'_, T, R> {
    type Item = AvroResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next()
    }
}

/// Iterator over whole blocks, created by [`Reader::blocks`].
pub struct Blocks<'r, T, R: Read> {
    reader: &'r mut Reader<T, R>,
    errored: bool,
}

impl<T, R: Read> Iterator for Blocks<'_, T, R> {
    type Item = AvroResult<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        match self.reader.read_block() {
            Ok(block) => block.map(Ok),
            Err(e) => {
                self.errored = true;
                Some(Err(e))
            }
        }
    }
}

fn truncated(err: crate::Error) -> crate::Error {
    Details::MalformedBlock(format!("truncated block frame: {err}")).into()
}

/// Decode the header's metadata map: one or more map blocks of
/// `string -> bytes` entries, terminated by a zero count.
fn read_metadata<R: Read>(reader: &mut R) -> AvroResult<HashMap<String, Vec<u8>>> {
    let mut metadata = HashMap::new();
    loop {
        let count = read_long_stream(reader).map_err(|e| header_error(&e))?;
        if count == 0 {
            break;
        }
        let count = if count < 0 {
            // Negative-count block: the byte size precedes the entries.
            let _byte_size = read_long_stream(reader).map_err(|e| header_error(&e))?;
            count.unsigned_abs()
        } else {
            count as u64
        };
        for _ in 0..count {
            let key = read_bytes_stream(reader)?;
            let key = String::from_utf8(key).map_err(Details::ConvertToUtf8)?;
            let value = read_bytes_stream(reader)?;
            metadata.insert(key, value);
        }
    }
    Ok(metadata)
}

fn read_bytes_stream<R: Read>(reader: &mut R) -> AvroResult<Vec<u8>> {
    let len = read_long_stream(reader).map_err(|e| header_error(&e))?;
    if len < 0 {
        return Err(Details::NegativeLength(len).into());
    }
    let mut bytes = vec![0u8; safe_len(len as usize)?];
    reader.read_exact(&mut bytes).map_err(Details::ReadHeader)?;
    Ok(bytes)
}

fn header_error(err: &crate::Error) -> crate::Error {
    Details::ReadHeader(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        err.to_string(),
    ))
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::error::Error;
    use crate::writer::Writer;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn write_longs(values: &[i64]) -> Vec<u8> {
        let mut writer = Writer::new(codec::long(), Vec::new()).unwrap();
        for value in values {
            writer.write(value).unwrap();
        }
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_round_trip_in_memory() -> TestResult {
        let bytes = write_longs(&[1, 2, 3]);
        let reader = Reader::new(codec::long(), &bytes[..])?;
        let values: Result<Vec<i64>, _> = reader.collect();
        assert_eq!(values?, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let bytes = b"NOPE____________________".to_vec();
        assert!(matches!(
            Reader::new(codec::long(), &bytes[..])
                .err()
                .map(Error::into_details),
            Some(Details::BadHeaderMagic)
        ));
    }

    #[test]
    fn test_metadata_is_exposed() -> TestResult {
        let bytes = write_longs(&[5]);
        let reader = Reader::new(codec::long(), &bytes[..])?;
        assert_eq!(reader.codec_name(), "null");
        assert!(reader.metadata().contains_key("avro.schema"));
        assert_eq!(reader.writer_schema(), &Schema::long());
        Ok(())
    }

    #[test]
    fn test_empty_file_yields_no_blocks() -> TestResult {
        let bytes = write_longs(&[]);
        let mut reader = Reader::new(codec::long(), &bytes[..])?;
        assert!(reader.read_block()?.is_none());
        // And stays finished.
        assert!(reader.read_block()?.is_none());
        Ok(())
    }

    #[test]
    fn test_sync_mismatch_is_fatal() -> TestResult {
        let mut bytes = write_longs(&[1, 2, 3]);
        // Corrupt one byte of the block's trailing sync marker.
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let mut reader = Reader::new(codec::long(), &bytes[..])?;
        assert!(matches!(
            reader.read_block().err().map(Error::into_details),
            Some(Details::SyncMarkerMismatch)
        ));
        Ok(())
    }

    #[test]
    fn test_truncated_block_is_malformed() -> TestResult {
        let bytes = write_longs(&[1, 2, 3]);
        let truncated = &bytes[..bytes.len() - 8];
        let mut reader = Reader::new(codec::long(), truncated)?;
        assert!(matches!(
            reader.read_block().err().map(Error::into_details),
            Some(Details::MalformedBlock(_))
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_codec_fails_open() -> TestResult {
        // Hand-build a header naming an unregistered codec.
        let mut sink = crate::io::Sink::new();
        sink.write_fixed(AVRO_OBJECT_HEADER);
        sink.write_long(2);
        sink.write_str("avro.schema");
        sink.write_bytes(b"\"long\"");
        sink.write_str("avro.codec");
        sink.write_bytes(b"lzma-ultra");
        sink.write_long(0);
        sink.write_fixed(&[0u8; 16]);
        let bytes = sink.into_bytes();
        assert!(matches!(
            Reader::new(codec::long(), &bytes[..])
                .err()
                .map(Error::into_details),
            Some(Details::CodecNotRegistered(name)) if name == "lzma-ultra"
        ));
        Ok(())
    }

    #[test]
    fn test_missing_schema_fails_open() {
        let mut sink = crate::io::Sink::new();
        sink.write_fixed(AVRO_OBJECT_HEADER);
        sink.write_long(0);
        sink.write_fixed(&[0u8; 16]);
        let bytes = sink.into_bytes();
        assert!(matches!(
            Reader::new(codec::long(), &bytes[..])
                .err()
                .map(Error::into_details),
            Some(Details::MissingSchemaMetadata)
        ));
    }

    #[test]
    fn test_records_matches_direct_iteration() -> TestResult {
        let bytes = write_longs(&[1, 2, 3]);
        let mut reader = Reader::new(codec::long(), &bytes[..])?;
        let values: Result<Vec<i64>, _> = reader.records().collect();
        assert_eq!(values?, vec![1, 2, 3]);
        // The sequence is exhausted either way.
        assert!(reader.next().is_none());
        Ok(())
    }

    #[test]
    fn test_blocks_iteration() -> TestResult {
        let mut writer = Writer::new(codec::long(), Vec::new())?;
        writer.write_block(&[1, 2])?;
        writer.write_block(&[3])?;
        let bytes = writer.into_inner()?;

        let mut reader = Reader::new(codec::long(), &bytes[..])?;
        let blocks: Result<Vec<Vec<i64>>, _> = reader.blocks().collect();
        assert_eq!(blocks?, vec![vec![1, 2], vec![3]]);
        Ok(())
    }

    #[test]
    fn test_fold_over_records() -> TestResult {
        let bytes = write_longs(&[1, 2, 3, 4]);
        let mut reader = Reader::new(codec::long(), &bytes[..])?;
        let sum = reader.try_fold(0i64, |acc, record| record.map(|v| acc + v))?;
        assert_eq!(sum, 10);
        Ok(())
    }

    #[test]
    fn test_early_termination_stops_reading() -> TestResult {
        let bytes = write_longs(&[1, 2, 3]);
        let mut reader = Reader::new(codec::long(), &bytes[..])?;
        let first = reader.next().transpose()?;
        assert_eq!(first, Some(1));
        drop(reader);
        Ok(())
    }
}
