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

//! Block-compression codecs for object container files.
//!
//! Codecs are looked up by their lowercase name in a process-wide registry.
//! `null` and `deflate` are always present; `snappy` and `zstandard` register
//! themselves when the corresponding cargo feature is enabled. Callers may
//! [`register`] their own implementations, replacing existing entries.

use crate::error::Details;
use crate::AvroResult;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// A block compressor/decompressor, identified by its lowercase name.
pub trait Compression: Send + Sync {
    /// The codec name as written into the `avro.codec` metadata entry.
    fn name(&self) -> &str;

    fn compress(&self, data: &[u8]) -> AvroResult<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> AvroResult<Vec<u8>>;
}

type Registry = RwLock<HashMap<String, Arc<dyn Compression>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<String, Arc<dyn Compression>> = HashMap::new();
        let null: Arc<dyn Compression> = Arc::new(Null);
        map.insert(null.name().to_string(), null);
        let deflate: Arc<dyn Compression> = Arc::new(Deflate::default());
        map.insert(deflate.name().to_string(), deflate);
        #[cfg(feature = "snappy")]
        {
            let snappy: Arc<dyn Compression> = Arc::new(snappy::Snappy);
            map.insert(snappy.name().to_string(), snappy);
        }
        #[cfg(feature = "zstandard")]
        {
            let zstandard: Arc<dyn Compression> = Arc::new(zstandard::Zstandard::default());
            map.insert(zstandard.name().to_string(), zstandard);
        }
        RwLock::new(map)
    })
}

/// Register a codec under its own name, replacing any existing entry.
pub fn register(codec: Arc<dyn Compression>) {
    debug!("Registering compression codec {}", codec.name());
    registry()
        .write()
        .expect("compression registry lock poisoned")
        .insert(codec.name().to_string(), codec);
}

/// Look up a codec by name.
pub fn lookup(name: &str) -> Option<Arc<dyn Compression>> {
    registry()
        .read()
        .expect("compression registry lock poisoned")
        .get(name)
        .cloned()
}

/// Like [`lookup`] but failing with [`Details::CodecNotRegistered`].
pub(crate) fn lookup_required(name: &str) -> AvroResult<Arc<dyn Compression>> {
    lookup(name).ok_or_else(|| Details::CodecNotRegistered(name.to_string()).into())
}

/// The names of all registered codecs, sorted.
pub fn names() -> Vec<String> {
    let mut names: Vec<String> = registry()
        .read()
        .expect("compression registry lock poisoned")
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

/// The `null` codec simply passes data through uncompressed.
struct Null;

impl Compression for Null {
    fn name(&self) -> &str {
        "null"
    }

    fn compress(&self, data: &[u8]) -> AvroResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> AvroResult<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// The `deflate` codec writes the raw deflate stream of RFC 1951, without
/// the zlib wrapper of RFC 1950, as the Avro specification requires.
pub struct Deflate {
    level: u8,
}

impl Deflate {
    pub fn new(level: u8) -> Self {
        Self { level }
    }
}

impl Default for Deflate {
    fn default() -> Self {
        Self::new(miniz_oxide::deflate::CompressionLevel::DefaultCompression as u8)
    }
}

impl Compression for Deflate {
    fn name(&self) -> &str {
        "deflate"
    }

    fn compress(&self, data: &[u8]) -> AvroResult<Vec<u8>> {
        Ok(miniz_oxide::deflate::compress_to_vec(data, self.level))
    }

    fn decompress(&self, data: &[u8]) -> AvroResult<Vec<u8>> {
        miniz_oxide::inflate::decompress_to_vec(data).map_err(|e| {
            Details::Compression {
                codec: self.name().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(feature = "snappy")]
mod snappy {
    use super::*;

    /// Snappy-compressed blocks carry a trailing 4-byte big-endian CRC32 of
    /// the uncompressed data.
    pub(super) struct Snappy;

    impl Compression for Snappy {
        fn name(&self) -> &str {
            "snappy"
        }

        fn compress(&self, data: &[u8]) -> AvroResult<Vec<u8>> {
            let mut encoded = vec![0; snap::raw::max_compress_len(data.len())];
            let compressed_size = snap::raw::Encoder::new()
                .compress(data, &mut encoded[..])
                .map_err(|e| Details::Compression {
                    codec: "snappy".to_string(),
                    reason: e.to_string(),
                })?;
            encoded.truncate(compressed_size);

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(data);
            encoded.extend_from_slice(&hasher.finalize().to_be_bytes());
            Ok(encoded)
        }

        fn decompress(&self, data: &[u8]) -> AvroResult<Vec<u8>> {
            let compression_error = |reason: String| Details::Compression {
                codec: "snappy".to_string(),
                reason,
            };
            if data.len() < 4 {
                return Err(compression_error("block shorter than its checksum".into()).into());
            }
            let (payload, checksum) = data.split_at(data.len() - 4);
            let decoded = snap::raw::Decoder::new()
                .decompress_vec(payload)
                .map_err(|e| compression_error(e.to_string()))?;

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&decoded);
            let actual = hasher.finalize();
            let expected = u32::from_be_bytes(checksum.try_into().unwrap());
            if expected != actual {
                return Err(compression_error(format!(
                    "crc32 mismatch: expected {expected:x}, got {actual:x}"
                ))
                .into());
            }
            Ok(decoded)
        }
    }
}

#[cfg(feature = "zstandard")]
mod zstandard {
    use super::*;

    pub(super) struct Zstandard {
        level: i32,
    }

    impl Default for Zstandard {
        fn default() -> Self {
            Self { level: 0 }
        }
    }

    impl Compression for Zstandard {
        fn name(&self) -> &str {
            "zstandard"
        }

        fn compress(&self, data: &[u8]) -> AvroResult<Vec<u8>> {
            zstd::stream::encode_all(data, self.level).map_err(|e| {
                Details::Compression {
                    codec: "zstandard".to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
        }

        fn decompress(&self, data: &[u8]) -> AvroResult<Vec<u8>> {
            zstd::stream::decode_all(data).map_err(|e| {
                Details::Compression {
                    codec: "zstandard".to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    const INPUT: &[u8] = b"theanswertolifetheuniverseandeverythingis42theanswertolifetheuniverseandeverythingis4theanswertolifetheuniverseandeverythingis2";

    #[test]
    fn test_null_is_identity() -> TestResult {
        let codec = lookup("null").unwrap();
        let compressed = codec.compress(INPUT)?;
        assert_eq!(compressed, INPUT);
        assert_eq!(codec.decompress(&compressed)?, INPUT);
        Ok(())
    }

    #[test]
    fn test_deflate_round_trip() -> TestResult {
        let codec = lookup("deflate").unwrap();
        let compressed = codec.compress(INPUT)?;
        assert_ne!(compressed, INPUT);
        assert!(compressed.len() < INPUT.len());
        assert_eq!(codec.decompress(&compressed)?, INPUT);
        Ok(())
    }

    #[test]
    fn test_deflate_rejects_garbage() {
        let codec = lookup("deflate").unwrap();
        assert!(codec.decompress(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn test_unknown_codec_fails_lookup() {
        assert!(lookup("lzma-ultra").is_none());
        assert!(lookup_required("lzma-ultra").is_err());
    }

    #[test]
    fn test_builtins_are_listed() {
        let names = names();
        assert!(names.contains(&"null".to_string()));
        assert!(names.contains(&"deflate".to_string()));
    }

    #[test]
    fn test_register_replaces() -> TestResult {
        struct Shout;
        impl Compression for Shout {
            fn name(&self) -> &str {
                "shout"
            }
            fn compress(&self, data: &[u8]) -> AvroResult<Vec<u8>> {
                Ok(data.to_ascii_uppercase())
            }
            fn decompress(&self, data: &[u8]) -> AvroResult<Vec<u8>> {
                Ok(data.to_ascii_lowercase())
            }
        }

        register(Arc::new(Shout));
        let codec = lookup("shout").unwrap();
        assert_eq!(codec.compress(b"abc")?, b"ABC");
        assert_eq!(codec.decompress(b"ABC")?, b"abc");
        Ok(())
    }

    #[cfg(feature = "snappy")]
    #[test]
    fn test_snappy_round_trip() -> TestResult {
        let codec = lookup("snappy").unwrap();
        let compressed = codec.compress(INPUT)?;
        assert_eq!(codec.decompress(&compressed)?, INPUT);
        Ok(())
    }

    #[cfg(feature = "zstandard")]
    #[test]
    fn test_zstandard_round_trip() -> TestResult {
        let codec = lookup("zstandard").unwrap();
        let compressed = codec.compress(INPUT)?;
        assert_eq!(codec.decompress(&compressed)?, INPUT);
        Ok(())
    }
}
