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

//! Error types for the whole crate.

use crate::schema::SchemaKind;

/// Errors encountered while working with Avro data.
///
/// To inspect the details of the error use [`details`](Self::details) or
/// [`into_details`](Self::into_details) to get a [`Details`] which contains
/// more precise error information.
#[derive(thiserror::Error, Debug)]
#[repr(transparent)]
#[error(transparent)]
pub struct Error {
    details: Box<Details>,
}

impl Error {
    pub fn new(details: Details) -> Self {
        Self {
            details: Box::new(details),
        }
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_details(self) -> Details {
        *self.details
    }
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self::new(details)
    }
}

impl From<ResolutionError> for Error {
    fn from(err: ResolutionError) -> Self {
        Self::new(Details::Resolution(err))
    }
}

/// All possible error conditions, as a single enum.
#[derive(thiserror::Error, Debug)]
pub enum Details {
    // ---- binary input/output ----
    #[error("Unexpected end of input: needed {needed} more byte(s), {remaining} left")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Variable-length integer does not terminate within 10 bytes")]
    IntegerOverflow,

    #[error("Decoded long {1} does not fit in an int: {0}")]
    ZagI32(#[source] std::num::TryFromIntError, i64),

    #[error("Invalid utf-8 string")]
    ConvertToUtf8(#[source] std::string::FromUtf8Error),

    #[error("Unable to allocate {desired} bytes (maximum allowed: {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Negative length prefix: {0}")]
    NegativeLength(i64),

    // ---- typed codecs ----
    #[error("Fixed size mismatch, expected: {size}, got: {n}")]
    CompareFixedSizes { size: usize, n: usize },

    #[error("Union index {index} out of bounds: {num_variants}")]
    GetUnionVariant { index: i64, num_variants: usize },

    #[error("Value matches none of the union branches")]
    NoMatchingUnionBranch,

    #[error("Enum value index {index} is out of bounds {nsymbols}")]
    GetEnumValue { index: usize, nsymbols: usize },

    #[error("Recursive codec {0} used before its body was built")]
    RecursiveCodecIncomplete(String),

    #[error("Recursive codec body must be a named type {expected}, got {found}")]
    RecursiveCodecName { expected: String, found: String },

    #[error("Duplicate field name in record: {0}")]
    FieldNameDuplicate(String),

    #[error("Record {0} has no fields")]
    EmptyRecordFields(String),

    // ---- schema model ----
    #[error("Invalid name {0}, expected to match the regex {1}")]
    InvalidSchemaName(String, &'static str),

    #[error("Invalid namespace {0}, expected to match the regex {1}")]
    InvalidNamespace(String, &'static str),

    #[error("Invalid enum symbol name {0}")]
    EnumSymbolName(String),

    #[error("Invalid record field name {0}")]
    FieldName(String),

    #[error("No `name` field")]
    GetNameField,

    #[error("Union type should not be empty")]
    EmptyUnion,

    #[error("Unions may not directly contain a union")]
    GetNestedUnion,

    #[error("Unions cannot contain duplicate types")]
    GetUnionDuplicate,

    #[error("Enum {0} has no symbols")]
    EmptyEnumSymbols(String),

    #[error("Enum symbol {0} appears more than once")]
    EnumSymbolDuplicate(String),

    #[error("Enum default {symbol:?} is not among the symbols of {name}")]
    EnumDefaultUnknown { symbol: String, name: String },

    #[error("Fixed {0} must have a size greater than zero")]
    FixedSizeZero(String),

    #[error("Named type {0} is defined more than once")]
    SchemaRedefinition(String),

    #[error("Reference to undefined named type {0}")]
    SchemaRefNotFound(String),

    // ---- JSON schema parsing ----
    #[error("Failed to parse schema from JSON")]
    ParseSchemaJson(#[source] serde_json::Error),

    #[error("Must be a JSON string, object or array")]
    ParseSchemaFromValidJson,

    #[error("Unknown primitive type: {0}")]
    ParsePrimitive(String),

    #[error("Unknown complex type: {0}")]
    GetComplexType(serde_json::Value),

    #[error("No `type` in complex type")]
    GetComplexTypeField,

    #[error("No `items` in array")]
    GetArrayItemsField,

    #[error("No `values` in map")]
    GetMapValuesField,

    #[error("No `size` in fixed")]
    GetFixedSizeField,

    #[error("No `symbols` in enum")]
    GetEnumSymbolsField,

    #[error("No `fields` in record")]
    GetRecordFields,

    #[error("Default value {value} does not match the {kind:?} schema of its field")]
    DefaultValueMismatch {
        kind: SchemaKind,
        value: serde_json::Value,
    },

    #[error("Failed to serialize schema to JSON")]
    ConvertJsonToString(#[source] serde_json::Error),

    // ---- schema resolution ----
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    // ---- compression registry ----
    #[error("Compression codec {0} is not registered")]
    CodecNotRegistered(String),

    #[error("Compression codec {codec} failed: {reason}")]
    Compression { codec: String, reason: String },

    // ---- object container files ----
    #[error("Invalid object container file magic")]
    BadHeaderMagic,

    #[error("No avro.schema entry in the object container file header")]
    MissingSchemaMetadata,

    #[error("avro.codec metadata entry is not valid utf-8")]
    BadCodecMetadata,

    #[error("Block sync marker does not match the file header marker")]
    SyncMarkerMismatch,

    #[error("Malformed data block: {0}")]
    MalformedBlock(String),

    #[error("Metadata keys starting with 'avro.' are reserved: {0}")]
    InvalidMetadataKey(String),

    #[error("Metadata cannot be added after the file header has been written")]
    FileHeaderAlreadyWritten,

    #[error("Single-object header mismatch: expected {0:?}, got {1:?}")]
    SingleObjectHeaderMismatch(Vec<u8>, Vec<u8>),

    #[error("Failed to read bytes: {0}")]
    ReadBytes(#[source] std::io::Error),

    // ---- stream input/output ----
    #[error("Failed to read object container file header: {0}")]
    ReadHeader(#[source] std::io::Error),

    #[error("Failed to read sync marker: {0}")]
    ReadMarker(#[source] std::io::Error),

    #[error("Failed to read data block: {0}")]
    ReadBlock(#[source] std::io::Error),

    #[error("Failed to read variable-length integer: {0}")]
    ReadVariableIntegerBytes(#[source] std::io::Error),

    #[error("Failed to write bytes: {0}")]
    WriteBytes(#[source] std::io::Error),

    #[error("Failed to write sync marker: {0}")]
    WriteMarker(#[source] std::io::Error),

    #[error("Failed to flush the underlying writer: {0}")]
    FlushWriter(#[source] std::io::Error),

    #[error("Failed to open file: {0}")]
    OpenFile(#[source] std::io::Error),

    #[error("Failed to create file: {0}")]
    CreateFile(#[source] std::io::Error),
}

/// Errors produced while resolving a reader schema against a writer schema.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Reader schema {reader:?} cannot read data written as {writer:?}")]
    TypeMismatch {
        reader: SchemaKind,
        writer: SchemaKind,
    },

    #[error("Reader field {record}.{field} is missing from the writer and has no default")]
    MissingField { record: String, field: String },

    #[error("Reader and writer schemas of field {record}.{field} cannot be reconciled")]
    FieldMismatch { record: String, field: String },

    #[error("No reader union branch accepts writer branch {name}")]
    MissingUnionBranch { name: String },

    #[error("Writer enum symbol {symbol} is unknown to the reader and no default symbol is set")]
    MissingSymbol { symbol: String },

    #[error("Fixed {name} size mismatch: reader expects {reader}, writer wrote {writer}")]
    FixedSizeMismatch {
        name: String,
        reader: usize,
        writer: usize,
    },

    #[error("Named type {name} was not resolved before decoding")]
    NamedTypeUnresolved { name: String },
}
