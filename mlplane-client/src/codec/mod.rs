//! Payload serialization for endpoint invocations
//!
//! Serializers and deserializers are a closed set of variants, each carrying
//! the content type it produces or accepts.

pub mod npy;

use serde_json::Value;

use crate::error::{ClientError, Result};

pub const CONTENT_TYPE_CSV: &str = "text/csv";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_NPY: &str = "application/x-npy";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

// ============================================================================
// Payloads
// ============================================================================

/// Dense row-major array of `f64`
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<f64>,
}

/// Number of elements a shape holds, rejecting shapes that overflow `usize`
pub(crate) fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |count, &dim| count.checked_mul(dim))
        .ok_or_else(|| ClientError::Codec(format!("Shape {shape:?} is too large")))
}

impl NdArray {
    /// Creates an array, checking that `data` fills `shape`
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected = element_count(&shape)?;
        if expected != data.len() {
            return Err(ClientError::Codec(format!(
                "Shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional array
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Two-dimensional array; every row must have the same length
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != width) {
            return Err(ClientError::Codec("Ragged rows".to_string()));
        }
        let height = rows.len();
        Ok(Self {
            shape: vec![height, width],
            data: rows.into_iter().flatten().collect(),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Rows of a one- or two-dimensional array
    ///
    /// A vector is a single row.
    pub fn rows(&self) -> Result<Vec<&[f64]>> {
        match self.shape.as_slice() {
            [_] => Ok(vec![self.data.as_slice()]),
            [_, width] if *width > 0 => Ok(self.data.chunks(*width).collect()),
            [_, _] => Ok(Vec::new()),
            dims => Err(ClientError::Codec(format!(
                "Cannot lay out a {}-dimensional array as rows",
                dims.len()
            ))),
        }
    }
}

/// Request or response body for an endpoint invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
    Json(Value),
    Array(NdArray),
    Csv(Vec<Vec<String>>),
    /// Undecoded body together with the content type it arrived with
    Stream {
        body: Vec<u8>,
        content_type: Option<String>,
    },
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<NdArray> for Payload {
    fn from(array: NdArray) -> Self {
        Self::Array(array)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

// ============================================================================
// Serializers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Serializer {
    Csv,
    Json,
    Npy,
    #[default]
    Raw,
}

impl Serializer {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => CONTENT_TYPE_CSV,
            Self::Json => CONTENT_TYPE_JSON,
            Self::Npy => CONTENT_TYPE_NPY,
            Self::Raw => CONTENT_TYPE_OCTET_STREAM,
        }
    }

    /// Encodes a payload into a request body
    pub fn encode(&self, payload: &Payload) -> Result<Vec<u8>> {
        match self {
            Self::Csv => encode_csv(payload),
            Self::Json => encode_json(payload),
            Self::Npy => encode_npy(payload),
            Self::Raw => match payload {
                Payload::Bytes(bytes) | Payload::Stream { body: bytes, .. } => Ok(bytes.clone()),
                Payload::Text(text) => Ok(text.clone().into_bytes()),
                other => Err(unsupported("raw", other)),
            },
        }
    }
}

fn encode_csv(payload: &Payload) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    match payload {
        Payload::Array(array) => {
            if array.is_empty() {
                return Err(ClientError::Codec("Cannot serialize empty array".to_string()));
            }
            for row in array.rows()? {
                writer
                    .write_record(row.iter().map(f64::to_string))
                    .map_err(codec_error)?;
            }
        }
        Payload::Csv(rows) => {
            if rows.is_empty() {
                return Err(ClientError::Codec("Cannot serialize empty array".to_string()));
            }
            for row in rows {
                writer.write_record(row).map_err(codec_error)?;
            }
        }
        Payload::Json(Value::Array(items)) => {
            if items.is_empty() {
                return Err(ClientError::Codec("Cannot serialize empty array".to_string()));
            }
            let nested = items.iter().all(Value::is_array);
            if nested {
                for row in items.iter().filter_map(Value::as_array) {
                    writer
                        .write_record(row.iter().map(json_scalar))
                        .map_err(codec_error)?;
                }
            } else {
                writer
                    .write_record(items.iter().map(json_scalar))
                    .map_err(codec_error)?;
            }
        }
        Payload::Text(text) => return Ok(text.clone().into_bytes()),
        other => return Err(unsupported("csv", other)),
    }

    let mut bytes = writer
        .into_inner()
        .map_err(|e| ClientError::Codec(e.to_string()))?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    Ok(bytes)
}

fn encode_json(payload: &Payload) -> Result<Vec<u8>> {
    let value = match payload {
        Payload::Json(value) => value.clone(),
        Payload::Array(array) => match array.rows()?.as_slice() {
            [row] if array.shape().len() == 1 => Value::from(row.to_vec()),
            rows => Value::from(rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()),
        },
        Payload::Csv(rows) => Value::from(rows.clone()),
        Payload::Text(text) => return Ok(text.clone().into_bytes()),
        other => return Err(unsupported("json", other)),
    };
    serde_json::to_vec(&value).map_err(codec_error)
}

fn encode_npy(payload: &Payload) -> Result<Vec<u8>> {
    match payload {
        Payload::Array(array) => npy::encode(array),
        Payload::Json(value) => npy::encode(&array_from_json(value)?),
        other => Err(unsupported("npy", other)),
    }
}

// ============================================================================
// Deserializers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deserializer {
    Csv,
    Json,
    Npy,
    #[default]
    Bytes,
    Text,
    Stream,
}

impl Deserializer {
    /// Content type requested through the `Accept` header
    pub fn accept(&self) -> &'static str {
        match self {
            Self::Csv => CONTENT_TYPE_CSV,
            Self::Json => CONTENT_TYPE_JSON,
            Self::Npy => CONTENT_TYPE_NPY,
            Self::Text => CONTENT_TYPE_TEXT,
            Self::Bytes | Self::Stream => CONTENT_TYPE_OCTET_STREAM,
        }
    }

    /// Decodes a response body
    ///
    /// `Npy` also understands CSV and JSON bodies, picked by `content_type`;
    /// any other media type is rejected.
    pub fn decode(&self, body: Vec<u8>, content_type: Option<&str>) -> Result<Payload> {
        match self {
            Self::Csv => decode_csv(&body),
            Self::Json => serde_json::from_slice(&body)
                .map(Payload::Json)
                .map_err(codec_error),
            Self::Npy => match media_type(content_type) {
                Some(CONTENT_TYPE_CSV) => {
                    let rows = parse_csv(&body)?
                        .into_iter()
                        .map(|row| {
                            row.iter()
                                .map(|v| v.trim().parse::<f64>().map_err(codec_error))
                                .collect::<Result<Vec<_>>>()
                        })
                        .collect::<Result<Vec<_>>>()?;
                    NdArray::from_rows(rows).map(Payload::Array)
                }
                Some(CONTENT_TYPE_JSON) => {
                    let value: Value = serde_json::from_slice(&body).map_err(codec_error)?;
                    array_from_json(&value).map(Payload::Array)
                }
                None | Some(CONTENT_TYPE_NPY) => npy::decode(&body).map(Payload::Array),
                Some(other) => Err(ClientError::Codec(format!(
                    "content_type must be one of CSV, JSON, NPY, got {other}"
                ))),
            },
            Self::Bytes => Ok(Payload::Bytes(body)),
            Self::Text => String::from_utf8(body)
                .map(Payload::Text)
                .map_err(codec_error),
            Self::Stream => Ok(Payload::Stream {
                body,
                content_type: content_type.map(str::to_string),
            }),
        }
    }
}

fn decode_csv(body: &[u8]) -> Result<Payload> {
    parse_csv(body).map(Payload::Csv)
}

fn parse_csv(body: &[u8]) -> Result<Vec<Vec<String>>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body)
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(codec_error)
        })
        .collect()
}

// ============================================================================
// Helpers
// ============================================================================

/// `text/csv; charset=utf-8` becomes `text/csv`
fn media_type(content_type: Option<&str>) -> Option<&str> {
    content_type.map(|ct| ct.split(';').next().unwrap_or(ct).trim())
}

fn array_from_json(value: &Value) -> Result<NdArray> {
    let number = |v: &Value| {
        v.as_f64()
            .ok_or_else(|| ClientError::Codec(format!("Not a number: {v}")))
    };

    match value {
        Value::Array(items) if items.iter().all(Value::is_array) && !items.is_empty() => {
            let rows = items
                .iter()
                .filter_map(Value::as_array)
                .map(|row| row.iter().map(number).collect::<Result<Vec<_>>>())
                .collect::<Result<Vec<_>>>()?;
            NdArray::from_rows(rows)
        }
        Value::Array(items) => items
            .iter()
            .map(number)
            .collect::<Result<Vec<_>>>()
            .map(NdArray::from_vec),
        other => Err(ClientError::Codec(format!("Expected a JSON array, got {other}"))),
    }
}

fn json_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unsupported(codec: &str, payload: &Payload) -> ClientError {
    let kind = match payload {
        Payload::Bytes(_) => "bytes",
        Payload::Text(_) => "text",
        Payload::Json(_) => "json",
        Payload::Array(_) => "array",
        Payload::Csv(_) => "csv rows",
        Payload::Stream { .. } => "stream",
    };
    ClientError::Codec(format!("The {codec} serializer cannot encode a {kind} payload"))
}

fn codec_error(e: impl std::fmt::Display) -> ClientError {
    ClientError::Codec(e.to_string())
}
