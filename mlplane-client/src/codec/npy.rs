//! `.npy` v1.0 encoding
//!
//! Arrays are written as C-ordered little-endian `f8`. Reading also accepts
//! `f4`, `i8` and `i4` data and converts it to `f64`.

use super::{NdArray, element_count};
use crate::error::{ClientError, Result};

const MAGIC: &[u8] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

/// Encodes an array as `.npy` bytes
pub fn encode(array: &NdArray) -> Result<Vec<u8>> {
    if array.is_empty() {
        return Err(ClientError::Codec("Cannot serialize empty array".to_string()));
    }

    let shape = match array.shape() {
        [n] => format!("({},)", n),
        dims => format!(
            "({})",
            dims.iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };

    let mut header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': {}, }}", shape);
    // magic (6) + version (2) + header length (2) + header + newline
    let unpadded = MAGIC.len() + 4 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| ClientError::Codec("npy header too long".to_string()))?;

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + array.data().len() * 8);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in array.data() {
        out.extend_from_slice(&value.to_le_bytes());
    }

    Ok(out)
}

/// Decodes `.npy` bytes into an array
pub fn decode(bytes: &[u8]) -> Result<NdArray> {
    if bytes.len() < MAGIC.len() + 4 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(ClientError::Codec("Not an npy payload".to_string()));
    }

    let major = bytes[MAGIC.len()];
    let (header_len, header_start) = match major {
        1 => (
            u16::from_le_bytes([bytes[8], bytes[9]]) as usize,
            MAGIC.len() + 4,
        ),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(ClientError::Codec("Truncated npy header".to_string()));
            }
            (
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
                MAGIC.len() + 6,
            )
        }
        other => {
            return Err(ClientError::Codec(format!(
                "Unsupported npy version {other}"
            )));
        }
    };

    let data_start = header_start + header_len;
    let header = bytes
        .get(header_start..data_start)
        .and_then(|h| std::str::from_utf8(h).ok())
        .ok_or_else(|| ClientError::Codec("Invalid npy header".to_string()))?;

    let header = Header::parse(header)?;
    if header.fortran_order {
        return Err(ClientError::Codec(
            "Fortran-ordered npy arrays are not supported".to_string(),
        ));
    }

    let count = element_count(&header.shape)?;
    let body = &bytes[data_start..];
    let width = header.dtype.width();
    let expected = count
        .checked_mul(width)
        .ok_or_else(|| ClientError::Codec(format!("Shape {:?} is too large", header.shape)))?;
    if body.len() < expected {
        return Err(ClientError::Codec(format!(
            "npy body holds {} bytes, expected {expected}",
            body.len()
        )));
    }

    let data = body
        .chunks_exact(width)
        .take(count)
        .map(|chunk| header.dtype.read(chunk))
        .collect();

    NdArray::new(header.shape, data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    F8,
    F4,
    I8,
    I4,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self> {
        match descr {
            "<f8" => Ok(Self::F8),
            "<f4" => Ok(Self::F4),
            "<i8" => Ok(Self::I8),
            "<i4" => Ok(Self::I4),
            other => Err(ClientError::Codec(format!(
                "Unsupported npy dtype {other}"
            ))),
        }
    }

    fn width(&self) -> usize {
        match self {
            Self::F8 | Self::I8 => 8,
            Self::F4 | Self::I4 => 4,
        }
    }

    fn read(&self, chunk: &[u8]) -> f64 {
        let mut eight = [0u8; 8];
        let mut four = [0u8; 4];
        match self {
            Self::F8 => {
                eight.copy_from_slice(chunk);
                f64::from_le_bytes(eight)
            }
            Self::I8 => {
                eight.copy_from_slice(chunk);
                i64::from_le_bytes(eight) as f64
            }
            Self::F4 => {
                four.copy_from_slice(chunk);
                f32::from_le_bytes(four) as f64
            }
            Self::I4 => {
                four.copy_from_slice(chunk);
                i32::from_le_bytes(four) as f64
            }
        }
    }
}

#[derive(Debug)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

impl Header {
    /// Parses the Python dict literal of an npy header
    fn parse(text: &str) -> Result<Self> {
        let invalid = || ClientError::Codec(format!("Invalid npy header: {}", text.trim()));

        let descr = value_after(text, "'descr'")
            .and_then(|rest| rest.split('\'').nth(1))
            .ok_or_else(invalid)?;

        let fortran_order = value_after(text, "'fortran_order'")
            .map(|rest| rest.trim_start().starts_with("True"))
            .ok_or_else(invalid)?;

        let shape = value_after(text, "'shape'")
            .and_then(|rest| {
                let start = rest.find('(')?;
                let end = rest[start..].find(')')? + start;
                Some(&rest[start + 1..end])
            })
            .ok_or_else(invalid)?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<usize>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            dtype: Dtype::parse(descr)?,
            fortran_order,
            shape,
        })
    }
}

fn value_after<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let start = text.find(key)? + key.len();
    let rest = &text[start..];
    let colon = rest.find(':')?;
    Some(&rest[colon + 1..])
}
