//! Values stored in a payload.
use chrono::prelude::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Element type of an array value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    /// 32-bit float, little-endian in the binary file.
    F32,

    /// Unsigned byte.
    U8,
}

impl Dtype {
    /// Size of an element in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::F32 => 4,
            Self::U8 => 1,
        }
    }
}

/// Represents possible types of values that can be stored in a [`Payload`](super::Payload).
///
/// Scalars, strings and nested JSON values are always written inline. Arrays, images
/// and raw bytes are moved to the binary file when they are larger than
/// [`WriterConfig::inline_threshold`](crate::WriterConfig).
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, typically a reward.
    Scalar(f32),

    /// An integer, e.g., a discrete action.
    Int(i64),

    /// A flag.
    Bool(bool),

    /// A text value.
    String(String),

    /// A timestamp with local timezone.
    DateTime(DateTime<Local>),

    /// A 1-dimensional array.
    Array1(Vec<f32>),

    /// A 2-dimensional array with shape information.
    Array2(Vec<f32>, [usize; 2]),

    /// A 3-dimensional array with shape information.
    Array3(Vec<f32>, [usize; 3]),

    /// An image in `[height, width, channels]` layout.
    Image(Vec<u8>, [usize; 3]),

    /// Opaque bytes.
    Bytes(Vec<u8>),

    /// An arbitrary structured value, e.g., the info of a step.
    Json(serde_json::Value),
}

impl RecordValue {
    /// Returns the element type and shape if this value can be offloaded
    /// to the binary file.
    pub fn array_layout(&self) -> Option<(Dtype, Vec<usize>)> {
        match self {
            Self::Array1(v) => Some((Dtype::F32, vec![v.len()])),
            Self::Array2(_, s) => Some((Dtype::F32, s.to_vec())),
            Self::Array3(_, s) => Some((Dtype::F32, s.to_vec())),
            Self::Image(_, s) => Some((Dtype::U8, s.to_vec())),
            Self::Bytes(v) => Some((Dtype::U8, vec![v.len()])),
            _ => None,
        }
    }

    /// Raw little-endian bytes of an array value.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Array1(v) | Self::Array2(v, _) | Self::Array3(v, _) => {
                Some(v.iter().flat_map(|x| x.to_le_bytes().to_vec()).collect())
            }
            Self::Image(v, _) | Self::Bytes(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Size of the raw bytes of an array value, `0` for other values.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Array1(v) | Self::Array2(v, _) | Self::Array3(v, _) => v.len() * 4,
            Self::Image(v, _) | Self::Bytes(v) => v.len(),
            _ => 0,
        }
    }
}

impl From<f32> for RecordValue {
    fn from(v: f32) -> Self {
        Self::Scalar(v)
    }
}

impl From<i64> for RecordValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for RecordValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<bool> for RecordValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for RecordValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for RecordValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<f32>> for RecordValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Array1(v)
    }
}

impl From<serde_json::Value> for RecordValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl From<()> for RecordValue {
    fn from(_: ()) -> Self {
        Self::Json(serde_json::Value::Null)
    }
}
