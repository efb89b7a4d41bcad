//! Line format of the structured log.
//!
//! A [`Record`] is encoded into one JSON object per line. Array values larger than the
//! inline threshold are written to the companion binary file and replaced with a
//! [`BinaryRef`] under `binary_refs`.
use super::{Dtype, Record, RecordKind, RecordValue};
use crate::error::{RecordingError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};
use std::collections::BTreeMap;

/// Location of an offloaded value in the binary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryRef {
    /// Byte offset from the beginning of the binary file.
    pub offset: u64,

    /// Number of bytes.
    pub length: u64,

    /// Element type.
    pub dtype: Dtype,

    /// Shape of the array.
    pub shape: Vec<usize>,
}

/// A record as it appears on a line of the structured log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    /// Kind of the record.
    #[serde(rename = "type")]
    pub kind: RecordKind,

    /// Episode index, absent for notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<usize>,

    /// Step index, present only for steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<usize>,

    /// Seconds since the Unix epoch.
    pub timestamp: f64,

    /// Inline fields.
    #[serde(default)]
    pub payload: Map<String, Value>,

    /// Offloaded fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary_refs: BTreeMap<String, BinaryRef>,
}

/// Output of [`encode`]: the log line and the blobs to be appended, in order,
/// to the binary file before the line is written.
#[derive(Debug)]
pub(crate) struct Encoded {
    pub line: String,
    pub blobs: Vec<Vec<u8>>,
}

impl Encoded {
    pub fn blob_len(&self) -> u64 {
        self.blobs.iter().map(|b| b.len() as u64).sum()
    }
}

/// Encodes `record`, assuming its blobs will be written starting at `base_offset`.
///
/// Nothing is written here, so a failure leaves both files untouched.
pub(crate) fn encode(record: &Record, base_offset: u64, inline_threshold: usize) -> Result<Encoded> {
    let mut payload = Map::new();
    let mut binary_refs = BTreeMap::new();
    let mut blobs = vec![];
    let mut offset = base_offset;

    for (field, value) in record.payload.iter() {
        match (value.array_layout(), value.to_bytes()) {
            (Some((dtype, shape)), Some(bytes)) if bytes.len() > inline_threshold => {
                let length = bytes.len() as u64;
                binary_refs.insert(
                    field.clone(),
                    BinaryRef {
                        offset,
                        length,
                        dtype,
                        shape,
                    },
                );
                offset += length;
                blobs.push(bytes);
            }
            _ => {
                payload.insert(field.clone(), inline_value(field, value)?);
            }
        }
    }

    let ts = record.timestamp;
    let wire = WireRecord {
        kind: record.kind,
        episode_id: record.episode_id,
        step_id: record.step_id,
        timestamp: ts.timestamp() as f64 + ts.timestamp_subsec_micros() as f64 * 1e-6,
        payload,
        binary_refs,
    };
    let line = serde_json::to_string(&wire)
        .map_err(|e| RecordingError::serialization("<record>", e.to_string()))?;

    Ok(Encoded { line, blobs })
}

fn float(field: &str, v: f32) -> Result<Value> {
    Number::from_f64(v as f64)
        .map(Value::Number)
        .ok_or_else(|| RecordingError::serialization(field, format!("non-finite value {}", v)))
}

fn inline_value(field: &str, value: &RecordValue) -> Result<Value> {
    let v = match value {
        RecordValue::Scalar(v) => float(field, *v)?,
        RecordValue::Int(v) => Value::from(*v),
        RecordValue::Bool(v) => Value::Bool(*v),
        RecordValue::String(v) => Value::String(v.clone()),
        RecordValue::DateTime(v) => Value::String(v.to_rfc3339()),
        RecordValue::Json(v) => v.clone(),
        RecordValue::Array1(data) | RecordValue::Array2(data, _) | RecordValue::Array3(data, _) => {
            let data = data
                .iter()
                .map(|x| float(field, *x))
                .collect::<Result<Vec<_>>>()?;
            inline_array(value, Value::Array(data))
        }
        RecordValue::Image(data, _) | RecordValue::Bytes(data) => {
            inline_array(value, Value::from(data.clone()))
        }
    };
    Ok(v)
}

fn inline_array(value: &RecordValue, data: Value) -> Value {
    match value.array_layout() {
        Some((dtype, shape)) => json!({ "dtype": dtype, "shape": shape, "data": data }),
        None => data,
    }
}
