//! Records appended to a channel's log.
//!
//! * [`Record`] - One entry of the log: a notes, reset or step record with its payload
//! * [`Payload`] - Named values of a record
//! * [`RecordValue`] - A value in a payload
//! * [`WireRecord`] - The JSON shape of a record on a line of the structured log
//! * [`BinaryRef`] - Reference to bytes offloaded to the companion binary file
//!
//! ```rust
//! use border_recording::record::{Payload, Record, RecordValue};
//!
//! let mut payload = Payload::empty();
//! payload.insert("reward", -1f32);
//! payload.insert("observation", RecordValue::Image(vec![0u8; 84 * 84], [84, 84, 1]));
//! let record = Record::step(0, 0, payload);
//! assert_eq!(record.step_id, Some(0));
//! ```
mod base;
mod value;
mod wire;

pub use base::{Payload, Record, RecordKind};
pub use value::{Dtype, RecordValue};
pub use wire::{BinaryRef, WireRecord};
pub(crate) use wire::{encode, Encoded};
