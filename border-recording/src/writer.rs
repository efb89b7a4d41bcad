//! Durable writer of a channel's log.
//!
//! Each channel has two files in the recording directory:
//!
//! * `border.recording.{instance_id}.{channel}.jsonl` - one [`WireRecord`] per line
//! * `border.recording.{instance_id}.{channel}.bin` - offloaded array values, referenced by
//!   [`BinaryRef`]s in the structured log
//!
//! [`WireRecord`]: crate::record::WireRecord
//! [`BinaryRef`]: crate::record::BinaryRef
mod backend;
mod config;
mod sink;

pub use backend::WriteBackend;
pub use config::{WriteMode, WriterConfig};
pub use sink::{LogSink, SinkFile};
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "border.recording";

/// Path of the structured log of a channel.
pub fn log_path(dir: impl AsRef<Path>, instance_id: &str, channel: usize) -> PathBuf {
    dir.as_ref()
        .join(format!("{}.{}.{}.jsonl", FILE_PREFIX, instance_id, channel))
}

/// Path of the binary file of a channel.
pub fn bin_path(dir: impl AsRef<Path>, instance_id: &str, channel: usize) -> PathBuf {
    dir.as_ref()
        .join(format!("{}.{}.{}.bin", FILE_PREFIX, instance_id, channel))
}
