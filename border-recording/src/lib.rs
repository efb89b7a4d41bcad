#![warn(missing_docs)]
//! Recording of episodes of vectorized environments.
//!
//! The stream of actions, observations, rewards and info of each channel is written
//! to a line-delimited JSON log. Large array values, e.g., image observations, are
//! moved to a companion binary file and referenced by offset and length.
//!
//! * [`RecordingPolicy`] - Decides which episodes are recorded
//! * [`WriteBackend`] - Writes a channel's records, synchronously or on a background thread
//! * [`RecordingController`] - Dispatches reset and step events of all channels
//! * [`Recording`] - Wraps a [`VecEnv`] and records its interaction
//! * [`LogReader`] - Reads a log back
//!
//! ```no_run
//! use border_recording::{record::RecordValue, EnvMetadata, RecordingConfig, RecordingController};
//!
//! let config = RecordingConfig::default()
//!     .recording_dir("/tmp/recordings")
//!     .note("agent", "dqn");
//! let metadata = EnvMetadata::new("CartPole-v1");
//! let recorder = RecordingController::build(&config, &metadata, 1)?;
//!
//! recorder.on_reset(0)?;
//! recorder.on_step(
//!     0,
//!     RecordValue::Int(1),
//!     RecordValue::Array1(vec![0.0, 0.1, 0.0, -0.1]),
//!     1.0,
//!     RecordValue::Json(serde_json::Value::Null),
//!     false,
//! )?;
//! recorder.close()?;
//! # Ok::<(), border_recording::RecordingError>(())
//! ```
pub mod dummy;
pub mod error;
pub mod record;
pub mod writer;

mod controller;
mod env;
mod policy;
mod reader;
mod util;
mod wrapper;

pub use controller::{ChannelPhase, RecordingConfig, RecordingController};
pub use env::{EnvMetadata, VecEnv, VecStep};
pub use error::RecordingError;
pub use policy::RecordingPolicy;
pub use reader::LogReader;
pub use wrapper::Recording;
pub use writer::{WriteBackend, WriteMode, WriterConfig};
