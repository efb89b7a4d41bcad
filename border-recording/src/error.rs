//! Errors in the library.
use std::io;
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum RecordingError {
    /// Invalid configuration, e.g., an unknown policy selector.
    #[error("Config error: {0}")]
    Config(String),

    /// Failed to create the recording directory or to read/write the log files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A payload field could not be represented in the structured log.
    #[error("Serialization error at field '{field}': {reason}")]
    Serialization {
        /// Name of the offending payload field.
        field: String,

        /// Description of the failure.
        reason: String,
    },

    /// The background worker of an asynchronous writer failed to write.
    #[error("Asynchronous write failed on channel {channel}: {source}")]
    AsyncWrite {
        /// Channel of the writer.
        channel: usize,

        /// The error the worker hit.
        #[source]
        source: Box<RecordingError>,
    },

    /// Channel index not less than the number of channels.
    #[error("Channel {channel} is out of range (n_channels = {n_channels})")]
    ChannelOutOfRange {
        /// Requested channel.
        channel: usize,

        /// Number of channels of the controller.
        n_channels: usize,
    },

    /// A record was given to a writer that has been closed.
    #[error("Writer of channel {0} has been closed")]
    WriterClosed(usize),
}

impl RecordingError {
    pub(crate) fn serialization(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Serialization {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error only affects a single record.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }
}

/// Result type of this crate.
pub type Result<T> = std::result::Result<T, RecordingError>;
