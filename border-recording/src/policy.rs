//! Episode sampling policies.
//!
//! A [`RecordingPolicy`] decides, once per episode at reset time, whether the episode
//! of a channel is written to the log.
use crate::error::RecordingError;
use std::{fmt, str::FromStr, sync::Arc};

/// Period of the sparse regime of [`RecordingPolicy::CappedCubic`].
const CUBIC_CAP: usize = 1000;

/// Decides whether an episode is recorded.
#[derive(Clone)]
pub enum RecordingPolicy {
    /// Never records.
    Never,

    /// Records every episode.
    Always,

    /// Records episodes whose index is a perfect cube below 1000,
    /// then the first two episodes of every thousand.
    CappedCubic,

    /// A user-defined predicate on the episode index.
    Custom(Arc<dyn Fn(usize) -> bool + Send + Sync>),
}

impl RecordingPolicy {
    /// Wraps a predicate into [`RecordingPolicy::Custom`].
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(usize) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Returns `true` if the episode with index `episode_id` should be recorded.
    pub fn decide(&self, episode_id: usize) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::CappedCubic => capped_cubic(episode_id),
            Self::Custom(f) => f(episode_id),
        }
    }
}

impl Default for RecordingPolicy {
    fn default() -> Self {
        Self::CappedCubic
    }
}

impl fmt::Debug for RecordingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::Always => write!(f, "always"),
            Self::CappedCubic => write!(f, "capped_cubic"),
            Self::Custom(_) => write!(f, "custom"),
        }
    }
}

impl FromStr for RecordingPolicy {
    type Err = RecordingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "never" | "false" => Ok(Self::Never),
            "always" | "true" => Ok(Self::Always),
            "capped_cubic" | "capped-cubic" => Ok(Self::CappedCubic),
            _ => Err(RecordingError::Config(format!(
                "Unknown recording policy '{}', expected one of never, always, capped_cubic, true, false",
                s
            ))),
        }
    }
}

fn capped_cubic(episode_id: usize) -> bool {
    if episode_id < CUBIC_CAP {
        let root = (episode_id as f64).cbrt().round() as usize;
        root * root * root == episode_id
    } else {
        episode_id % CUBIC_CAP < 2
    }
}
