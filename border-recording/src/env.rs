//! Interface of the recorded environment.
//!
//! The environment itself is not part of this crate. The controller only needs its
//! [`EnvMetadata`]; the [`Recording`](crate::Recording) wrapper additionally drives it
//! through [`VecEnv`].
use crate::record::RecordValue;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Description of a vectorized environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvMetadata {
    /// Identifier of the environment, e.g., `"CartPole-v1"`.
    pub id: String,

    /// Tags of the environment spec.
    #[serde(default)]
    pub tags: Map<String, Value>,

    /// The environment resets a channel by itself when its episode ends.
    #[serde(default)]
    pub semantics_autoreset: bool,

    /// Steps are produced asynchronously, e.g., by a remote process.
    #[serde(default)]
    pub semantics_async: bool,

    /// Other metadata, recorded verbatim.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl EnvMetadata {
    /// Metadata with the given id and default flags.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Sets the auto-reset flag.
    pub fn semantics_autoreset(mut self, v: bool) -> Self {
        self.semantics_autoreset = v;
        self
    }

    /// Sets the async flag.
    pub fn semantics_async(mut self, v: bool) -> Self {
        self.semantics_async = v;
        self
    }

    /// Adds a tag.
    pub fn tag(mut self, k: impl Into<String>, v: impl Into<Value>) -> Self {
        self.tags.insert(k.into(), v.into());
        self
    }
}

/// Outputs of a step of all channels of a [`VecEnv`].
#[derive(Debug, Clone)]
pub struct VecStep<O, I> {
    /// Observations.
    pub obs: Vec<O>,

    /// Rewards.
    pub reward: Vec<f32>,

    /// Flags denoting if episodes are done.
    pub is_done: Vec<i8>,

    /// Information.
    pub info: Vec<I>,
}

/// A vectorized environment with a fixed number of channels.
pub trait VecEnv {
    /// Observation of a channel.
    type Obs: Clone + Into<RecordValue>;

    /// Action of a channel.
    type Act: Clone + Into<RecordValue>;

    /// Information of a channel.
    type Info: Clone + Into<RecordValue>;

    /// Metadata of the environment.
    fn metadata(&self) -> &EnvMetadata;

    /// Number of channels.
    fn n_channels(&self) -> usize;

    /// Resets all channels.
    fn reset(&mut self) -> Result<Vec<Self::Obs>>;

    /// Performs a step on all channels.
    fn step(&mut self, acts: &[Self::Act]) -> Result<VecStep<Self::Obs, Self::Info>>;
}
