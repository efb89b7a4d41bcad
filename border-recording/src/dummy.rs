//! This module is used for tests.
use crate::env::{EnvMetadata, VecEnv, VecStep};
use anyhow::{bail, Result};
use serde_json::{json, Value};

/// Configuration of [`CountingEnv`].
#[derive(Debug, Clone)]
pub struct CountingEnvConfig {
    /// Number of channels.
    pub n_channels: usize,

    /// Number of steps of an episode.
    pub episode_len: usize,

    /// Length of an observation.
    pub obs_dim: usize,

    /// Auto-reset semantics.
    pub autoreset: bool,

    /// Asynchronous step semantics.
    pub asynchronous: bool,
}

impl Default for CountingEnvConfig {
    fn default() -> Self {
        Self {
            n_channels: 2,
            episode_len: 5,
            obs_dim: 4,
            autoreset: false,
            asynchronous: false,
        }
    }
}

/// A deterministic environment counting steps.
///
/// The observation of a channel is `[t; obs_dim]` where `t` is the step in the episode,
/// the reward is the action, and the episode ends after `episode_len` steps.
pub struct CountingEnv {
    config: CountingEnvConfig,
    metadata: EnvMetadata,
    t: Vec<usize>,
}

impl CountingEnv {
    /// Builds the environment.
    pub fn build(config: &CountingEnvConfig) -> Self {
        let metadata = EnvMetadata::new("Counting-v0")
            .semantics_autoreset(config.autoreset)
            .semantics_async(config.asynchronous)
            .tag("episode_len", config.episode_len);
        Self {
            config: config.clone(),
            metadata,
            t: vec![0; config.n_channels],
        }
    }

    fn obs(&self, t: usize) -> Vec<f32> {
        vec![t as f32; self.config.obs_dim]
    }
}

impl VecEnv for CountingEnv {
    type Obs = Vec<f32>;
    type Act = i64;
    type Info = Value;

    fn metadata(&self) -> &EnvMetadata {
        &self.metadata
    }

    fn n_channels(&self) -> usize {
        self.config.n_channels
    }

    fn reset(&mut self) -> Result<Vec<Self::Obs>> {
        self.t.iter_mut().for_each(|t| *t = 0);
        Ok(self.t.iter().map(|&t| self.obs(t)).collect())
    }

    fn step(&mut self, acts: &[Self::Act]) -> Result<VecStep<Self::Obs, Self::Info>> {
        if acts.len() != self.config.n_channels {
            bail!(
                "Expected {} actions, got {}",
                self.config.n_channels,
                acts.len()
            );
        }

        let mut step = VecStep {
            obs: vec![],
            reward: vec![],
            is_done: vec![],
            info: vec![],
        };
        for (i, act) in acts.iter().enumerate() {
            self.t[i] += 1;
            let t = self.t[i];
            let done = t >= self.config.episode_len;
            if done && self.config.autoreset {
                self.t[i] = 0;
            }
            step.obs.push(self.obs(t));
            step.reward.push(*act as f32);
            step.is_done.push(done as i8);
            step.info.push(json!({ "t": t }));
        }
        Ok(step)
    }
}
