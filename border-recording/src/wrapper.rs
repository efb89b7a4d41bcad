//! Wrapper recording a [`VecEnv`].
use crate::{
    controller::{RecordingConfig, RecordingController},
    env::{VecEnv, VecStep},
    error::Result,
    policy::RecordingPolicy,
};
use log::warn;

/// Records the interaction with a vectorized environment.
///
/// Observations, actions, rewards and info pass through unchanged; failures of the
/// recording layer are logged and never fail [`reset`](Self::reset) or
/// [`step`](Self::step).
///
/// ```no_run
/// # use border_recording::{dummy::{CountingEnv, CountingEnvConfig}, Recording, RecordingConfig};
/// let env = CountingEnv::build(&CountingEnvConfig::default());
/// let config = RecordingConfig::default()
///     .recording_dir("/tmp/recordings")
///     .policy("always");
/// let mut env = Recording::build(env, &config)?;
/// env.reset()?;
/// env.step(&[0, 1])?;
/// env.close()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct Recording<E: VecEnv> {
    env: E,
    controller: RecordingController,
}

impl<E: VecEnv> Recording<E> {
    /// Wraps `env`.
    pub fn build(env: E, config: &RecordingConfig) -> Result<Self> {
        let controller = RecordingController::build(config, env.metadata(), env.n_channels())?;
        Ok(Self { env, controller })
    }

    /// Wraps `env`, recording episodes selected by `policy`.
    pub fn build_with_policy(
        env: E,
        config: &RecordingConfig,
        policy: RecordingPolicy,
    ) -> Result<Self> {
        let controller = RecordingController::build_with_policy(
            config,
            env.metadata(),
            env.n_channels(),
            policy,
        )?;
        Ok(Self { env, controller })
    }

    /// Resets all channels.
    pub fn reset(&mut self) -> anyhow::Result<Vec<E::Obs>> {
        let obs = self.env.reset()?;

        for (i, o) in obs.iter().enumerate() {
            if let Err(e) = self.controller.on_reset_with_obs(i, Some(o.clone().into())) {
                warn!("Failed to record reset of channel {}: {}", i, e);
            }
        }

        Ok(obs)
    }

    /// Performs a step on all channels.
    pub fn step(&mut self, acts: &[E::Act]) -> anyhow::Result<VecStep<E::Obs, E::Info>> {
        let step = self.env.step(acts)?;

        for i in 0..self.controller.n_channels() {
            let r = match (
                acts.get(i),
                step.obs.get(i),
                step.reward.get(i),
                step.is_done.get(i),
                step.info.get(i),
            ) {
                (Some(act), Some(obs), Some(reward), Some(is_done), Some(info)) => {
                    self.controller.on_step(
                        i,
                        act.clone().into(),
                        obs.clone().into(),
                        *reward,
                        info.clone().into(),
                        *is_done != 0,
                    )
                }
                _ => {
                    warn!("Step of channel {} is missing", i);
                    Ok(())
                }
            };
            if let Err(e) = r {
                warn!("Failed to record step of channel {}: {}", i, e);
            }
        }

        Ok(step)
    }

    /// Flushes the log files.
    pub fn flush(&self) -> Result<()> {
        self.controller.flush()
    }

    /// Drains and closes the log files.
    pub fn close(&self) -> Result<()> {
        self.controller.close()
    }

    /// The recording controller.
    pub fn controller(&self) -> &RecordingController {
        &self.controller
    }

    /// The wrapped environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// The wrapped environment.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }
}
