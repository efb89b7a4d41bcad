//! Recording of episodes across the channels of a vectorized environment.
mod channel;
mod config;
use crate::{
    env::EnvMetadata,
    error::{RecordingError, Result},
    policy::RecordingPolicy,
    record::{Payload, Record, RecordValue},
    util::{lock, random_alphanumeric},
    writer::{log_path, WriteBackend, WriteMode, WriterConfig},
};
use channel::ChannelState;
pub use channel::ChannelPhase;
pub use config::RecordingConfig;
use log::{debug, info, trace, warn};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

/// Length of the random id of a recording session.
const INSTANCE_ID_LEN: usize = 6;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Decides which episodes are recorded and writes their records.
///
/// The environment-stepping loop calls [`on_reset`](Self::on_reset) and
/// [`on_step`](Self::on_step) for every channel. At each reset, the
/// [`RecordingPolicy`] is asked whether the new episode is recorded:
///
/// ```mermaid
/// stateDiagram-v2
///     [*] --> Idle
///     Idle --> Active: reset, selected
///     Idle --> Inactive: reset, not selected
///     Active --> Active: step
///     Inactive --> Inactive: step
///     Active --> AwaitingReset: done
///     Inactive --> AwaitingReset: done
///     AwaitingReset --> Active: reset, selected
///     AwaitingReset --> Inactive: reset, not selected
/// ```
///
/// With auto-reset semantics, a done step moves the channel directly to the next
/// episode as if a reset had been observed.
///
/// The writer of a channel is opened on its first recorded episode. The first record
/// of every log is a notes record holding the environment metadata and the
/// annotations in [`RecordingConfig::notes`]. Writers are kept open across episodes,
/// so a channel's episodes end up in one log.
///
/// Each channel has its own lock; channels can be driven from different threads, while
/// the events of a single channel must come in order.
pub struct RecordingController {
    recording_dir: Option<PathBuf>,
    instance_id: String,
    policy: RecordingPolicy,
    write_mode: WriteMode,
    writer_config: WriterConfig,
    semantics_autoreset: bool,
    notes: Payload,
    channels: Vec<Mutex<ChannelState>>,
}

impl RecordingController {
    /// Builds a controller for an environment with `n_channels` channels.
    ///
    /// Fails if the policy selector is invalid or the recording directory cannot
    /// be created.
    pub fn build(
        config: &RecordingConfig,
        metadata: &EnvMetadata,
        n_channels: usize,
    ) -> Result<Self> {
        let policy = match &config.policy {
            Some(s) => s.parse()?,
            None => RecordingPolicy::default(),
        };
        Self::build_with_policy(config, metadata, n_channels, policy)
    }

    /// Builds a controller with the given policy, ignoring [`RecordingConfig::policy`].
    pub fn build_with_policy(
        config: &RecordingConfig,
        metadata: &EnvMetadata,
        n_channels: usize,
        policy: RecordingPolicy,
    ) -> Result<Self> {
        let write_mode = config
            .write_mode
            .unwrap_or_else(|| WriteMode::for_env(metadata.semantics_async));
        let instance_id = random_alphanumeric(INSTANCE_ID_LEN);

        let policy = match &config.recording_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                info!(
                    "Recording {} channels of {} to {:?} with policy={:?}, mode={:?}, instance_id={}",
                    n_channels, metadata.id, dir, policy, write_mode, instance_id
                );
                policy
            }
            None => {
                info!(
                    "Recording disabled since recording_dir is not set (requested policy={:?})",
                    policy
                );
                RecordingPolicy::Never
            }
        };

        Ok(Self {
            recording_dir: config.recording_dir.clone(),
            instance_id,
            policy,
            write_mode,
            writer_config: config.writer.clone(),
            semantics_autoreset: metadata.semantics_autoreset,
            notes: notes(metadata, &config.notes),
            channels: (0..n_channels)
                .map(|_| Mutex::new(ChannelState::new()))
                .collect(),
        })
    }

    /// Starts a new episode on `channel`.
    pub fn on_reset(&self, channel: usize) -> Result<()> {
        self.on_reset_with_obs(channel, None)
    }

    /// Starts a new episode on `channel`, recording its initial observation if the
    /// episode is selected.
    pub fn on_reset_with_obs(&self, channel: usize, obs: Option<RecordValue>) -> Result<()> {
        let mut state = self.state(channel)?;
        self.begin_episode(&mut state, channel, obs)
    }

    /// Records a step of `channel` if its current episode is selected.
    ///
    /// When `done` is `true`, the episode ends. With auto-reset semantics the next
    /// episode starts immediately; otherwise steps are ignored until the next
    /// [`on_reset`](Self::on_reset).
    pub fn on_step(
        &self,
        channel: usize,
        action: RecordValue,
        obs: RecordValue,
        reward: f32,
        info: RecordValue,
        done: bool,
    ) -> Result<()> {
        let mut state = self.state(channel)?;

        match state.phase {
            ChannelPhase::Idle | ChannelPhase::AwaitingReset => {
                if !state.warned {
                    warn!(
                        "Ignored a step on channel {} since it has not been reset",
                        channel
                    );
                    state.warned = true;
                } else {
                    trace!("Ignored a step on channel {}", channel);
                }
                return Ok(());
            }
            ChannelPhase::Inactive => {}
            ChannelPhase::Active => {
                let step_id = state.next_step_id();
                let mut payload = Payload::empty();
                payload.insert("action", action);
                payload.insert("observation", obs);
                payload.insert("reward", reward);
                payload.insert("done", done);
                payload.insert("info", info);
                let record = Record::step(state.episode_id, step_id, payload);
                append(&mut state, channel, record);
            }
        }

        if done {
            if self.semantics_autoreset {
                return self.begin_episode(&mut state, channel, None);
            }
            state.phase = ChannelPhase::AwaitingReset;
        }
        Ok(())
    }

    /// Flushes the writers of all channels.
    ///
    /// Returns the first error, e.g., a failure of a background writer since the
    /// last flush. Other channels are flushed regardless.
    pub fn flush(&self) -> Result<()> {
        self.for_each_writer(|w| w.flush())
    }

    /// Drains and closes the writers of all channels.
    ///
    /// Calling this method more than once is a no-op. Records passed after closing
    /// are dropped.
    pub fn close(&self) -> Result<()> {
        self.for_each_writer(|w| w.close())
    }

    /// Random id of this recording session, part of the log file names.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Directory of the log files.
    pub fn recording_dir(&self) -> Option<&Path> {
        self.recording_dir.as_deref()
    }

    /// Path of the structured log of `channel`.
    pub fn log_path(&self, channel: usize) -> Option<PathBuf> {
        self.recording_dir
            .as_ref()
            .map(|dir| log_path(dir, &self.instance_id, channel))
    }

    /// Effective policy; [`RecordingPolicy::Never`] if no directory is configured.
    pub fn policy(&self) -> &RecordingPolicy {
        &self.policy
    }

    /// Write mode of the writers.
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Number of channels.
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// Current phase of `channel`.
    pub fn phase(&self, channel: usize) -> Result<ChannelPhase> {
        Ok(self.state(channel)?.phase)
    }

    /// Index of the current episode of `channel`, `None` before the first reset.
    pub fn episode_id(&self, channel: usize) -> Result<Option<usize>> {
        let state = self.state(channel)?;
        Ok(match state.phase {
            ChannelPhase::Idle => None,
            _ => Some(state.episode_id),
        })
    }

    fn state(&self, channel: usize) -> Result<MutexGuard<'_, ChannelState>> {
        match self.channels.get(channel) {
            Some(m) => Ok(lock(m)),
            None => Err(RecordingError::ChannelOutOfRange {
                channel,
                n_channels: self.channels.len(),
            }),
        }
    }

    fn begin_episode(
        &self,
        state: &mut ChannelState,
        channel: usize,
        obs: Option<RecordValue>,
    ) -> Result<()> {
        let selected = self.policy.decide(state.next_episode_id);
        let episode_id = state.begin_episode(selected);
        if !selected {
            trace!("Episode {} of channel {} is not recorded", episode_id, channel);
            return Ok(());
        }

        if let Err(e) = self.ensure_writer(state, channel) {
            state.phase = ChannelPhase::Inactive;
            return Err(e);
        }
        debug!("Recording episode {} of channel {}", episode_id, channel);

        let mut payload = Payload::empty();
        if let Some(obs) = obs {
            payload.insert("observation", obs);
        }
        append(state, channel, Record::reset(episode_id, payload));
        Ok(())
    }

    /// Opens the writer of `channel` and writes the notes, once per channel.
    fn ensure_writer(&self, state: &mut ChannelState, channel: usize) -> Result<()> {
        if state.writer.is_some() {
            return Ok(());
        }
        let dir = match &self.recording_dir {
            Some(dir) => dir,
            None => return Err(RecordingError::Config("recording_dir is not set".to_string())),
        };

        let writer = WriteBackend::open(
            dir,
            &self.instance_id,
            channel,
            self.write_mode,
            &self.writer_config,
        )?;
        debug!("Created writer of channel {}", channel);
        state.writer = Some(writer);
        append(state, channel, Record::notes(self.notes.clone()));
        Ok(())
    }

    fn for_each_writer<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut WriteBackend) -> Result<()>,
    {
        let mut first_err = None;
        for m in self.channels.iter() {
            let mut state = lock(m);
            if let Some(writer) = state.writer.as_mut() {
                if let Err(e) = f(writer) {
                    warn!("{}", e);
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn append(state: &mut ChannelState, channel: usize, record: Record) {
    if let Some(writer) = state.writer.as_mut() {
        if let Err(e) = writer.append(record) {
            warn!("Failed to record on channel {}: {}", channel, e);
        }
    }
}

/// Builds the payload of the notes record.
fn notes(metadata: &EnvMetadata, annotations: &Map<String, Value>) -> Payload {
    let mut env_metadata = metadata.extra.clone();
    env_metadata.insert(
        "semantics.autoreset".to_string(),
        Value::Bool(metadata.semantics_autoreset),
    );
    env_metadata.insert(
        "semantics.async".to_string(),
        Value::Bool(metadata.semantics_async),
    );

    let mut notes = Payload::empty();
    notes.insert("env_id", metadata.id.as_str());
    notes.insert("env_metadata", Value::Object(env_metadata));
    notes.insert("env_spec_tags", Value::Object(metadata.tags.clone()));
    notes.insert("env_semantics_async", metadata.semantics_async);
    notes.insert("env_semantics_autoreset", metadata.semantics_autoreset);
    for (k, v) in annotations.iter() {
        notes.insert(k.clone(), v.clone());
    }
    notes
}
