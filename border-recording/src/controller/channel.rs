use crate::writer::WriteBackend;

/// Recording state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    /// No reset has been observed yet.
    Idle,

    /// The current episode is not recorded.
    Inactive,

    /// The current episode is recorded.
    Active,

    /// The episode has ended; a reset is expected before the next step.
    AwaitingReset,
}

/// Counters and writer of a channel.
pub(super) struct ChannelState {
    pub phase: ChannelPhase,
    pub next_episode_id: usize,
    pub episode_id: usize,
    pub step_id: usize,

    /// Created on the first recorded episode and kept until the controller is dropped.
    pub writer: Option<WriteBackend>,

    /// Set once a step without a reset has been reported for the current episode.
    pub warned: bool,
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            phase: ChannelPhase::Idle,
            next_episode_id: 0,
            episode_id: 0,
            step_id: 0,
            writer: None,
            warned: false,
        }
    }

    /// Allocates the index of the next episode and resets the step counter.
    pub fn begin_episode(&mut self, selected: bool) -> usize {
        self.episode_id = self.next_episode_id;
        self.next_episode_id += 1;
        self.step_id = 0;
        self.warned = false;
        self.phase = if selected {
            ChannelPhase::Active
        } else {
            ChannelPhase::Inactive
        };
        self.episode_id
    }

    /// Returns the index of the current step and advances the counter.
    pub fn next_step_id(&mut self) -> usize {
        let step_id = self.step_id;
        self.step_id += 1;
        step_id
    }
}
