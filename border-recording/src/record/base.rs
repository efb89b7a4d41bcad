//! Records handed to a writer.
use super::RecordValue;
use chrono::prelude::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{BTreeMap, IntoIter, Iter, Keys};

/// Kind of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// One-time metadata, the first record of a log.
    Notes,

    /// Start of an episode.
    Reset,

    /// A transition within an episode.
    Step,
}

/// Named values carried by a [`Record`].
///
/// Keys are kept sorted so that the same payload always serializes to the same line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(BTreeMap<String, RecordValue>);

impl Payload {
    /// Creates an empty payload.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Creates a payload from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair, replacing any previous value of the key.
    pub fn insert(&mut self, k: impl Into<String>, v: impl Into<RecordValue>) {
        self.0.insert(k.into(), v.into());
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Returns an iterator over the key-value pairs.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the payload has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges another payload into this one in place.
    ///
    /// Values in `other` overwrite values of the same key.
    pub fn merge_inplace(&mut self, other: Payload) {
        self.0.extend(other.0);
    }
}

impl IntoIterator for Payload {
    type Item = (String, RecordValue);
    type IntoIter = IntoIter<String, RecordValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The atomic unit appended to a channel's log.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Kind of the record.
    pub kind: RecordKind,

    /// Episode index, `None` for [`RecordKind::Notes`].
    pub episode_id: Option<usize>,

    /// Step index, only for [`RecordKind::Step`].
    pub step_id: Option<usize>,

    /// Creation time.
    pub timestamp: DateTime<Local>,

    /// Named values.
    pub payload: Payload,
}

impl Record {
    /// Creates a notes record.
    pub fn notes(payload: Payload) -> Self {
        Self {
            kind: RecordKind::Notes,
            episode_id: None,
            step_id: None,
            timestamp: Local::now(),
            payload,
        }
    }

    /// Creates a reset record starting episode `episode_id`.
    pub fn reset(episode_id: usize, payload: Payload) -> Self {
        Self {
            kind: RecordKind::Reset,
            episode_id: Some(episode_id),
            step_id: None,
            timestamp: Local::now(),
            payload,
        }
    }

    /// Creates a step record.
    pub fn step(episode_id: usize, step_id: usize, payload: Payload) -> Self {
        Self {
            kind: RecordKind::Step,
            episode_id: Some(episode_id),
            step_id: Some(step_id),
            timestamp: Local::now(),
            payload,
        }
    }
}
