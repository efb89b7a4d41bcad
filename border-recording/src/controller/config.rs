//! Configuration of [`RecordingController`](super::RecordingController).
use crate::writer::{WriteMode, WriterConfig};
use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Configuration of [`RecordingController`](super::RecordingController).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory of the log files. Recording is disabled if `None`.
    pub recording_dir: Option<PathBuf>,

    /// One of `never`, `always` and `capped_cubic`.
    ///
    /// A boolean is also accepted in YAML; `true` is read as `always` and `false` as
    /// `never`. If `None`, `capped_cubic` is used.
    #[serde(deserialize_with = "deserialize_policy")]
    pub policy: Option<String>,

    /// Annotations merged into the notes record, e.g., hyperparameters.
    pub notes: Map<String, Value>,

    /// Write mode of the writers.
    ///
    /// If `None`, [`WriteMode::Async`] is used for environments with asynchronous
    /// step semantics and [`WriteMode::Sync`] otherwise.
    pub write_mode: Option<WriteMode>,

    /// Configuration of the writers.
    pub writer: WriterConfig,
}

impl RecordingConfig {
    /// Sets the recording directory.
    pub fn recording_dir(mut self, v: impl Into<PathBuf>) -> Self {
        self.recording_dir = Some(v.into());
        self
    }

    /// Sets the recording policy.
    pub fn policy(mut self, v: impl Into<String>) -> Self {
        self.policy = Some(v.into());
        self
    }

    /// Adds an annotation to the notes record.
    pub fn note(mut self, k: impl Into<String>, v: impl Into<Value>) -> Self {
        self.notes.insert(k.into(), v.into());
        self
    }

    /// Sets the write mode.
    pub fn write_mode(mut self, v: WriteMode) -> Self {
        self.write_mode = Some(v);
        self
    }

    /// Sets the configuration of the writers.
    pub fn writer(mut self, v: WriterConfig) -> Self {
        self.writer = v;
        self
    }

    /// Constructs [`RecordingConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`RecordingConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicySelector {
    Flag(bool),
    Name(String),
}

fn deserialize_policy<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let selector = Option::<PolicySelector>::deserialize(deserializer)?;
    Ok(selector.map(|s| match s {
        PolicySelector::Flag(true) => "always".to_string(),
        PolicySelector::Flag(false) => "never".to_string(),
        PolicySelector::Name(name) => name,
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_recording_config() -> Result<()> {
        let config = RecordingConfig::default()
            .recording_dir("/tmp/recordings")
            .policy("always")
            .note("learning_rate", 0.001)
            .note("agent", "dqn")
            .write_mode(WriteMode::Async)
            .writer(WriterConfig::default().inline_threshold(0));

        let dir = TempDir::new("recording_config")?;
        let path = dir.path().join("recording_config.yaml");

        config.save(&path)?;
        let config_ = RecordingConfig::load(&path)?;
        assert_eq!(config, config_);

        Ok(())
    }

    #[test]
    fn test_default_is_disabled() {
        let config: RecordingConfig = serde_yaml::from_str("policy: never\n").unwrap();
        assert_eq!(config.recording_dir, None);
        assert_eq!(config.writer, WriterConfig::default());
    }

    #[test]
    fn test_boolean_policy() {
        let config: RecordingConfig = serde_yaml::from_str("policy: true\n").unwrap();
        assert_eq!(config.policy.as_deref(), Some("always"));
        let config: RecordingConfig = serde_yaml::from_str("policy: false\n").unwrap();
        assert_eq!(config.policy.as_deref(), Some("never"));
        let config: RecordingConfig = serde_yaml::from_str("policy: capped_cubic\n").unwrap();
        assert_eq!(config.policy.as_deref(), Some("capped_cubic"));
        let config: RecordingConfig = serde_yaml::from_str("notes: {}\n").unwrap();
        assert_eq!(config.policy, None);
    }
}
