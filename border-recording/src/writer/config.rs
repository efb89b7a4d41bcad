//! Configuration of [`WriteBackend`](super::WriteBackend).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// How a [`WriteBackend`](super::WriteBackend) performs writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// `append` returns after the record has been written.
    Sync,

    /// `append` enqueues the record; a background thread writes it.
    Async,
}

impl WriteMode {
    /// The mode matching the step semantics of an environment.
    pub fn for_env(semantics_async: bool) -> Self {
        if semantics_async {
            Self::Async
        } else {
            Self::Sync
        }
    }
}

/// Configuration of [`WriteBackend`](super::WriteBackend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Array values with more bytes than this are written to the binary file.
    ///
    /// Only array-like values (arrays, images and raw bytes) are offloaded. Scalars,
    /// strings and JSON values are always written inline, whatever their size.
    ///
    /// The default value is 1024.
    pub inline_threshold: usize,

    /// Calls `sync_data` on the files after each synchronous append and on flush.
    ///
    /// The default value is `false`.
    pub sync_data: bool,

    /// Capacity of the queue in the asynchronous mode, unbounded if `None`.
    pub queue_capacity: Option<usize>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            inline_threshold: 1024,
            sync_data: false,
            queue_capacity: None,
        }
    }
}

impl WriterConfig {
    /// Sets the inline threshold in bytes.
    pub fn inline_threshold(mut self, v: usize) -> Self {
        self.inline_threshold = v;
        self
    }

    /// Sets whether file data is synced to disk.
    pub fn sync_data(mut self, v: bool) -> Self {
        self.sync_data = v;
        self
    }

    /// Sets the capacity of the asynchronous queue.
    pub fn queue_capacity(mut self, v: Option<usize>) -> Self {
        self.queue_capacity = v;
        self
    }

    /// Constructs [`WriterConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`WriterConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_writer_config() -> Result<()> {
        let config = WriterConfig::default()
            .inline_threshold(64)
            .sync_data(true)
            .queue_capacity(Some(128));

        let dir = TempDir::new("writer_config")?;
        let path = dir.path().join("writer_config.yaml");

        config.save(&path)?;
        let config_ = WriterConfig::load(&path)?;
        assert_eq!(config, config_);

        Ok(())
    }

    #[test]
    fn test_write_mode_for_env() {
        assert_eq!(WriteMode::for_env(true), WriteMode::Async);
        assert_eq!(WriteMode::for_env(false), WriteMode::Sync);
    }
}
