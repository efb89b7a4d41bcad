//! Sequential reader of a channel's log.
use crate::{
    error::{RecordingError, Result},
    record::{BinaryRef, Dtype, WireRecord},
    writer::{bin_path, log_path},
};
use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

/// Reads back the records written for a channel.
pub struct LogReader {
    log_path: PathBuf,
    bin_path: PathBuf,
}

impl LogReader {
    /// Reader of `channel` of the recording session `instance_id` in `dir`.
    pub fn open(dir: impl AsRef<Path>, instance_id: &str, channel: usize) -> Self {
        Self::from_paths(
            log_path(&dir, instance_id, channel),
            bin_path(&dir, instance_id, channel),
        )
    }

    /// Reader of the given pair of files.
    pub fn from_paths(log_path: impl Into<PathBuf>, bin_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            bin_path: bin_path.into(),
        }
    }

    /// Parses every line of the structured log.
    pub fn records(&self) -> Result<Vec<WireRecord>> {
        let rdr = BufReader::new(File::open(&self.log_path)?);
        let mut records = vec![];
        for (i, line) in rdr.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                RecordingError::serialization(format!("line {}", i + 1), e.to_string())
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Reads the bytes referenced by `bref`.
    ///
    /// Fails if the range is not within the binary file.
    pub fn read_blob(&self, bref: &BinaryRef) -> Result<Vec<u8>> {
        let mut file = File::open(&self.bin_path)?;
        let len = file.metadata()?.len();
        match bref.offset.checked_add(bref.length) {
            Some(end) if end <= len => {}
            _ => {
                return Err(RecordingError::serialization(
                    "binary_refs",
                    format!(
                        "range {}+{} exceeds the binary file of {} bytes",
                        bref.offset, bref.length, len
                    ),
                ))
            }
        }
        file.seek(SeekFrom::Start(bref.offset))?;
        let mut buf = vec![0u8; bref.length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads an offloaded `f32` array.
    pub fn read_f32(&self, bref: &BinaryRef) -> Result<Vec<f32>> {
        if bref.dtype != Dtype::F32 {
            return Err(RecordingError::serialization(
                "dtype",
                format!("expected f32, found {:?}", bref.dtype),
            ));
        }
        let bytes = self.read_blob(bref)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}
