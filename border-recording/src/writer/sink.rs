//! Files of a channel's log.
use super::{bin_path, log_path, WriterConfig};
use crate::{
    error::Result,
    record::{encode, Record},
};
use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

/// A byte sink the log can be written to.
///
/// Implemented for [`File`]; other implementations can be injected with
/// [`LogSink::new`], e.g., in-memory buffers or failing writers in tests.
pub trait SinkFile: Write + Send {
    /// Makes written data durable.
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SinkFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// The structured log and the companion binary file of a channel.
pub struct LogSink {
    log: BufWriter<Box<dyn SinkFile>>,

    /// Unbuffered, so that `bin_offset` only counts bytes the file has accepted.
    bin: Box<dyn SinkFile>,

    /// Current length of the binary file.
    bin_offset: u64,

    inline_threshold: usize,
    sync_data: bool,
}

impl LogSink {
    /// Opens, in append mode, the files of `channel` in `dir`.
    pub fn open(
        dir: impl AsRef<Path>,
        instance_id: &str,
        channel: usize,
        config: &WriterConfig,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let open = |path: PathBuf| OpenOptions::new().create(true).append(true).open(path);
        let log = open(log_path(dir, instance_id, channel))?;
        let bin = open(bin_path(dir, instance_id, channel))?;
        let bin_offset = bin.metadata()?.len();

        Ok(Self::new(Box::new(log), Box::new(bin), bin_offset, config))
    }

    /// Builds a sink on arbitrary byte sinks.
    ///
    /// `bin_offset` is the number of bytes already in `bin`.
    pub fn new(
        log: Box<dyn SinkFile>,
        bin: Box<dyn SinkFile>,
        bin_offset: u64,
        config: &WriterConfig,
    ) -> Self {
        Self {
            log: BufWriter::new(log),
            bin,
            bin_offset,
            inline_threshold: config.inline_threshold,
            sync_data: config.sync_data,
        }
    }

    /// Writes a record.
    ///
    /// Offloaded values are written to the binary file before the line referencing
    /// them is written to the log. A record that cannot be encoded writes nothing.
    ///
    /// If the binary file fails, the line is not written. Bytes of the record that
    /// already reached the binary file stay there unreferenced, and the next record
    /// is placed after them.
    pub fn write(&mut self, record: &Record) -> Result<()> {
        let enc = encode(record, self.bin_offset, self.inline_threshold)?;

        if !enc.blobs.is_empty() {
            let start = self.bin_offset;
            for blob in enc.blobs.iter() {
                self.write_blob(blob)?;
            }
            self.bin.flush()?;
            debug_assert_eq!(self.bin_offset, start + enc.blob_len());
        }

        self.log.write_all(enc.line.as_bytes())?;
        self.log.write_all(b"\n")?;
        Ok(())
    }

    fn write_blob(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.bin.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write to the binary file",
                    ))
                }
                Ok(n) => {
                    self.bin_offset += n as u64;
                    buf = &buf[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Flushes buffered data of both files.
    pub fn flush(&mut self) -> Result<()> {
        self.bin.flush()?;
        self.log.flush()?;
        if self.sync_data {
            self.bin.sync()?;
            self.log.get_mut().sync()?;
        }
        Ok(())
    }

    /// Current length of the binary file.
    pub fn bin_offset(&self) -> u64 {
        self.bin_offset
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::{Payload, RecordValue};
    use std::sync::{Arc, Mutex};

    /// A file that accepts `quota` bytes, fails once, then accepts everything.
    #[derive(Clone)]
    struct Flaky {
        data: Arc<Mutex<Vec<u8>>>,
        quota: Arc<Mutex<Option<usize>>>,
    }

    impl Flaky {
        fn new(quota: usize) -> Self {
            Self {
                data: Arc::new(Mutex::new(vec![])),
                quota: Arc::new(Mutex::new(Some(quota))),
            }
        }
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut quota = self.quota.lock().unwrap();
            let n = match *quota {
                Some(0) => {
                    *quota = None;
                    return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
                }
                Some(q) => {
                    let n = q.min(buf.len());
                    *quota = Some(q - n);
                    n
                }
                None => buf.len(),
            };
            self.data.lock().unwrap().extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SinkFile for Flaky {}

    impl SinkFile for Vec<u8> {}

    fn reset(v: u8) -> Record {
        Record::reset(
            0,
            Payload::from_slice(&[("observation", RecordValue::Bytes(vec![v; 64]))]),
        )
    }

    #[test]
    fn test_offset_counts_partially_written_blob() {
        let bin = Flaky::new(10);
        let config = WriterConfig::default().inline_threshold(16);
        let mut sink = LogSink::new(Box::new(Vec::<u8>::new()), Box::new(bin.clone()), 0, &config);

        assert!(sink.write(&reset(1)).is_err());
        assert_eq!(sink.bin_offset(), 10);

        sink.write(&reset(2)).unwrap();
        assert_eq!(sink.bin_offset(), 74);
        let data = bin.data.lock().unwrap();
        assert_eq!(data.len(), 74);
        assert_eq!(&data[10..], &[2u8; 64][..]);
    }
}
