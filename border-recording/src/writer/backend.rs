use super::{LogSink, WriteMode, WriterConfig};
use crate::{
    error::{RecordingError, Result},
    record::Record,
    util::lock,
};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, warn};
use std::{
    io,
    path::Path,
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};

/// Messages the background worker receives.
enum WriterMessage {
    /// Write a record.
    Append(Record),

    /// Flush the files, then notify the sender.
    Flush(Sender<()>),
}

/// First write error of the worker, taken by the next flush or close.
type ErrorSlot = Arc<Mutex<Option<RecordingError>>>;

enum Inner {
    Sync(LogSink),
    Async {
        sender: Sender<WriterMessage>,
        handle: JoinHandle<LogSink>,
        error: ErrorSlot,
    },
    Closed,
}

/// Ordered, append-only writer of one channel's log.
///
/// In [`WriteMode::Sync`], [`append`](Self::append) returns after the record has been
/// written and flushed. In [`WriteMode::Async`], records are sent through a FIFO queue
/// to a dedicated thread, so they are written in the order they were appended.
///
/// A record that cannot be serialized is dropped with a warning; the stream continues.
pub struct WriteBackend {
    channel: usize,
    mode: WriteMode,
    inner: Inner,
}

impl WriteBackend {
    /// Opens the log files of `channel` in `dir`.
    pub fn open(
        dir: impl AsRef<Path>,
        instance_id: &str,
        channel: usize,
        mode: WriteMode,
        config: &WriterConfig,
    ) -> Result<Self> {
        let sink = LogSink::open(dir, instance_id, channel, config)?;
        Self::with_sink(channel, mode, sink, config.queue_capacity)
    }

    /// Builds a writer on an existing sink.
    ///
    /// `queue_capacity` bounds the queue in [`WriteMode::Async`] and is ignored otherwise.
    pub fn with_sink(
        channel: usize,
        mode: WriteMode,
        sink: LogSink,
        queue_capacity: Option<usize>,
    ) -> Result<Self> {
        let inner = match mode {
            WriteMode::Sync => Inner::Sync(sink),
            WriteMode::Async => {
                let (sender, receiver) = match queue_capacity {
                    Some(n) => bounded(n),
                    None => unbounded(),
                };
                let error = ErrorSlot::default();
                let error_ = error.clone();
                let handle = thread::Builder::new()
                    .name(format!("recording-writer-{}", channel))
                    .spawn(move || run_worker(channel, sink, receiver, error_))?;
                Inner::Async {
                    sender,
                    handle,
                    error,
                }
            }
        };
        debug!("Opened {:?} writer for channel {}", mode, channel);

        Ok(Self {
            channel,
            mode,
            inner,
        })
    }

    /// Appends a record.
    ///
    /// Returns an error if the writer has been closed or, in [`WriteMode::Sync`], if the
    /// files could not be written.
    pub fn append(&mut self, record: Record) -> Result<()> {
        let channel = self.channel;
        match &mut self.inner {
            Inner::Sync(sink) => match sink.write(&record).and_then(|_| sink.flush()) {
                Err(e) if e.is_recoverable() => {
                    warn!("Dropped a record on channel {}: {}", channel, e);
                    Ok(())
                }
                r => r,
            },
            Inner::Async { sender, .. } => sender
                .send(WriterMessage::Append(record))
                .map_err(|_| RecordingError::WriterClosed(channel)),
            Inner::Closed => Err(RecordingError::WriterClosed(channel)),
        }
    }

    /// Flushes the files.
    ///
    /// In [`WriteMode::Async`], this waits until every record appended before the call
    /// has been written, and returns the first error the worker hit since the last
    /// flush, if any.
    pub fn flush(&mut self) -> Result<()> {
        let channel = self.channel;
        match &mut self.inner {
            Inner::Sync(sink) => sink.flush(),
            Inner::Async { sender, error, .. } => {
                let (ack_s, ack_r) = bounded(1);
                if sender.send(WriterMessage::Flush(ack_s)).is_err() || ack_r.recv().is_err() {
                    return Err(worker_terminated(channel));
                }
                match lock(error).take() {
                    Some(e) => Err(async_write(channel, e)),
                    None => Ok(()),
                }
            }
            Inner::Closed => Ok(()),
        }
    }

    /// Drains pending records and releases the files.
    ///
    /// Calling this method more than once is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.inner, Inner::Closed) {
            Inner::Closed => Ok(()),
            Inner::Sync(mut sink) => sink.flush(),
            Inner::Async {
                sender,
                handle,
                error,
            } => {
                // The worker exits once the queue is empty and the sender is gone.
                drop(sender);
                let channel = self.channel;
                let mut sink = handle.join().map_err(|_| worker_terminated(channel))?;
                let flushed = sink.flush();
                match lock(&error).take() {
                    Some(e) => Err(async_write(channel, e)),
                    None => flushed,
                }
            }
        }
    }

    /// Channel of this writer.
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Write mode chosen at construction.
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Returns `true` after [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        matches!(self.inner, Inner::Closed)
    }
}

impl Drop for WriteBackend {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close writer of channel {}: {}", self.channel, e);
        }
    }
}

fn async_write(channel: usize, e: RecordingError) -> RecordingError {
    RecordingError::AsyncWrite {
        channel,
        source: Box::new(e),
    }
}

fn worker_terminated(channel: usize) -> RecordingError {
    async_write(
        channel,
        io::Error::new(io::ErrorKind::Other, "writer thread terminated").into(),
    )
}

fn run_worker(
    channel: usize,
    mut sink: LogSink,
    receiver: Receiver<WriterMessage>,
    error: ErrorSlot,
) -> LogSink {
    // Ends after the sender is dropped and the queue is drained.
    for msg in receiver.iter() {
        match msg {
            WriterMessage::Append(record) => {
                let mut r = sink.write(&record);
                if r.is_ok() && receiver.is_empty() {
                    r = sink.flush();
                }
                if let Err(e) = r {
                    report(channel, e, &error);
                }
            }
            WriterMessage::Flush(ack) => {
                if let Err(e) = sink.flush() {
                    report(channel, e, &error);
                }
                let _ = ack.send(());
            }
        }
    }
    sink
}

fn report(channel: usize, e: RecordingError, error: &ErrorSlot) {
    if e.is_recoverable() {
        warn!("Dropped a record on channel {}: {}", channel, e);
        return;
    }

    let mut slot = lock(error);
    warn!("Write failed on channel {}: {}", channel, e);
    if slot.is_none() {
        *slot = Some(e);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        record::{Payload, RecordValue, WireRecord},
        writer::SinkFile,
    };
    use std::io::Write;
    use test_log::test;

    /// In-memory file shared with the test.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SinkFile for SharedBuf {}

    /// A file on a full disk.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SinkFile for FullDisk {}

    fn memory_backend(mode: WriteMode) -> (WriteBackend, SharedBuf, SharedBuf) {
        let (log, bin) = (SharedBuf::default(), SharedBuf::default());
        let config = WriterConfig::default().inline_threshold(8);
        let sink = LogSink::new(Box::new(log.clone()), Box::new(bin.clone()), 0, &config);
        let backend = WriteBackend::with_sink(0, mode, sink, None).unwrap();
        (backend, log, bin)
    }

    fn lines(buf: &SharedBuf) -> Vec<WireRecord> {
        let data = buf.0.lock().unwrap().clone();
        String::from_utf8(data)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn step(step_id: usize) -> Record {
        let mut payload = Payload::empty();
        payload.insert("reward", step_id as f32);
        payload.insert("observation", vec![step_id as f32; 4]);
        Record::step(0, step_id, payload)
    }

    #[test]
    fn test_order_is_preserved_in_both_modes() {
        for mode in &[WriteMode::Sync, WriteMode::Async] {
            let (mut backend, log, bin) = memory_backend(*mode);
            for i in 0..50 {
                backend.append(step(i)).unwrap();
            }
            backend.close().unwrap();

            let records = lines(&log);
            let ids: Vec<_> = records.iter().map(|r| r.step_id.unwrap()).collect();
            assert_eq!(ids, (0..50).collect::<Vec<_>>());

            // Blobs are contiguous and in the same order as the lines.
            for (i, r) in records.iter().enumerate() {
                let bref = &r.binary_refs["observation"];
                assert_eq!(bref.offset, 16 * i as u64);
                assert_eq!(bref.length, 16);
            }
            assert_eq!(bin.0.lock().unwrap().len(), 16 * 50);
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut backend, log, _bin) = memory_backend(WriteMode::Async);
        backend.append(step(0)).unwrap();
        backend.close().unwrap();
        let len = log.0.lock().unwrap().len();

        backend.close().unwrap();
        assert!(backend.is_closed());
        assert_eq!(log.0.lock().unwrap().len(), len);
        assert!(matches!(
            backend.append(step(1)),
            Err(RecordingError::WriterClosed(0))
        ));
    }

    #[test]
    fn test_unserializable_record_is_dropped() {
        for mode in &[WriteMode::Sync, WriteMode::Async] {
            let (mut backend, log, _bin) = memory_backend(*mode);
            backend.append(step(0)).unwrap();
            let mut payload = Payload::empty();
            payload.insert("reward", RecordValue::Scalar(f32::INFINITY));
            backend.append(Record::step(0, 1, payload)).unwrap();
            backend.append(step(2)).unwrap();
            backend.close().unwrap();

            let ids: Vec<_> = lines(&log).iter().map(|r| r.step_id.unwrap()).collect();
            assert_eq!(ids, vec![0, 2]);
        }
    }

    #[test]
    fn test_sync_write_error_is_returned() {
        let config = WriterConfig::default();
        let sink = LogSink::new(Box::new(FullDisk), Box::new(FullDisk), 0, &config);
        let mut backend = WriteBackend::with_sink(0, WriteMode::Sync, sink, None).unwrap();
        assert!(matches!(
            backend.append(step(0)),
            Err(RecordingError::Io(_))
        ));
    }

    #[test]
    fn test_async_write_error_is_surfaced_on_flush() {
        let config = WriterConfig::default();
        let sink = LogSink::new(Box::new(FullDisk), Box::new(FullDisk), 0, &config);
        let mut backend = WriteBackend::with_sink(3, WriteMode::Async, sink, Some(4)).unwrap();

        // Appending never fails while the worker is alive.
        for i in 0..10 {
            backend.append(step(i)).unwrap();
        }
        match backend.flush() {
            Err(RecordingError::AsyncWrite { channel, .. }) => assert_eq!(channel, 3),
            r => panic!("unexpected result: {:?}", r),
        }

        // The error has been reported once; closing flushes again and fails again.
        assert!(backend.close().is_err());
        assert!(backend.close().is_ok());
    }
}
