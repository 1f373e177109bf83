//! Producer/consumer hand-off for engine events
//!
//! A reader thread decodes the event log and pushes [`EngineUpdate`]s into
//! a bounded crossbeam channel. The single consumer drains the channel
//! without blocking and applies each update in order. When the producer
//! stops (end of input, a terminal event while following, or
//! cancellation) it drops its sender, which the consumer observes as the
//! stream being closed.

use crate::engine::{DecodeStats, EngineUpdate, EventDecoder};
use crate::error::Result;
use crossbeam_channel::{
    Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError, bounded,
};
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Default bounded channel capacity
pub const CHANNEL_CAPACITY: usize = 1024;

/// How long a blocked producer waits before re-checking cancellation
const SEND_RETRY: Duration = Duration::from_millis(50);

/// Shared cancellation flag
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for [`spawn_reader`]
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Keep polling at end of input until a terminal event arrives
    pub follow: bool,
    /// Sleep between polls at end of input while following
    pub poll_interval: Duration,
    /// Bounded channel capacity
    pub capacity: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            follow: false,
            poll_interval: Duration::from_millis(100),
            capacity: CHANNEL_CAPACITY,
        }
    }
}

/// Updates taken from the channel in one drain
#[derive(Debug, Default)]
pub struct Drained {
    pub updates: Vec<EngineUpdate>,
    /// The producer is gone and nothing is buffered
    pub closed: bool,
}

/// Consumer side of a running reader
///
/// Dropping it cancels the producer.
pub struct EventStream {
    rx: Receiver<EngineUpdate>,
    cancel: CancelToken,
    handle: Option<thread::JoinHandle<Result<DecodeStats>>>,
}

impl EventStream {
    /// Take up to `max` buffered updates without blocking
    pub fn drain(&self, max: usize) -> Drained {
        let mut drained = Drained::default();
        while drained.updates.len() < max {
            match self.rx.try_recv() {
                Ok(update) => drained.updates.push(update),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    drained.closed = true;
                    break;
                }
            }
        }
        drained
    }

    /// Wait up to `timeout` for the first update, then drain like [`drain`]
    ///
    /// [`drain`]: EventStream::drain
    pub fn wait(&self, timeout: Duration, max: usize) -> Drained {
        match self.rx.recv_timeout(timeout) {
            Ok(first) => {
                let mut drained = self.drain(max.saturating_sub(1));
                drained.updates.insert(0, first);
                drained
            }
            Err(RecvTimeoutError::Timeout) => Drained::default(),
            Err(RecvTimeoutError::Disconnected) => Drained {
                updates: Vec::new(),
                closed: true,
            },
        }
    }

    /// Ask the producer to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the producer and wait for it
    ///
    /// Returns the producer's decode counters, or the read error that
    /// stopped it.
    pub fn join(mut self) -> Result<DecodeStats> {
        self.cancel.cancel();
        // Unblock a producer waiting on a full channel.
        while self.rx.try_recv().is_ok() {}
        match self.handle.take().map(thread::JoinHandle::join) {
            Some(Ok(result)) => result,
            Some(Err(_)) => Err(std::io::Error::other("event reader thread panicked").into()),
            None => Ok(DecodeStats::default()),
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start a reader thread decoding `reader` into a bounded channel
pub fn spawn_reader<R>(reader: R, opts: ReaderOptions, cancel: CancelToken) -> Result<EventStream>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = bounded(opts.capacity.max(1));
    let producer_cancel = cancel.clone();

    let handle = thread::Builder::new()
        .name("stacktree-reader".to_string())
        .spawn(move || produce(reader, &tx, &opts, &producer_cancel))?;

    Ok(EventStream {
        rx,
        cancel,
        handle: Some(handle),
    })
}

enum Flow {
    Continue,
    Stop,
}

fn produce<R: BufRead>(
    mut reader: R,
    tx: &Sender<EngineUpdate>,
    opts: &ReaderOptions,
    cancel: &CancelToken,
) -> Result<DecodeStats> {
    let mut decoder = EventDecoder::new();
    let mut pending = Vec::new();

    while !cancel.is_cancelled() {
        let read = reader.read_until(b'\n', &mut pending)?;

        if read == 0 {
            if opts.follow {
                thread::sleep(opts.poll_interval);
                continue;
            }
            break;
        }

        // A partial line while following is completed by a later read.
        if opts.follow && !pending.ends_with(b"\n") {
            continue;
        }

        let flow = forward(&mut decoder, &pending, tx, opts, cancel);
        pending.clear();
        if matches!(flow, Flow::Stop) {
            break;
        }
    }

    let stats = decoder.stats();
    log::debug!(
        "Event reader finished: {} lines, {} updates, {} malformed",
        stats.lines,
        stats.decoded,
        stats.malformed
    );
    Ok(stats)
}

fn forward(
    decoder: &mut EventDecoder,
    line: &[u8],
    tx: &Sender<EngineUpdate>,
    opts: &ReaderOptions,
    cancel: &CancelToken,
) -> Flow {
    let Some(update) = decoder.decode_bytes(line) else {
        return Flow::Continue;
    };
    let terminal = update.is_terminal();

    let mut update = update;
    loop {
        match tx.send_timeout(update, SEND_RETRY) {
            Ok(()) => break,
            Err(SendTimeoutError::Timeout(back)) => {
                if cancel.is_cancelled() {
                    return Flow::Stop;
                }
                update = back;
            }
            Err(SendTimeoutError::Disconnected(_)) => return Flow::Stop,
        }
    }

    if terminal && opts.follow {
        Flow::Stop
    } else {
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{BufReader, Write};
    use std::time::Instant;

    const PRELUDE: &str = r#"{"preludeEvent":{"config":{}}}"#;
    const STEP: &str =
        r#"{"resourcePreEvent":{"metadata":{"op":"create","urn":"urn:pulumi:dev::p::t::a"}}}"#;
    const SUMMARY: &str = r#"{"summaryEvent":{"durationSeconds":1,"resourceChanges":{}}}"#;

    /// Drain until the stream closes or the deadline passes
    fn collect(stream: &EventStream, deadline: Duration) -> (Vec<EngineUpdate>, bool) {
        let start = Instant::now();
        let mut updates = Vec::new();
        while start.elapsed() < deadline {
            let drained = stream.wait(Duration::from_millis(20), 64);
            updates.extend(drained.updates);
            if drained.closed {
                return (updates, true);
            }
        }
        (updates, false)
    }

    fn following() -> ReaderOptions {
        ReaderOptions {
            follow: true,
            poll_interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    #[test]
    fn test_reads_to_end_of_input() {
        let log = format!("{PRELUDE}\n{STEP}\nnot json\n{SUMMARY}");
        let stream = spawn_reader(
            std::io::Cursor::new(log.into_bytes()),
            ReaderOptions::default(),
            CancelToken::new(),
        )
        .unwrap();

        let (updates, closed) = collect(&stream, Duration::from_secs(5));
        assert!(closed);
        assert_eq!(updates.len(), 3);
        assert!(matches!(updates[0], EngineUpdate::Prelude(_)));
        assert!(matches!(updates[2], EngineUpdate::Summary(_)));

        let stats = stream.join().unwrap();
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.decoded, 3);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut log = format!("{PRELUDE}\n").into_bytes();
        log.extend_from_slice(b"{\"diagnosticEvent\":{\"message\":\"\xff\"}}\n");
        log.extend_from_slice(format!("{STEP}\n{SUMMARY}\n").as_bytes());
        let stream =
            spawn_reader(std::io::Cursor::new(log), ReaderOptions::default(), CancelToken::new())
                .unwrap();

        let (updates, closed) = collect(&stream, Duration::from_secs(5));
        assert!(closed);
        assert_eq!(updates.len(), 3);
        assert!(updates[2].is_terminal());

        let stats = stream.join().unwrap();
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.decoded, 3);
    }

    #[test]
    fn test_small_channel_preserves_order() {
        let log: String = (0..50)
            .map(|i| {
                format!(
                    "{{\"resourcePreEvent\":{{\"metadata\":{{\"op\":\"create\",\"urn\":\"r{i}\"}}}}}}\n"
                )
            })
            .collect();
        let opts = ReaderOptions {
            capacity: 2,
            ..Default::default()
        };
        let stream = spawn_reader(
            std::io::Cursor::new(log.into_bytes()),
            opts,
            CancelToken::new(),
        )
        .unwrap();

        let (updates, closed) = collect(&stream, Duration::from_secs(5));
        assert!(closed);
        let urns: Vec<String> = updates
            .into_iter()
            .filter_map(|u| match u {
                EngineUpdate::Resource(event) => Some(event.urn),
                _ => None,
            })
            .collect();
        let expected: Vec<String> = (0..50).map(|i| format!("r{i}")).collect();
        assert_eq!(urns, expected);
    }

    #[test]
    fn test_follow_until_summary() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{PRELUDE}").unwrap();
        // half a line: the reader must wait for the rest
        write!(file, "{}", &STEP[..20]).unwrap();
        file.flush().unwrap();

        let reader = BufReader::new(File::open(file.path()).unwrap());
        let stream = spawn_reader(reader, following(), CancelToken::new()).unwrap();

        let (first, closed) = collect(&stream, Duration::from_millis(200));
        assert!(!closed);
        assert_eq!(first.len(), 1);

        writeln!(file, "{}", &STEP[20..]).unwrap();
        writeln!(file, "{SUMMARY}").unwrap();
        writeln!(file, "{STEP}").unwrap();
        file.flush().unwrap();

        let (rest, closed) = collect(&stream, Duration::from_secs(5));
        assert!(closed);
        // nothing after the summary is forwarded
        assert_eq!(rest.len(), 2);
        assert!(matches!(rest[0], EngineUpdate::Resource(_)));
        assert!(rest[1].is_terminal());
    }

    #[test]
    fn test_cancel_stops_follower() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{PRELUDE}").unwrap();
        file.flush().unwrap();

        let cancel = CancelToken::new();
        let reader = BufReader::new(File::open(file.path()).unwrap());
        let stream = spawn_reader(reader, following(), cancel.clone()).unwrap();

        let (updates, _) = collect(&stream, Duration::from_millis(100));
        assert_eq!(updates.len(), 1);

        cancel.cancel();
        let (_, closed) = collect(&stream, Duration::from_secs(5));
        assert!(closed);
        assert_eq!(stream.join().unwrap().decoded, 1);
    }

    /// Reader that flags when the producer thread lets go of it
    struct Tracked {
        inner: std::io::Cursor<Vec<u8>>,
        released: Arc<AtomicBool>,
    }

    impl std::io::Read for Tracked {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            std::io::Read::read(&mut self.inner, buf)
        }
    }

    impl BufRead for Tracked {
        fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
            self.inner.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.inner.consume(amt);
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_dropping_stream_stops_follower() {
        let released = Arc::new(AtomicBool::new(false));
        let reader = Tracked {
            inner: std::io::Cursor::new(format!("{PRELUDE}\n").into_bytes()),
            released: Arc::clone(&released),
        };
        let stream = spawn_reader(reader, following(), CancelToken::new()).unwrap();
        let (updates, closed) = collect(&stream, Duration::from_millis(100));
        assert_eq!(updates.len(), 1);
        assert!(!closed);

        drop(stream);
        let start = Instant::now();
        while !released.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drain_respects_max() {
        let log = format!("{STEP}\n{STEP}\n{STEP}\n");
        let stream = spawn_reader(
            std::io::Cursor::new(log.into_bytes()),
            ReaderOptions::default(),
            CancelToken::new(),
        )
        .unwrap();

        // give the producer time to fill the channel
        let start = Instant::now();
        while stream.rx.len() < 3 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        let drained = stream.drain(2);
        assert_eq!(drained.updates.len(), 2);
        let rest = stream.drain(10);
        assert_eq!(rest.updates.len(), 1);
    }
}
