//! Optional sink for per-board score breakdowns.
//!
//! Sinks are write-only: `record` cannot fail from the caller's point of
//! view and nothing a sink does feeds back into search.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Serialize;

/// The named heuristic factors for one evaluated board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub moves: f64,
    pub river: f64,
    pub adjacency: f64,
    pub openness: f64,
}

impl ScoreBreakdown {
    /// Product of all factors.
    #[inline]
    pub fn total(&self) -> f64 { self.base * self.moves * self.river * self.adjacency * self.openness }
}

pub trait DiagnosticSink: Send + Sync {
    fn record(&self, breakdown: &ScoreBreakdown);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    #[inline]
    fn record(&self, _breakdown: &ScoreBreakdown) {}
}

/// Emits each breakdown as a `trace` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, b: &ScoreBreakdown) {
        tracing::trace!(
            base = b.base,
            moves = b.moves,
            river = b.river,
            adjacency = b.adjacency,
            openness = b.openness,
            total = b.total(),
            "score"
        );
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("could not open diagnostics file: {0}")]
    Io(#[from] io::Error),
}

/// Appends one JSON object per breakdown to a file.
///
/// `record` only enqueues; a dedicated writer thread serializes and
/// writes. Write failures are counted, never surfaced.
pub struct JsonLinesSink {
    to_writer: Option<Sender<Message>>,
    writer: Option<JoinHandle<()>>,
    failures: Arc<AtomicU64>,
}

enum Message {
    Record(ScoreBreakdown),
    Flush(Sender<()>),
}

impl JsonLinesSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let file = File::options().create(true).append(true).open(path)?;
        let failures = Arc::new(AtomicU64::new(0));
        let (to_writer, from_search) = mpsc::channel();
        let writer_failures = failures.clone();
        let writer = thread::Builder::new()
            .name("score-writer".into())
            .spawn(move || write_records(BufWriter::new(file), from_search, &writer_failures))?;
        Ok(JsonLinesSink { to_writer: Some(to_writer), writer: Some(writer), failures })
    }

    /// Number of records that could not be written.
    pub fn failures(&self) -> u64 { self.failures.load(Ordering::Relaxed) }

    /// Wait until everything recorded so far has reached the file.
    pub fn flush(&self) {
        let Some(to_writer) = &self.to_writer else { return };
        let (ack, done) = mpsc::channel();
        if to_writer.send(Message::Flush(ack)).is_err() || done.recv().is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn write_records(mut out: BufWriter<File>, from_search: Receiver<Message>, failures: &AtomicU64) {
    for message in from_search {
        match message {
            Message::Record(breakdown) => {
                let ok = serde_json::to_writer(&mut out, &breakdown).is_ok() && out.write_all(b"\n").is_ok();
                if !ok {
                    failures.fetch_add(1, Ordering::Relaxed);
                }
            }
            Message::Flush(ack) => {
                if out.flush().is_err() {
                    failures.fetch_add(1, Ordering::Relaxed);
                }
                let _ = ack.send(());
            }
        }
    }
    if out.flush().is_err() {
        failures.fetch_add(1, Ordering::Relaxed);
    }
}

impl DiagnosticSink for JsonLinesSink {
    fn record(&self, breakdown: &ScoreBreakdown) {
        let sent = match &self.to_writer {
            Some(to_writer) => to_writer.send(Message::Record(*breakdown)).is_ok(),
            None => false,
        };
        if !sent {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Drop for JsonLinesSink {
    fn drop(&mut self) {
        // closing the channel ends the writer loop after a final flush
        drop(self.to_writer.take());
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}
