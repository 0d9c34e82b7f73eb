//! Bounded queue plus the single background writer thread.
//!
//! Producers pay formatting cost on their own thread and hand the finished
//! entry to the queue. One dedicated worker performs every console write,
//! which gives strict FIFO ordering with no interleaving. A full queue
//! blocks the producer (explicit backpressure); a closed queue falls back to
//! a synchronous write on the calling thread so no record is ever dropped
//! silently.

use crate::ansi;
use crate::console::Console;
use crate::formatter::{EntryPayload, FormattedEntry};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc as completion;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// How long shutdown waits for the worker to finish draining. A console
/// wedged on blocking terminal input must not hang process exit forever.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(1500);

/// After this many consecutive write failures the queue closes instead of
/// spinning against a broken console.
const MAX_CONSECUTIVE_WRITE_FAILURES: u32 = 5;

/// Error type returned when the processor cannot be constructed.
#[derive(thiserror::Error, Debug)]
pub enum ProcessorBuildError {
    #[error("failed to spawn console log worker thread: {0}")]
    Spawn(#[from] io::Error),
}

struct WorkerHandle {
    thread: thread::JoinHandle<()>,
    done: completion::Receiver<()>,
}

/// Decouples application threads from console I/O.
///
/// State machine: Running (accepting + draining) → Draining (closed to new
/// entries, worker flushing the backlog) → Stopped. Dropping the processor
/// runs the same bounded shutdown as [`shutdown`](Self::shutdown).
pub struct AsyncLogProcessor {
    sender: RwLock<Option<mpsc::Sender<FormattedEntry>>>,
    out: Arc<dyn Console>,
    err: Arc<dyn Console>,
    /// Flatten span payloads into one pre-escaped string before queueing.
    /// Set when the selected console is an ANSI passthrough; decided once
    /// at construction.
    flatten_spans: bool,
    closed: Arc<AtomicBool>,
    worker: Mutex<Option<WorkerHandle>>,
    /// Entries accepted into the queue.
    pub enqueued: AtomicU64,
    /// Entries written synchronously because the queue was closed or closing
    /// raced the enqueue.
    pub fallback_writes: AtomicU64,
    /// Single-entry write failures observed so far.
    pub write_failures: Arc<AtomicU64>,
}

impl AsyncLogProcessor {
    /// Spawn the worker thread and start accepting entries.
    ///
    /// **Parameters**
    /// - `out` / `err`: consoles for standard output and the error stream.
    /// - `capacity`: bounded queue size; a minimum of 1 is enforced.
    /// - `flatten_spans`: bridge span payloads to inline ANSI at enqueue
    ///   time (passthrough consoles want one pre-escaped string).
    pub fn new(
        out: Arc<dyn Console>,
        err: Arc<dyn Console>,
        capacity: usize,
        flatten_spans: bool,
    ) -> Result<Self, ProcessorBuildError> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (done_tx, done_rx) = completion::channel();
        let closed = Arc::new(AtomicBool::new(false));
        let write_failures = Arc::new(AtomicU64::new(0));

        let worker_out = Arc::clone(&out);
        let worker_err = Arc::clone(&err);
        let worker_closed = Arc::clone(&closed);
        let worker_failures = Arc::clone(&write_failures);
        let thread = thread::Builder::new()
            .name("console-log-queue".to_string())
            .spawn(move || {
                drain(rx, worker_out, worker_err, worker_closed, worker_failures);
                let _ = done_tx.send(());
            })?;

        Ok(AsyncLogProcessor {
            sender: RwLock::new(Some(tx)),
            out,
            err,
            flatten_spans,
            closed,
            worker: Mutex::new(Some(WorkerHandle { thread, done: done_rx })),
            enqueued: AtomicU64::new(0),
            fallback_writes: AtomicU64::new(0),
            write_failures,
        })
    }

    /// Hand one formatted entry to the background writer.
    ///
    /// In Running state this is a capacity-respecting add: a full queue
    /// blocks the caller until the worker frees a slot. When the queue is
    /// closed, closing races the add, or the caller sits on a tokio runtime
    /// thread that must not block, the entry is written synchronously on the
    /// calling thread instead; a record is never dropped here.
    pub fn enqueue(&self, entry: FormattedEntry) {
        let entry = if self.flatten_spans { flatten(entry) } else { entry };

        if self.closed.load(Ordering::Acquire) {
            self.write_sync(entry);
            return;
        }
        let sender = self.sender.read().expect("sender lock poisoned").clone();
        let Some(sender) = sender else {
            self.write_sync(entry);
            return;
        };
        match sender.try_send(entry) {
            Ok(()) => {
                self.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(entry)) => {
                // `blocking_send` panics on a runtime thread; those callers
                // skip the backpressure wait and write in place.
                if tokio::runtime::Handle::try_current().is_ok() {
                    self.write_sync(entry);
                    return;
                }
                match sender.blocking_send(entry) {
                    Ok(()) => {
                        self.enqueued.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(send_error) => self.write_sync(send_error.0),
                }
            }
            Err(TrySendError::Closed(entry)) => self.write_sync(entry),
        }
    }

    fn write_sync(&self, entry: FormattedEntry) {
        self.fallback_writes.fetch_add(1, Ordering::Relaxed);
        let console = if entry.use_stderr { &self.err } else { &self.out };
        if let Err(error) = write_entry(console.as_ref(), &entry) {
            eprintln!("console log write failed: {error}");
        }
    }

    /// Close the queue, drain what is already buffered, and join the worker
    /// with a bounded timeout.
    ///
    /// A timeout means the console is wedged; it is reported and tolerated,
    /// not escalated: remaining entries may not flush before exit.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let sender = self.sender.write().expect("sender lock poisoned").take();
        drop(sender);

        let worker = self.worker.lock().expect("worker lock poisoned").take();
        if let Some(worker) = worker {
            match worker.done.recv_timeout(SHUTDOWN_TIMEOUT) {
                Ok(()) => {
                    let _ = worker.thread.join();
                }
                Err(_) => {
                    eprintln!(
                        "console log queue did not drain within {SHUTDOWN_TIMEOUT:?}; remaining entries may be lost"
                    );
                }
            }
        }
    }
}

impl Drop for AsyncLogProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop: strict FIFO, one entry at a time, single writer.
///
/// A failed write never stops the drain; a run of consecutive failures
/// closes the queue so producers stop feeding a broken console.
fn drain(
    mut rx: mpsc::Receiver<FormattedEntry>,
    out: Arc<dyn Console>,
    err: Arc<dyn Console>,
    closed: Arc<AtomicBool>,
    write_failures: Arc<AtomicU64>,
) {
    let mut consecutive_failures = 0u32;
    while let Some(entry) = rx.blocking_recv() {
        let console = if entry.use_stderr { &err } else { &out };
        match write_entry(console.as_ref(), &entry) {
            Ok(()) => consecutive_failures = 0,
            Err(error) => {
                write_failures.fetch_add(1, Ordering::Relaxed);
                consecutive_failures += 1;
                if consecutive_failures == 1 {
                    eprintln!("console log write failed: {error}");
                }
                if consecutive_failures >= MAX_CONSECUTIVE_WRITE_FAILURES {
                    closed.store(true, Ordering::Release);
                    // Unblocks producers waiting on a full queue; anything
                    // already buffered is still drained best-effort.
                    rx.close();
                }
            }
        }
    }
}

fn write_entry(console: &dyn Console, entry: &FormattedEntry) -> io::Result<()> {
    match &entry.payload {
        EntryPayload::Text(text) => console.write(text, None, None)?,
        EntryPayload::Spans(spans) => {
            for span in spans {
                console.write(&span.text, span.background, span.foreground)?;
            }
        }
    }
    console.flush()
}

/// Encode a span payload into one pre-escaped string; the codec runs once
/// per record here, never per character downstream.
fn flatten(entry: FormattedEntry) -> FormattedEntry {
    match entry.payload {
        EntryPayload::Text(_) => entry,
        EntryPayload::Spans(spans) => {
            let mut text = String::with_capacity(spans.iter().map(|s| s.text.len() + 16).sum());
            for span in &spans {
                ansi::write_colored(&mut text, &span.text, span.background, span.foreground);
            }
            FormattedEntry {
                payload: EntryPayload::Text(text),
                use_stderr: entry.use_stderr,
            }
        }
    }
}
