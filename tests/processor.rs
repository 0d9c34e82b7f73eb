//! End-to-end queue and provider behavior: ordering, no-loss, backpressure.

use console_log_sink::console::TestConsole;
use console_log_sink::formatter::{EntryPayload, FormattedEntry};
use console_log_sink::options::{ConsoleLoggerOptions, FormatterOptions};
use console_log_sink::processor::AsyncLogProcessor;
use console_log_sink::provider::ConsoleLoggerProvider;
use console_log_sink::record::{LogLevel, LogState};
use std::sync::atomic::Ordering;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

fn text_entry(text: String) -> FormattedEntry {
    FormattedEntry {
        payload: EntryPayload::Text(text),
        use_stderr: false,
    }
}

fn spawn_processor(capacity: usize) -> (Arc<AsyncLogProcessor>, Arc<TestConsole>) {
    let out = Arc::new(TestConsole::new());
    let err = Arc::new(TestConsole::new());
    let processor =
        AsyncLogProcessor::new(out.clone(), err, capacity, false).expect("spawn worker");
    (Arc::new(processor), out)
}

#[test]
fn entries_drain_in_enqueue_order_per_producer() {
    let (processor, out) = spawn_processor(64);
    let producers = 4;
    let per_producer = 200;

    let handles: Vec<_> = (0..producers)
        .map(|p| {
            let processor = processor.clone();
            thread::spawn(move || {
                for i in 0..per_producer {
                    processor.enqueue(text_entry(format!("p{p}:{i}\n")));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    processor.shutdown();

    let writes = out.writes();
    assert_eq!(writes.len(), producers * per_producer);

    // Entries are never interleaved (single writer, one write per entry)
    // and each producer's sequence numbers appear strictly ascending.
    for p in 0..producers {
        let prefix = format!("p{p}:");
        let seen: Vec<usize> = writes
            .iter()
            .filter_map(|w| {
                w.text
                    .strip_prefix(&prefix)
                    .map(|rest| rest.trim_end().parse::<usize>().unwrap())
            })
            .collect();
        assert_eq!(seen, (0..per_producer).collect::<Vec<_>>(), "producer {p}");
    }
}

#[test]
fn all_entries_flush_before_shutdown_completes() {
    let (processor, out) = spawn_processor(16);
    let total = 500;
    for i in 0..total {
        processor.enqueue(text_entry(format!("{i}\n")));
    }
    processor.shutdown();

    assert_eq!(out.writes().len(), total);
    assert_eq!(processor.enqueued.load(Ordering::Relaxed), total as u64);
    assert_eq!(processor.fallback_writes.load(Ordering::Relaxed), 0);
}

#[test]
fn full_queue_blocks_the_producer_instead_of_dropping() {
    let capacity = 2;
    let (processor, out) = spawn_processor(capacity);
    out.hold();

    // First entry parks the worker inside the held console write; the next
    // `capacity` entries fill the queue.
    processor.enqueue(text_entry("0\n".to_string()));
    thread::sleep(Duration::from_millis(50));
    for i in 1..=capacity {
        processor.enqueue(text_entry(format!("{i}\n")));
    }

    let (done_tx, done_rx) = mpsc::channel();
    let blocked_processor = processor.clone();
    let producer = thread::spawn(move || {
        blocked_processor.enqueue(text_entry("overflow\n".to_string()));
        done_tx.send(()).unwrap();
    });

    // The extra enqueue must block while the queue is full...
    assert!(
        done_rx.recv_timeout(Duration::from_millis(200)).is_err(),
        "producer should be backpressured, not completed"
    );

    // ...and complete once the worker frees a slot. Nothing is dropped and
    // nothing bypassed the queue.
    out.release();
    done_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("producer should unblock after drain");
    producer.join().unwrap();
    processor.shutdown();

    assert_eq!(out.writes().len(), capacity + 2);
    assert_eq!(processor.fallback_writes.load(Ordering::Relaxed), 0);
}

#[test]
fn scopes_active_at_log_time_appear_in_the_record() {
    let mut options = ConsoleLoggerOptions::default();
    options.simple.disable_colors = true;
    options.simple.base = FormatterOptions::default().with_scopes();

    let out = Arc::new(TestConsole::new());
    let err = Arc::new(TestConsole::new());
    let provider = ConsoleLoggerProvider::with_console(options, out.clone(), err)
        .expect("build provider");
    let logger = provider.create_logger("Cat");

    let a = logger.begin_scope(LogState::text("A"));
    {
        let _b = logger.begin_scope(LogState::text("B"));
        logger.info("inside");
    }
    logger.info("outer only");
    drop(a);
    logger.info("none");
    provider.shutdown();

    let text = out.written_text();
    assert!(text.contains("      => A => B\n      inside\n"));
    assert!(text.contains("      => A\n      outer only\n"));
    assert!(text.contains("info: Cat[0]\n      none\n"));
}

#[test]
fn stderr_threshold_routes_by_level() {
    let mut options = ConsoleLoggerOptions::default();
    options.simple.disable_colors = true;
    options.simple.base = FormatterOptions::default().with_stderr_threshold(LogLevel::Error);

    let out = Arc::new(TestConsole::new());
    let err = Arc::new(TestConsole::new());
    let provider = ConsoleLoggerProvider::with_console(options, out.clone(), err.clone())
        .expect("build provider");
    let logger = provider.create_logger("Cat");

    logger.warn("to stdout");
    logger.error("to stderr");
    provider.shutdown();

    assert!(out.written_text().contains("to stdout"));
    assert!(!out.written_text().contains("to stderr"));
    assert!(err.written_text().contains("to stderr"));
}
