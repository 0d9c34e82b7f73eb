//! Per-category logging front-end.

use crate::buffer::BufferPool;
use crate::formatter::LogFormatter;
use crate::options::OptionsHandle;
use crate::processor::AsyncLogProcessor;
use crate::record::{Exception, LogLevel, LogRecord, LogState};
use crate::scope::{CallContextScopes, ScopeGuard};
use std::sync::Arc;

/// Active formatter and threshold shared by every logger of a provider;
/// replaced wholesale on configuration reload.
pub(crate) struct LoggerConfig {
    pub(crate) formatter: Arc<dyn LogFormatter>,
    pub(crate) min_level: LogLevel,
}

/// Category-bound logger.
///
/// `log` runs the enabled check and the active formatter on the calling
/// thread (where the scope stack lives), then enqueues the finished entry;
/// only the console write is deferred to the background worker.
pub struct ConsoleLogger {
    category: String,
    config: Arc<OptionsHandle<LoggerConfig>>,
    processor: Arc<AsyncLogProcessor>,
    buffers: Arc<BufferPool>,
}

impl ConsoleLogger {
    pub(crate) fn new(
        category: String,
        config: Arc<OptionsHandle<LoggerConfig>>,
        processor: Arc<AsyncLogProcessor>,
        buffers: Arc<BufferPool>,
    ) -> Self {
        ConsoleLogger {
            category,
            config,
            processor,
            buffers,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::None && level >= self.config.current().min_level
    }

    /// Format and enqueue one record.
    ///
    /// **Parameters**
    /// - `level`, `event_id`: record identity.
    /// - `state`: plain text or ordered key/value fields (possibly carrying
    ///   an `{OriginalFormat}` template).
    /// - `exception`: optional captured failure.
    /// - `render`: turns state and exception into the message text. The
    ///   callback is required by the signature itself; panics it raises are
    ///   the caller's own (argument-contract violations fail fast).
    ///
    /// Failures past rendering (formatting oddities, a closed queue, a
    /// broken console) are recovered internally and never reach the
    /// application.
    pub fn log<F>(
        &self,
        level: LogLevel,
        event_id: i32,
        state: LogState,
        exception: Option<&Exception>,
        render: F,
    ) where
        F: FnOnce(&LogState, Option<&Exception>) -> String,
    {
        if !self.enabled(level) {
            return;
        }
        let config = self.config.current();
        let message = render(&state, exception);
        let record = LogRecord {
            level,
            category: &self.category,
            event_id,
            state: &state,
            exception,
            message: &message,
        };

        let mut scratch = self.buffers.take();
        let entry = config.formatter.format(&record, &CallContextScopes, &mut scratch);
        self.buffers.put(scratch);

        if let Some(entry) = entry {
            self.processor.enqueue(entry);
        }
    }

    /// Log with the default rendering (the state's own text form).
    pub fn log_message(&self, level: LogLevel, event_id: i32, state: LogState) {
        self.log(level, event_id, state, None, |state, _| state.to_text());
    }

    /// Push a scope visible to every record this thread logs until the
    /// guard drops.
    pub fn begin_scope(&self, scope: LogState) -> ScopeGuard {
        CallContextScopes::push(scope)
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log_message(LogLevel::Trace, 0, LogState::Text(message.into()));
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log_message(LogLevel::Debug, 0, LogState::Text(message.into()));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log_message(LogLevel::Information, 0, LogState::Text(message.into()));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log_message(LogLevel::Warning, 0, LogState::Text(message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log_message(LogLevel::Error, 0, LogState::Text(message.into()));
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log_message(LogLevel::Critical, 0, LogState::Text(message.into()));
    }
}
