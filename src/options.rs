use crate::record::LogLevel;
use std::sync::{Arc, RwLock};

/// Options shared by every formatter variant, embedded by value in each
/// variant-specific struct.
///
/// **Fields**
/// - `include_scopes`: render the active scope stack into each record.
/// - `timestamp_format`: strftime-style pattern; `None` emits no timestamp.
/// - `use_utc_timestamp`: UTC instead of local time.
/// - `log_to_stderr_threshold`: records at or above this level route to the
///   error stream. The default `LogLevel::None` routes nothing to stderr.
#[derive(Debug, Clone)]
pub struct FormatterOptions {
    pub include_scopes: bool,
    pub timestamp_format: Option<String>,
    pub use_utc_timestamp: bool,
    pub log_to_stderr_threshold: LogLevel,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        FormatterOptions {
            include_scopes: false,
            timestamp_format: None,
            use_utc_timestamp: false,
            log_to_stderr_threshold: LogLevel::None,
        }
    }
}

impl FormatterOptions {
    pub fn with_scopes(mut self) -> Self {
        self.include_scopes = true;
        self
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = Some(format.into());
        self
    }

    pub fn with_utc_timestamp(mut self) -> Self {
        self.use_utc_timestamp = true;
        self
    }

    pub fn with_stderr_threshold(mut self, threshold: LogLevel) -> Self {
        self.log_to_stderr_threshold = threshold;
        self
    }

    /// Current timestamp rendered with the configured pattern, or `None`
    /// when no pattern is set.
    pub fn timestamp(&self) -> Option<String> {
        let format = self.timestamp_format.as_deref()?;
        let rendered = if self.use_utc_timestamp {
            chrono::Utc::now().format(format).to_string()
        } else {
            chrono::Local::now().format(format).to_string()
        };
        Some(rendered)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimpleFormatterOptions {
    pub base: FormatterOptions,
    pub disable_colors: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CompactFormatterOptions {
    pub base: FormatterOptions,
    pub disable_colors: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SystemdFormatterOptions {
    pub base: FormatterOptions,
}

#[derive(Debug, Clone, Default)]
pub struct JsonFormatterOptions {
    pub base: FormatterOptions,
}

/// Provider-level configuration: active formatter, level threshold, queue
/// size, plus the per-variant formatter options.
#[derive(Debug, Clone)]
pub struct ConsoleLoggerOptions {
    /// Name of the formatter to activate; unknown names fall back to the
    /// default formatter rather than failing.
    pub formatter_name: String,
    pub min_level: LogLevel,
    pub queue_capacity: usize,
    pub simple: SimpleFormatterOptions,
    pub compact: CompactFormatterOptions,
    pub systemd: SystemdFormatterOptions,
    pub json: JsonFormatterOptions,
}

impl Default for ConsoleLoggerOptions {
    fn default() -> Self {
        ConsoleLoggerOptions {
            formatter_name: crate::simple::SIMPLE_FORMATTER_NAME.to_string(),
            min_level: LogLevel::Information,
            queue_capacity: crate::processor::DEFAULT_QUEUE_CAPACITY,
            simple: SimpleFormatterOptions::default(),
            compact: CompactFormatterOptions::default(),
            systemd: SystemdFormatterOptions::default(),
            json: JsonFormatterOptions::default(),
        }
    }
}

/// Atomically swappable options snapshot.
///
/// Reload replaces the whole object; readers take a cheap `Arc` snapshot per
/// call and may observe either the old or new value, never a torn one.
#[derive(Debug)]
pub struct OptionsHandle<T> {
    current: RwLock<Arc<T>>,
}

impl<T> OptionsHandle<T> {
    pub fn new(value: T) -> Self {
        OptionsHandle {
            current: RwLock::new(Arc::new(value)),
        }
    }

    pub fn current(&self) -> Arc<T> {
        self.current.read().expect("options lock poisoned").clone()
    }

    pub fn reload(&self, value: T) {
        *self.current.write().expect("options lock poisoned") = Arc::new(value);
    }
}
