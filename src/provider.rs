//! Provider: owns the formatter registry, options, console pair, and the
//! processor lifecycle.

use crate::buffer::BufferPool;
use crate::compact::CompactFormatter;
use crate::console::{self, Console};
use crate::formatter::{FormatterRegistry, LogFormatter};
use crate::json::JsonFormatter;
use crate::logger::{ConsoleLogger, LoggerConfig};
use crate::options::{
    CompactFormatterOptions, ConsoleLoggerOptions, JsonFormatterOptions, OptionsHandle,
    SimpleFormatterOptions, SystemdFormatterOptions,
};
use crate::processor::{AsyncLogProcessor, ProcessorBuildError};
use crate::simple::{SimpleFormatter, SIMPLE_FORMATTER_NAME};
use crate::systemd::SystemdFormatter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Owns one console sink: formatters, options, queue, worker.
///
/// Loggers created from the provider share the processor and see options
/// reloads through atomic snapshot swaps.
pub struct ConsoleLoggerProvider {
    registry: FormatterRegistry,
    config: Arc<OptionsHandle<LoggerConfig>>,
    simple_options: Arc<OptionsHandle<SimpleFormatterOptions>>,
    compact_options: Arc<OptionsHandle<CompactFormatterOptions>>,
    systemd_options: Arc<OptionsHandle<SystemdFormatterOptions>>,
    json_options: Arc<OptionsHandle<JsonFormatterOptions>>,
    processor: Arc<AsyncLogProcessor>,
    buffers: Arc<BufferPool>,
    loggers: Mutex<HashMap<String, Arc<ConsoleLogger>>>,
}

impl ConsoleLoggerProvider {
    /// Build a provider writing to the real process console.
    ///
    /// The console implementation is chosen here, once, by platform:
    /// ANSI passthrough where the terminal speaks ANSI natively, the
    /// decode-and-replay console elsewhere.
    pub fn new(options: ConsoleLoggerOptions) -> Result<Self, ProcessorBuildError> {
        let (out, err) = console::default_console_pair();
        Self::build(options, out, err, cfg!(not(windows)))
    }

    /// Build a provider over explicit consoles. Spans are handed to the
    /// consoles as discrete colored writes; intended for test doubles and
    /// embedders with their own sink.
    pub fn with_console(
        options: ConsoleLoggerOptions,
        out: Arc<dyn Console>,
        err: Arc<dyn Console>,
    ) -> Result<Self, ProcessorBuildError> {
        Self::build(options, out, err, false)
    }

    fn build(
        options: ConsoleLoggerOptions,
        out: Arc<dyn Console>,
        err: Arc<dyn Console>,
        flatten_spans: bool,
    ) -> Result<Self, ProcessorBuildError> {
        let simple_options = Arc::new(OptionsHandle::new(options.simple.clone()));
        let compact_options = Arc::new(OptionsHandle::new(options.compact.clone()));
        let systemd_options = Arc::new(OptionsHandle::new(options.systemd.clone()));
        let json_options = Arc::new(OptionsHandle::new(options.json.clone()));

        let mut registry = FormatterRegistry::new();
        registry.register(Arc::new(SimpleFormatter::new(simple_options.clone())));
        registry.register(Arc::new(CompactFormatter::new(compact_options.clone())));
        registry.register(Arc::new(SystemdFormatter::new(systemd_options.clone())));
        registry.register(Arc::new(JsonFormatter::new(json_options.clone())));

        let formatter = resolve_or_default(&registry, &options.formatter_name);
        let processor = Arc::new(AsyncLogProcessor::new(
            out,
            err,
            options.queue_capacity,
            flatten_spans,
        )?);
        let config = Arc::new(OptionsHandle::new(LoggerConfig {
            formatter,
            min_level: options.min_level,
        }));

        Ok(ConsoleLoggerProvider {
            registry,
            config,
            simple_options,
            compact_options,
            systemd_options,
            json_options,
            processor,
            buffers: Arc::new(BufferPool::new()),
            loggers: Mutex::new(HashMap::new()),
        })
    }

    /// Logger for `category`, cached by name.
    pub fn create_logger(&self, category: &str) -> Arc<ConsoleLogger> {
        let mut loggers = self.loggers.lock().expect("logger cache lock poisoned");
        loggers
            .entry(category.to_string())
            .or_insert_with(|| {
                Arc::new(ConsoleLogger::new(
                    category.to_string(),
                    self.config.clone(),
                    self.processor.clone(),
                    self.buffers.clone(),
                ))
            })
            .clone()
    }

    /// Replace the live configuration.
    ///
    /// Every options object is swapped wholesale; in-flight log calls see
    /// either the old or the new snapshot, never a torn one.
    pub fn reload(&self, options: ConsoleLoggerOptions) {
        self.simple_options.reload(options.simple.clone());
        self.compact_options.reload(options.compact.clone());
        self.systemd_options.reload(options.systemd.clone());
        self.json_options.reload(options.json.clone());

        let formatter = resolve_or_default(&self.registry, &options.formatter_name);
        self.config.reload(LoggerConfig {
            formatter,
            min_level: options.min_level,
        });
    }

    /// The shared processor; its counters expose queue throughput.
    pub fn processor(&self) -> &Arc<AsyncLogProcessor> {
        &self.processor
    }

    /// Close the queue and drain it with the processor's bounded timeout.
    pub fn shutdown(&self) {
        self.processor.shutdown();
    }
}

/// A logging misconfiguration must not take the application down: unknown
/// names fall back to the default formatter.
fn resolve_or_default(registry: &FormatterRegistry, name: &str) -> Arc<dyn LogFormatter> {
    match registry.resolve(name) {
        Ok(formatter) => formatter,
        Err(error) => {
            eprintln!("{error}; falling back to {SIMPLE_FORMATTER_NAME:?}");
            registry
                .resolve(SIMPLE_FORMATTER_NAME)
                .expect("default formatter is always registered")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::TestConsole;
    use crate::record::LogLevel;

    fn provider_with(
        options: ConsoleLoggerOptions,
    ) -> (ConsoleLoggerProvider, Arc<TestConsole>, Arc<TestConsole>) {
        let out = Arc::new(TestConsole::new());
        let err = Arc::new(TestConsole::new());
        let provider = ConsoleLoggerProvider::with_console(options, out.clone(), err.clone())
            .expect("build provider");
        (provider, out, err)
    }

    fn no_color_options() -> ConsoleLoggerOptions {
        let mut options = ConsoleLoggerOptions::default();
        options.simple.disable_colors = true;
        options.compact.disable_colors = true;
        options
    }

    #[test]
    fn loggers_are_cached_by_category() {
        let (provider, _out, _err) = provider_with(no_color_options());
        let a = provider.create_logger("App.Service");
        let b = provider.create_logger("App.Service");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unknown_formatter_name_falls_back_to_default() {
        let mut options = no_color_options();
        options.formatter_name = "not-a-formatter".to_string();
        let (provider, out, _err) = provider_with(options);

        provider.create_logger("Cat").info("hello");
        provider.shutdown();
        assert_eq!(out.written_text(), "info: Cat[0]\n      hello\n");
    }

    #[test]
    fn reload_switches_formatter_and_level() {
        let (provider, out, _err) = provider_with(no_color_options());
        let logger = provider.create_logger("Cat");

        logger.debug("hidden");
        let mut options = no_color_options();
        options.formatter_name = crate::systemd::SYSTEMD_FORMATTER_NAME.to_string();
        options.min_level = LogLevel::Debug;
        provider.reload(options);
        logger.debug("visible");
        provider.shutdown();

        assert_eq!(out.written_text(), "<7>Cat[0] visible\n");
    }

    #[test]
    fn disabled_levels_never_reach_the_queue() {
        let (provider, out, _err) = provider_with(no_color_options());
        let logger = provider.create_logger("Cat");
        assert!(!logger.enabled(LogLevel::Trace));
        assert!(!logger.enabled(LogLevel::None));
        logger.trace("dropped before formatting");
        provider.shutdown();
        assert_eq!(out.written_text(), "");
        assert_eq!(
            provider.processor().enqueued.load(std::sync::atomic::Ordering::Relaxed),
            0
        );
    }
}
