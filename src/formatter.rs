use crate::ansi::{Color, ColoredSpan};
use crate::record::{LogLevel, LogRecord};
use crate::scope::ScopeSource;
use std::collections::HashMap;
use std::sync::Arc;

/// Formatted record ready for the queue.
///
/// Either one pre-rendered string (color embedded as ANSI escapes, if any)
/// or a sequence of discrete colored spans. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedEntry {
    pub payload: EntryPayload,
    /// Route this entry to the error stream instead of standard output.
    pub use_stderr: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    Text(String),
    Spans(Vec<ColoredSpan>),
}

impl FormattedEntry {
    /// Flattened text of the payload, escape codes included. Test helper.
    pub fn text(&self) -> String {
        match &self.payload {
            EntryPayload::Text(text) => text.clone(),
            EntryPayload::Spans(spans) => spans.iter().map(|s| s.text.as_str()).collect(),
        }
    }
}

/// Strategy turning one log record into console bytes.
///
/// **Parameters to `format`**
/// - `record`: the record under format; `record.message` is already
///   rendered by the caller-supplied function.
/// - `scopes`: scope stack of the calling thread, walked only when the
///   variant's options enable scopes.
/// - `scratch`: pooled buffer for building text output; the caller returns
///   it to the pool afterwards.
///
/// **Returns**
/// - `None` when the rendered message is empty and no exception is present
///   (empty records are suppressed by every variant).
/// - Otherwise exactly one [`FormattedEntry`].
pub trait LogFormatter: Send + Sync {
    fn name(&self) -> &'static str;

    fn format(
        &self,
        record: &LogRecord<'_>,
        scopes: &dyn ScopeSource,
        scratch: &mut String,
    ) -> Option<FormattedEntry>;
}

/// Error type returned when resolving a formatter by name.
#[derive(thiserror::Error, Debug)]
#[error("unknown console formatter: {0:?}")]
pub struct UnknownFormatterError(pub String);

/// Name-to-formatter map built once at provider construction.
///
/// Replaces ambient static formatter tables: the registry is owned by the
/// provider and passed by reference, so tests can substitute doubles.
#[derive(Default)]
pub struct FormatterRegistry {
    formatters: HashMap<String, Arc<dyn LogFormatter>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        FormatterRegistry::default()
    }

    /// Register a formatter under its own name; a later registration with
    /// the same name replaces the earlier one.
    pub fn register(&mut self, formatter: Arc<dyn LogFormatter>) {
        self.formatters.insert(formatter.name().to_string(), formatter);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn LogFormatter>, UnknownFormatterError> {
        self.formatters
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownFormatterError(name.to_string()))
    }
}

/// Fixed per-level console colors as `(background, foreground)`.
pub(crate) fn level_colors(level: LogLevel) -> (Option<Color>, Option<Color>) {
    match level {
        LogLevel::Critical => (Some(Color::Red), Some(Color::White)),
        LogLevel::Error => (Some(Color::Red), Some(Color::Black)),
        LogLevel::Warning => (Some(Color::Black), Some(Color::Yellow)),
        LogLevel::Information => (Some(Color::Black), Some(Color::DarkGreen)),
        LogLevel::Debug | LogLevel::Trace => (Some(Color::Black), Some(Color::Gray)),
        LogLevel::None => (None, None),
    }
}

/// Append `text` with every line break collapsed to a single space.
pub(crate) fn append_flattened(buf: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' => buf.push(' '),
            other => buf.push(other),
        }
    }
}

/// Append `text` with embedded line breaks re-indented by `newline_padding`.
pub(crate) fn append_reindented(buf: &mut String, text: &str, newline_padding: &str) {
    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' => buf.push_str(newline_padding),
            other => buf.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::FixedScopes;
    use crate::record::LogState;

    struct StubFormatter(&'static str);

    impl LogFormatter for StubFormatter {
        fn name(&self) -> &'static str {
            self.0
        }

        fn format(
            &self,
            _record: &LogRecord<'_>,
            _scopes: &dyn ScopeSource,
            _scratch: &mut String,
        ) -> Option<FormattedEntry> {
            None
        }
    }

    #[test]
    fn registry_resolves_by_name() {
        let mut registry = FormatterRegistry::new();
        registry.register(Arc::new(StubFormatter("stub")));
        assert!(registry.resolve("stub").is_ok());
        assert!(registry.resolve("nope").is_err());
    }

    #[test]
    fn flattened_text_has_no_line_breaks() {
        let mut buf = String::new();
        append_flattened(&mut buf, "a\r\nb\nc");
        assert_eq!(buf, "a b c");
    }

    #[test]
    fn reindent_pads_following_lines() {
        let mut buf = String::new();
        append_reindented(&mut buf, "one\ntwo", "\n  ");
        assert_eq!(buf, "one\n  two");
    }

    #[test]
    fn stub_formatter_type_checks_against_scope_source() {
        // Keeps FixedScopes and the trait object seam exercised together.
        let state = LogState::text("x");
        let record = LogRecord {
            level: LogLevel::Information,
            category: "Cat",
            event_id: 0,
            state: &state,
            exception: None,
            message: "x",
        };
        let mut scratch = String::new();
        let entry = StubFormatter("stub").format(&record, &FixedScopes(Vec::new()), &mut scratch);
        assert!(entry.is_none());
    }
}
