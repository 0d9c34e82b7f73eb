use serde_json::Value;
use std::fmt;

/// Key under which a structured state carries the original message template.
pub const ORIGINAL_FORMAT_KEY: &str = "{OriginalFormat}";

/// Severity of a log record, ordered from least to most severe.
///
/// `None` disables logging for a category; it is never a valid level for an
/// emitted record and has no console label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Information,
    Warning,
    Error,
    Critical,
    None,
}

impl LogLevel {
    /// Fixed 4-character console label used by the text formatters.
    ///
    /// Calling this with [`LogLevel::None`] is a programming error and
    /// panics: records at that level must be filtered before formatting.
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Trace => "trce",
            LogLevel::Debug => "dbug",
            LogLevel::Information => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "fail",
            LogLevel::Critical => "crit",
            LogLevel::None => panic!("LogLevel::None has no console label"),
        }
    }

    /// Full level name as emitted by the JSON formatter.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Information => "Information",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Critical => "Critical",
            LogLevel::None => "None",
        }
    }

    /// RFC 5424 syslog priority used by the systemd formatter.
    pub fn syslog_priority(self) -> u8 {
        match self {
            LogLevel::Trace | LogLevel::Debug => 7,
            LogLevel::Information => 6,
            LogLevel::Warning => 4,
            LogLevel::Error => 3,
            LogLevel::Critical => 2,
            LogLevel::None => panic!("LogLevel::None has no syslog priority"),
        }
    }
}

/// Structured or plain message state attached to a log call or scope.
///
/// `Fields` is an ordered key/value sequence; when it carries an
/// [`ORIGINAL_FORMAT_KEY`] entry the remaining keys substitute `{key}`
/// placeholders of that template in sequence order.
#[derive(Debug, Clone, PartialEq)]
pub enum LogState {
    Text(String),
    Fields(Vec<(String, Value)>),
}

impl LogState {
    pub fn text(text: impl Into<String>) -> Self {
        LogState::Text(text.into())
    }

    /// The message template carried under [`ORIGINAL_FORMAT_KEY`], if any.
    pub fn original_format(&self) -> Option<&str> {
        match self {
            LogState::Fields(fields) => fields.iter().find_map(|(key, value)| {
                if key == ORIGINAL_FORMAT_KEY {
                    value.as_str()
                } else {
                    None
                }
            }),
            LogState::Text(_) => None,
        }
    }

    /// Render the state as plain text.
    ///
    /// A `Fields` state with a template replays it with the field values
    /// substituted; without one the pairs are joined as `key=value`.
    pub fn write_text(&self, buf: &mut String) {
        match self {
            LogState::Text(text) => buf.push_str(text),
            LogState::Fields(fields) => {
                if let Some(template) = self.original_format() {
                    replay_template(template, fields, |piece| match piece {
                        TemplatePiece::Literal(literal) => buf.push_str(literal),
                        TemplatePiece::Value(value) => buf.push_str(&value_text(value)),
                    });
                } else {
                    let mut first = true;
                    for (key, value) in fields {
                        if !first {
                            buf.push_str(", ");
                        }
                        first = false;
                        buf.push_str(key);
                        buf.push('=');
                        buf.push_str(&value_text(value));
                    }
                }
            }
        }
    }

    pub fn to_text(&self) -> String {
        let mut buf = String::new();
        self.write_text(&mut buf);
        buf
    }
}

/// One segment of a replayed message template.
pub(crate) enum TemplatePiece<'a> {
    Literal(&'a str),
    Value(&'a Value),
}

/// Walk `template` substituting each field's `{key}` occurrence in textual
/// order, matching the order keys appear in `fields`. Literal slices between
/// placeholders and substituted values are handed to `visit` in layout
/// order; keys with no remaining occurrence are skipped.
pub(crate) fn replay_template(
    template: &str,
    fields: &[(String, Value)],
    mut visit: impl FnMut(TemplatePiece<'_>),
) {
    let mut cursor = 0;
    for (key, val) in fields {
        if key == ORIGINAL_FORMAT_KEY {
            continue;
        }
        let placeholder = format!("{{{key}}}");
        if let Some(pos) = template[cursor..].find(&placeholder) {
            let at = cursor + pos;
            if at > cursor {
                visit(TemplatePiece::Literal(&template[cursor..at]));
            }
            visit(TemplatePiece::Value(val));
            cursor = at + placeholder.len();
        }
    }
    if cursor < template.len() {
        visit(TemplatePiece::Literal(&template[cursor..]));
    }
}

/// Plain-text form of a field value: strings unquoted, everything else in
/// its JSON rendering.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Captured exception attached to a log record.
///
/// `stack_trace` holds newline-delimited frames; `inner` chains a nested
/// cause the way wrapped errors do.
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    pub exception_type: String,
    pub message: String,
    pub stack_trace: Option<String>,
    pub hresult: i32,
    pub inner: Option<Box<Exception>>,
}

impl Exception {
    pub fn new(exception_type: impl Into<String>, message: impl Into<String>) -> Self {
        Exception {
            exception_type: exception_type.into(),
            message: message.into(),
            stack_trace: None,
            hresult: 0,
            inner: None,
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_hresult(mut self, hresult: i32) -> Self {
        self.hresult = hresult;
        self
    }

    pub fn with_inner(mut self, inner: Exception) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.exception_type, self.message)?;
        if let Some(inner) = &self.inner {
            write!(f, "\n ---> {inner}")?;
        }
        if let Some(stack) = &self.stack_trace {
            write!(f, "\n{stack}")?;
        }
        Ok(())
    }
}

/// One log call as seen by a formatter. Built on the caller's thread and
/// consumed within the same `log` invocation; `message` is the output of the
/// caller-supplied render function.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    pub level: LogLevel,
    pub category: &'a str,
    pub event_id: i32,
    pub state: &'a LogState,
    pub exception: Option<&'a Exception>,
    pub message: &'a str,
}
