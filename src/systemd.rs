//! Journal-friendly single-line formatter.
//!
//! The journal treats a newline as a record delimiter, so the whole record
//! is flattened before the single trailing terminator is appended.

use crate::formatter::{EntryPayload, FormattedEntry, LogFormatter};
use crate::options::{OptionsHandle, SystemdFormatterOptions};
use crate::record::LogRecord;
use crate::scope::{render_scopes, ScopeSource};
use std::fmt::Write as _;
use std::sync::Arc;

pub const SYSTEMD_FORMATTER_NAME: &str = "systemd";

pub struct SystemdFormatter {
    options: Arc<OptionsHandle<SystemdFormatterOptions>>,
}

impl SystemdFormatter {
    pub fn new(options: Arc<OptionsHandle<SystemdFormatterOptions>>) -> Self {
        SystemdFormatter { options }
    }
}

impl LogFormatter for SystemdFormatter {
    fn name(&self) -> &'static str {
        SYSTEMD_FORMATTER_NAME
    }

    fn format(
        &self,
        record: &LogRecord<'_>,
        scopes: &dyn ScopeSource,
        scratch: &mut String,
    ) -> Option<FormattedEntry> {
        if record.message.is_empty() && record.exception.is_none() {
            return None;
        }
        let options = self.options.current();

        let _ = write!(scratch, "<{}>", record.level.syslog_priority());
        if let Some(timestamp) = options.base.timestamp() {
            scratch.push_str(&timestamp);
        }
        scratch.push_str(record.category);
        let _ = write!(scratch, "[{}]", record.event_id);

        if options.base.include_scopes {
            render_scopes(scopes, scratch, Some(" "));
        }

        if !record.message.is_empty() {
            scratch.push(' ');
            scratch.push_str(record.message);
        }
        if let Some(exception) = record.exception {
            scratch.push(' ');
            let _ = write!(scratch, "{exception}");
        }

        // Flatten whatever any field smuggled in, then terminate the record.
        let mut line = String::with_capacity(scratch.len() + 1);
        for c in scratch.chars() {
            match c {
                '\r' => {}
                '\n' => line.push(' '),
                other => line.push(other),
            }
        }
        line.push('\n');

        Some(FormattedEntry {
            payload: EntryPayload::Text(line),
            use_stderr: record.level >= options.base.log_to_stderr_threshold,
        })
    }
}
