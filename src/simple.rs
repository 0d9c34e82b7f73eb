//! Human-readable multi-line formatter, the default variant.

use crate::ansi;
use crate::formatter::{
    append_reindented, level_colors, EntryPayload, FormattedEntry, LogFormatter,
};
use crate::options::{OptionsHandle, SimpleFormatterOptions};
use crate::record::LogRecord;
use crate::scope::{render_scopes, ScopeSource};
use std::fmt::Write as _;
use std::sync::Arc;

pub const SIMPLE_FORMATTER_NAME: &str = "simple";

// Width of the level label plus ": "; continuation lines align under it.
const MESSAGE_PADDING: &str = "      ";
const NEWLINE_WITH_PADDING: &str = "\n      ";

/// Renders records as
///
/// ```text
/// warn: MyApp.Service[12]
///       => RequestId=42
///       something happened
/// ```
///
/// with the level label colored per the fixed level table. Color is embedded
/// as inline ANSI escapes in the single text payload.
pub struct SimpleFormatter {
    options: Arc<OptionsHandle<SimpleFormatterOptions>>,
}

impl SimpleFormatter {
    pub fn new(options: Arc<OptionsHandle<SimpleFormatterOptions>>) -> Self {
        SimpleFormatter { options }
    }
}

impl LogFormatter for SimpleFormatter {
    fn name(&self) -> &'static str {
        SIMPLE_FORMATTER_NAME
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

        if let Some(timestamp) = options.base.timestamp() {
            scratch.push_str(&timestamp);
        }

        let (background, foreground) = if options.disable_colors {
            (None, None)
        } else {
            level_colors(record.level)
        };
        ansi::write_colored(scratch, record.level.label(), background, foreground);

        scratch.push_str(": ");
        scratch.push_str(record.category);
        let _ = write!(scratch, "[{}]", record.event_id);
        scratch.push('\n');

        if options.base.include_scopes && render_scopes(scopes, scratch, Some(MESSAGE_PADDING)) {
            scratch.push('\n');
        }

        if !record.message.is_empty() {
            scratch.push_str(MESSAGE_PADDING);
            append_reindented(scratch, record.message, NEWLINE_WITH_PADDING);
            scratch.push('\n');
        }

        if let Some(exception) = record.exception {
            let _ = write!(scratch, "{exception}");
            scratch.push('\n');
        }

        Some(FormattedEntry {
            payload: EntryPayload::Text(scratch.clone()),
            use_stderr: record.level >= options.base.log_to_stderr_threshold,
        })
    }
}
