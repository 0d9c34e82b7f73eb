//! Single-line formatter with per-value coloring.
//!
//! Emits discrete colored spans rather than one pre-escaped string; the
//! processor bridges them to the representation the selected console needs.

use crate::ansi::{Color, ColoredSpan};
use crate::formatter::{level_colors, EntryPayload, FormattedEntry, LogFormatter};
use crate::options::{CompactFormatterOptions, OptionsHandle};
use crate::record::{replay_template, value_text, LogRecord, LogState, TemplatePiece};
use crate::scope::{render_scopes, ScopeSource};
use std::fmt::Write as _;
use std::sync::Arc;

pub const COMPACT_FORMATTER_NAME: &str = "compact";

const VALUE_FOREGROUND: Color = Color::DarkCyan;

/// Accumulates spans, merging consecutive uncolored text and collapsing
/// line breaks so the record stays on one line.
struct SpanBuilder {
    spans: Vec<ColoredSpan>,
    pending: String,
    colors_enabled: bool,
}

impl SpanBuilder {
    fn new(colors_enabled: bool) -> Self {
        SpanBuilder {
            spans: Vec::new(),
            pending: String::new(),
            colors_enabled,
        }
    }

    fn text(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '\r' => {}
                '\n' => self.pending.push(' '),
                other => self.pending.push(other),
            }
        }
    }

    fn colored(&mut self, text: &str, background: Option<Color>, foreground: Option<Color>) {
        if !self.colors_enabled || (background.is_none() && foreground.is_none()) {
            self.text(text);
            return;
        }
        self.flush();
        let mut body = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\r' => {}
                '\n' => body.push(' '),
                other => body.push(other),
            }
        }
        self.spans.push(ColoredSpan::colored(body, background, foreground));
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.spans.push(ColoredSpan::plain(std::mem::take(&mut self.pending)));
        }
    }

    fn finish(mut self) -> Vec<ColoredSpan> {
        self.pending.push('\n');
        self.flush();
        self.spans
    }
}

pub struct CompactFormatter {
    options: Arc<OptionsHandle<CompactFormatterOptions>>,
}

impl CompactFormatter {
    pub fn new(options: Arc<OptionsHandle<CompactFormatterOptions>>) -> Self {
        CompactFormatter { options }
    }
}

impl LogFormatter for CompactFormatter {
    fn name(&self) -> &'static str {
        COMPACT_FORMATTER_NAME
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
        let mut builder = SpanBuilder::new(!options.disable_colors);

        if let Some(timestamp) = options.base.timestamp() {
            builder.text(&timestamp);
            builder.text(" ");
        }

        let (background, foreground) = level_colors(record.level);
        builder.colored(record.level.label(), background, foreground);
        builder.text(" ");

        builder.text(record.category);
        let _ = write!(builder.pending, "[{}]", record.event_id);

        if !record.message.is_empty() {
            builder.text(" ");
            match record.state {
                LogState::Fields(fields) if record.state.original_format().is_some() => {
                    let template = record.state.original_format().expect("checked above");
                    replay_template(template, fields, |piece| match piece {
                        TemplatePiece::Literal(literal) => builder.text(literal),
                        TemplatePiece::Value(value) => {
                            builder.colored(&value_text(value), None, Some(VALUE_FOREGROUND))
                        }
                    });
                }
                _ => builder.text(record.message),
            }
        }

        if options.base.include_scopes {
            scratch.clear();
            if render_scopes(scopes, scratch, Some(" ")) {
                builder.text(scratch);
            }
        }

        if let Some(exception) = record.exception {
            builder.text(" ");
            builder.text(&exception.to_string());
        }

        Some(FormattedEntry {
            payload: EntryPayload::Spans(builder.finish()),
            use_stderr: record.level >= options.base.log_to_stderr_threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FormatterOptions;
    use crate::record::{Exception, LogLevel, ORIGINAL_FORMAT_KEY};
    use crate::scope::FixedScopes;
    use serde_json::json;

    fn formatter(options: CompactFormatterOptions) -> CompactFormatter {
        CompactFormatter::new(Arc::new(OptionsHandle::new(options)))
    }

    fn plain() -> CompactFormatter {
        formatter(CompactFormatterOptions {
            base: FormatterOptions::default(),
            disable_colors: true,
        })
    }

    fn format_state(
        f: &CompactFormatter,
        state: LogState,
        exception: Option<&Exception>,
        scopes: &FixedScopes,
    ) -> Option<FormattedEntry> {
        let message = state.to_text();
        let record = LogRecord {
            level: LogLevel::Information,
            category: "Cat",
            event_id: 7,
            state: &state,
            exception,
            message: &message,
        };
        let mut scratch = String::new();
        f.format(&record, scopes, &mut scratch)
    }

    #[test]
    fn lays_out_all_fields_on_one_line() {
        let entry =
            format_state(&plain(), LogState::text("hello"), None, &FixedScopes(vec![])).unwrap();
        assert_eq!(entry.text(), "info Cat[7] hello\n");
    }

    #[test]
    fn template_values_become_colored_spans() {
        let f = formatter(CompactFormatterOptions::default());
        let state = LogState::Fields(vec![
            ("user".into(), json!("ada")),
            ("n".into(), json!(3)),
            (ORIGINAL_FORMAT_KEY.into(), json!("user {user} sent {n} items")),
        ]);
        let entry = format_state(&f, state, None, &FixedScopes(vec![])).unwrap();
        let EntryPayload::Spans(spans) = &entry.payload else {
            panic!("compact formatter must emit spans");
        };
        // level label colored, literals plain, each value colored.
        let value_spans: Vec<&ColoredSpan> = spans
            .iter()
            .filter(|s| s.foreground == Some(VALUE_FOREGROUND))
            .collect();
        assert_eq!(value_spans.len(), 2);
        assert_eq!(value_spans[0].text, "ada");
        assert_eq!(value_spans[1].text, "3");
        assert_eq!(entry.text(), "info Cat[7] user ada sent 3 items\n");
    }

    #[test]
    fn disable_colors_collapses_to_plain_spans() {
        let state = LogState::Fields(vec![
            ("user".into(), json!("ada")),
            (ORIGINAL_FORMAT_KEY.into(), json!("hi {user}")),
        ]);
        let entry = format_state(&plain(), state, None, &FixedScopes(vec![])).unwrap();
        let EntryPayload::Spans(spans) = &entry.payload else {
            panic!("expected spans");
        };
        assert!(spans.iter().all(|s| s.foreground.is_none() && s.background.is_none()));
        assert_eq!(entry.text(), "info Cat[7] hi ada\n");
    }

    #[test]
    fn exception_newlines_are_flattened() {
        let exception = Exception::new("E", "top").with_stack_trace("at a\nat b");
        let entry =
            format_state(&plain(), LogState::text("m"), Some(&exception), &FixedScopes(vec![]))
                .unwrap();
        let text = entry.text();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.ends_with('\n'));
        assert!(text.contains("E: top at a at b"));
    }

    #[test]
    fn scopes_render_inline() {
        let f = formatter(CompactFormatterOptions {
            base: FormatterOptions::default().with_scopes(),
            disable_colors: true,
        });
        let scopes = FixedScopes(vec![LogState::text("A"), LogState::text("B")]);
        let entry = format_state(&f, LogState::text("m"), None, &scopes).unwrap();
        assert_eq!(entry.text(), "info Cat[7] m => A => B\n");
    }

    #[test]
    fn empty_record_is_suppressed() {
        assert!(format_state(&plain(), LogState::text(""), None, &FixedScopes(vec![])).is_none());
    }
}
