//! Newline-delimited JSON formatter.
//!
//! One single-line JSON object per record; key order is fixed by struct
//! declaration order.

use crate::formatter::{EntryPayload, FormattedEntry, LogFormatter};
use crate::options::{JsonFormatterOptions, OptionsHandle};
use crate::record::{Exception, LogRecord, LogState};
use crate::scope::ScopeSource;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const JSON_FORMATTER_NAME: &str = "json";

#[derive(Serialize)]
struct JsonEntry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(rename = "eventId")]
    event_id: i32,
    #[serde(rename = "logLevel")]
    log_level: &'static str,
    category: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<JsonException<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scopes: Option<Vec<Value>>,
}

#[derive(Serialize)]
struct JsonException<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    exception_type: &'a str,
    #[serde(rename = "stackTrace")]
    stack_trace: Vec<&'a str>,
    #[serde(rename = "hResult")]
    hresult: i32,
}

impl<'a> JsonException<'a> {
    fn from_exception(exception: &'a Exception) -> Self {
        JsonException {
            message: &exception.message,
            exception_type: &exception.exception_type,
            stack_trace: exception
                .stack_trace
                .as_deref()
                .map(|stack| stack.lines().collect())
                .unwrap_or_default(),
            hresult: exception.hresult,
        }
    }
}

pub struct JsonFormatter {
    options: Arc<OptionsHandle<JsonFormatterOptions>>,
}

impl JsonFormatter {
    pub fn new(options: Arc<OptionsHandle<JsonFormatterOptions>>) -> Self {
        JsonFormatter { options }
    }
}

/// A `Fields` scope expands into a JSON object; anything else falls back to
/// its string form.
fn scope_value(scope: &LogState) -> Value {
    match scope {
        LogState::Fields(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        LogState::Text(text) => Value::String(text.clone()),
    }
}

impl LogFormatter for JsonFormatter {
    fn name(&self) -> &'static str {
        JSON_FORMATTER_NAME
    }

    fn format(
        &self,
        record: &LogRecord<'_>,
        scopes: &dyn ScopeSource,
        _scratch: &mut String,
    ) -> Option<FormattedEntry> {
        if record.message.is_empty() && record.exception.is_none() {
            return None;
        }
        let options = self.options.current();

        let scope_values = if options.base.include_scopes {
            let mut values = Vec::new();
            scopes.for_each_scope(&mut |scope| values.push(scope_value(scope)));
            if values.is_empty() {
                None
            } else {
                Some(values)
            }
        } else {
            None
        };

        let entry = JsonEntry {
            timestamp: options.base.timestamp(),
            event_id: record.event_id,
            log_level: record.level.as_str(),
            category: record.category,
            message: record.message,
            exception: record.exception.map(JsonException::from_exception),
            scopes: scope_values,
        };

        // Serialization of these types cannot fail; treat a failure as a
        // suppressed record rather than letting it reach the caller.
        let mut line = serde_json::to_string(&entry).ok()?;
        line.push('\n');

        Some(FormattedEntry {
            payload: EntryPayload::Text(line),
            use_stderr: record.level >= options.base.log_to_stderr_threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FormatterOptions;
    use crate::record::LogLevel;
    use crate::scope::FixedScopes;
    use serde_json::json;

    fn formatter(options: JsonFormatterOptions) -> JsonFormatter {
        JsonFormatter::new(Arc::new(OptionsHandle::new(options)))
    }

    fn format(
        f: &JsonFormatter,
        message: &str,
        exception: Option<&Exception>,
        scopes: &FixedScopes,
    ) -> Option<FormattedEntry> {
        let state = LogState::text(message);
        let record = LogRecord {
            level: LogLevel::Warning,
            category: "Cat",
            event_id: 11,
            state: &state,
            exception,
            message,
        };
        let mut scratch = String::new();
        f.format(&record, scopes, &mut scratch)
    }

    fn parse(entry: &FormattedEntry) -> Value {
        let text = entry.text();
        assert!(text.ends_with('\n'));
        let line = text.trim_end_matches('\n');
        assert!(!line.contains('\n'), "payload must be single-line JSON");
        serde_json::from_str(line).expect("well-formed JSON")
    }

    #[test]
    fn record_parses_as_one_json_object() {
        let entry = format(
            &formatter(JsonFormatterOptions::default()),
            "hello",
            None,
            &FixedScopes(vec![]),
        )
        .unwrap();
        let value = parse(&entry);
        assert!(value["eventId"].is_number());
        assert_eq!(value["eventId"], json!(11));
        assert_eq!(value["logLevel"], json!("Warning"));
        assert_eq!(value["category"], json!("Cat"));
        assert_eq!(value["message"], json!("hello"));
        assert!(value.get("timestamp").is_none());
        assert!(value.get("exception").is_none());
    }

    #[test]
    fn stack_trace_array_matches_frame_count() {
        let exception = Exception::new("IoError", "bad")
            .with_stack_trace("at read()\nat copy()\nat main()")
            .with_hresult(-2147024894);
        let entry = format(
            &formatter(JsonFormatterOptions::default()),
            "m",
            Some(&exception),
            &FixedScopes(vec![]),
        )
        .unwrap();
        let value = parse(&entry);
        let frames = value["exception"]["stackTrace"].as_array().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(value["exception"]["type"], json!("IoError"));
        assert_eq!(value["exception"]["message"], json!("bad"));
        assert_eq!(value["exception"]["hResult"], json!(-2147024894));
    }

    #[test]
    fn field_scopes_expand_into_objects() {
        let f = formatter(JsonFormatterOptions {
            base: FormatterOptions::default().with_scopes(),
        });
        let scopes = FixedScopes(vec![
            LogState::Fields(vec![("requestId".into(), json!(42))]),
            LogState::text("outer"),
        ]);
        let entry = format(&f, "m", None, &scopes).unwrap();
        let value = parse(&entry);
        let scopes = value["scopes"].as_array().unwrap();
        assert_eq!(scopes[0], json!({ "requestId": 42 }));
        assert_eq!(scopes[1], json!("outer"));
    }

    #[test]
    fn empty_scope_stack_omits_the_field() {
        let f = formatter(JsonFormatterOptions {
            base: FormatterOptions::default().with_scopes(),
        });
        let entry = format(&f, "m", None, &FixedScopes(vec![])).unwrap();
        assert!(parse(&entry).get("scopes").is_none());
    }

    #[test]
    fn message_newlines_survive_via_json_escaping() {
        let entry = format(
            &formatter(JsonFormatterOptions::default()),
            "a\nb",
            None,
            &FixedScopes(vec![]),
        )
        .unwrap();
        let value = parse(&entry);
        assert_eq!(value["message"], json!("a\nb"));
    }

    #[test]
    fn empty_record_is_suppressed() {
        let entry = format(
            &formatter(JsonFormatterOptions::default()),
            "",
            None,
            &FixedScopes(vec![]),
        );
        assert!(entry.is_none());
    }
}
