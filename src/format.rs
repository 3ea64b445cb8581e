use std::{borrow::Cow, fmt::Write};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{ser::SerializeMap, Serialize};
use serde_json::Value;

use crate::{
    caller::{Frame, RenderedLocation},
    field_order::{compare_field_keys, FIELD_COMPONENT, FIELD_FILE, FIELD_FUNC, FIELD_LEVEL, FIELD_MSG, FIELD_TIME, RESERVED_FIELDS},
    LogLevel,
};

/// A user supplied field, value already serialized.
pub type Field = (Cow<'static, str>, Value);

pub(crate) struct Record<'a> {
    pub time: DateTime<Utc>,
    pub level: LogLevel,
    pub msg: &'a str,
    pub comp: Option<&'a str>,
    pub frame: Frame<'static>,
    /// Logger fields first, then the record's own; later names win.
    pub fields: [&'a [Field]; 2],
}

enum FieldValue<'a> {
    Str(&'a str),
    Json(&'a Value),
}

impl Serialize for FieldValue<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
        match self {
            FieldValue::Str(s) => serializer.serialize_str(s),
            FieldValue::Json(v) => v.serialize(serializer),
        }
    }
}

struct SortedFields<'a>(Vec<(Cow<'a, str>, FieldValue<'a>)>);

impl Serialize for SortedFields<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key.as_ref(), value)?;
        }
        map.end()
    }
}

/// Render one record as a single line, newline included.
pub(crate) fn render(record: &Record<'_>, caller: Option<&RenderedLocation>, json: bool) -> String {
    let time = record.time.to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut fields: Vec<(Cow<'_, str>, FieldValue<'_>)> = Vec::with_capacity(8);
    fields.push((FIELD_TIME.into(), FieldValue::Str(&time)));
    fields.push((FIELD_LEVEL.into(), FieldValue::Str(record.level.as_str())));
    if let Some(comp) = record.comp {
        fields.push((FIELD_COMPONENT.into(), FieldValue::Str(comp)));
    }
    if let Some(caller) = caller {
        if !caller.location().is_empty() {
            fields.push((FIELD_FILE.into(), FieldValue::Str(caller.location())));
        }
        if !caller.function().is_empty() {
            fields.push((FIELD_FUNC.into(), FieldValue::Str(caller.function())));
        }
    }

    let builtin = fields.len();
    for (name, value) in record.fields.iter().flat_map(|f| f.iter()) {
        let name: &str = name;
        let key: Cow<'_, str> = if RESERVED_FIELDS.contains(&name) {
            Cow::Owned(format!("fields.{name}"))
        } else {
            Cow::Borrowed(name)
        };

        match fields[builtin..].iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = FieldValue::Json(value),
            None => fields.push((key, FieldValue::Json(value))),
        }
    }
    fields.push((FIELD_MSG.into(), FieldValue::Str(record.msg)));

    fields.sort_by(|a, b| compare_field_keys(&a.0, &b.0));

    if json {
        let mut line = serde_json::to_string(&SortedFields(fields)).unwrap_or_default();
        line.push('\n');
        line
    } else {
        render_text(&fields)
    }
}

fn render_text(fields: &[(Cow<'_, str>, FieldValue<'_>)]) -> String {
    let mut line = String::with_capacity(128);
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(key);
        line.push('=');
        match value {
            FieldValue::Str(s) => push_text(&mut line, s),
            FieldValue::Json(Value::String(s)) => push_text(&mut line, s),
            FieldValue::Json(v) => push_text(&mut line, &v.to_string()),
        }
    }
    line.push('\n');
    line
}

fn push_text(line: &mut String, text: &str) {
    if needs_quoting(text) {
        let _ = write!(line, "{:?}", text);
    } else {
        line.push_str(text);
    }
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || !text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '/' | '@' | '^' | '+'))
}
