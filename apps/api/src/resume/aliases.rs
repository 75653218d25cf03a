//! Alias resolution: read and write entry attributes through the schema so
//! every historical name of an attribute stays in agreement.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resume::record::Entry;
use crate::resume::schema::{EntrySchema, FieldKind};

/// Separators that split free text into list items.
pub const LIST_DELIMITERS: &[char] = &['；', ';', '。', '\n'];

/// A resolved attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }

    /// Flattens to one string; list items are joined by newlines.
    pub fn into_text(self) -> String {
        match self {
            FieldValue::Text(s) => s,
            FieldValue::List(items) => items.join("\n"),
        }
    }

    /// Applies the list normalization rule to either form.
    pub fn into_list(self) -> Vec<String> {
        match self {
            FieldValue::Text(s) => normalize_list(&s),
            FieldValue::List(items) => normalize_items(items),
        }
    }

    fn into_json(self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s),
            FieldValue::List(items) => {
                Value::Array(items.into_iter().map(Value::String).collect())
            }
        }
    }
}

/// Splits free text on `LIST_DELIMITERS`, trims, and drops empty pieces.
pub fn normalize_list(text: &str) -> Vec<String> {
    text.split(LIST_DELIMITERS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Trims discrete items and drops the empty ones. Items are never re-split.
pub fn normalize_items<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // Bullet objects from older producers carry their text under `text`.
        Value::Object(map) => map.get("text").and_then(scalar_text),
        Value::Null | Value::Array(_) => None,
    }
}

fn coerce(value: &Value, kind: FieldKind) -> FieldValue {
    match (kind, value) {
        (FieldKind::List, Value::Array(items)) => {
            FieldValue::List(normalize_items(items.iter().filter_map(scalar_text)))
        }
        (FieldKind::List, other) => {
            FieldValue::List(scalar_text(other).map(|s| normalize_list(&s)).unwrap_or_default())
        }
        (FieldKind::Text, Value::Array(items)) => {
            FieldValue::Text(items.iter().filter_map(scalar_text).collect::<Vec<_>>().join("\n"))
        }
        (FieldKind::Text, other) => FieldValue::Text(scalar_text(other).unwrap_or_default()),
    }
}

fn empty(kind: FieldKind) -> FieldValue {
    match kind {
        FieldKind::Text => FieldValue::Text(String::new()),
        FieldKind::List => FieldValue::List(Vec::new()),
    }
}

impl EntrySchema {
    /// Reads an attribute: canonical key first, then aliases in priority order.
    /// The first non-blank value wins; absent attributes read as `""` or `[]`.
    pub fn resolve_field(&self, entry: &Entry, key: &str) -> FieldValue {
        let Some(field) = self.field(key) else {
            // Unknown keys pass through under their own name.
            return match entry.get(key) {
                Some(value @ Value::Array(_)) => coerce(value, FieldKind::List),
                Some(value) => coerce(value, FieldKind::Text),
                None => FieldValue::Text(String::new()),
            };
        };

        field
            .names()
            .filter_map(|name| entry.get(name))
            .map(|value| coerce(value, field.kind))
            .find(|value| !value.is_blank())
            .unwrap_or_else(|| empty(field.kind))
    }

    /// Returns a copy of `entry` with the attribute written under its canonical
    /// key and every registered alias.
    pub fn write_field(&self, entry: &Entry, key: &str, value: FieldValue) -> Entry {
        let mut next = entry.clone();
        let Some(field) = self.field(key) else {
            next.insert(key, value.into_json());
            return next;
        };

        let stored = match field.kind {
            FieldKind::Text => Value::String(value.into_text()),
            FieldKind::List => FieldValue::List(value.into_list()).into_json(),
        };
        for name in field.names() {
            next.insert(name, stored.clone());
        }
        next
    }

    /// Rewrites an entry from any producer into canonical form: each known
    /// attribute is resolved once and mirrored onto all of its names, missing
    /// attributes get an empty canonical value, unknown keys are kept.
    pub fn canonicalize_entry(&self, entry: &Entry) -> Entry {
        let mut next = entry.clone();
        for field in self.fields {
            if field.names().any(|name| entry.contains_key(name)) {
                let value = self.resolve_field(entry, field.key);
                next = self.write_field(&next, field.key, value);
            } else {
                next.insert(field.key, field.empty_value());
            }
        }
        next
    }
}
