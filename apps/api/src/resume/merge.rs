//! Folding extraction output into the record without losing what is there.
//!
//! Extraction responses have no enforced schema. Anything that does not fit
//! the target section's shape is rejected as a whole before the record is
//! touched.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::resume::record::{Contact, Entry, ResumeRecord, SectionShape, SectionType};
use crate::resume::schema::{schema_for, CONTACT_FIELDS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("{section} fragment must be {expected}, got {found}")]
    Shape {
        section: SectionType,
        expected: &'static str,
        found: &'static str,
    },

    #[error("item {index} of the {section} fragment is {found}, expected an object")]
    EntryShape {
        section: SectionType,
        index: usize,
        found: &'static str,
    },
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Replaces `existing` wholesale when none of its entries hold data,
/// otherwise appends `incoming` after it. Existing entries are never dropped
/// or reordered.
pub fn merge_import_fragment(existing: &[Entry], incoming: &[Entry]) -> Vec<Entry> {
    if existing.iter().any(Entry::has_content) {
        existing.iter().chain(incoming).cloned().collect()
    } else {
        incoming.to_vec()
    }
}

/// Merges one extraction fragment for `section` into a copy of `record`.
pub fn merge_fragment(
    record: &ResumeRecord,
    section: SectionType,
    fragment: &Value,
) -> Result<ResumeRecord, MergeError> {
    let fragment = unwrap_section_key(section, fragment);
    let mut next = record.clone();
    match section.shape() {
        SectionShape::Object => {
            let Value::Object(map) = fragment else {
                return Err(shape_error(section, "an object", fragment));
            };
            merge_contact(&mut next, map);
        }
        SectionShape::Text => {
            let incoming = match fragment {
                Value::String(s) => s.trim().to_string(),
                Value::Array(items) if items.iter().all(Value::is_string) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n"),
                Value::Null => String::new(),
                other => return Err(shape_error(section, "a string", other)),
            };
            if let Some(slot) = next.text_mut(section) {
                *slot = merge_text(slot.as_deref(), &incoming);
            }
        }
        SectionShape::Entries => {
            let incoming = parse_entries(section, fragment)?;
            if let Some(entries) = next.entries_mut(section) {
                let before = entries.len();
                *entries = merge_import_fragment(entries, &incoming);
                debug!(
                    "Merged {} {section} entries into {before} existing, now {}",
                    incoming.len(),
                    entries.len()
                );
            }
        }
    }
    Ok(next)
}

fn shape_error(section: SectionType, expected: &'static str, found: &Value) -> MergeError {
    MergeError::Shape {
        section,
        expected,
        found: kind_of(found),
    }
}

/// Extractors often answer `{"skills": [...]}` instead of the bare array.
/// Some section keys double as field aliases (`education` for a degree,
/// `skills` for a skill list), so when the key is also a field name the
/// wrapper is only peeled off if the inner value holds entries.
fn unwrap_section_key<'a>(section: SectionType, fragment: &'a Value) -> &'a Value {
    let Value::Object(map) = fragment else {
        return fragment;
    };
    if map.len() != 1 {
        return fragment;
    }
    let Some((key, inner)) = map.iter().next() else {
        return fragment;
    };
    if SectionType::from_key(key) != Some(section) {
        return fragment;
    }

    let is_field = schema_for(section).is_some_and(|schema| schema.canonical_key(key).is_some());
    let holds_entries = match inner {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().all(Value::is_object),
        _ => false,
    };
    if is_field && !holds_entries {
        fragment
    } else {
        inner
    }
}

fn parse_entries(section: SectionType, fragment: &Value) -> Result<Vec<Entry>, MergeError> {
    let items: Vec<&Value> = match fragment {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![fragment],
        Value::Null => Vec::new(),
        other => return Err(shape_error(section, "an array", other)),
    };

    let Some(schema) = schema_for(section) else {
        return Ok(Vec::new());
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(MergeError::EntryShape {
                section,
                index,
                found: kind_of(item),
            });
        };
        let entry = schema.canonicalize_entry(&Entry::from(map.clone()));
        if entry.has_content() {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn contact_value<'a>(map: &'a Map<String, Value>, key: &str, aliases: &[&str]) -> Option<&'a str> {
    std::iter::once(key)
        .chain(aliases.iter().copied())
        .filter_map(|name| map.get(name).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Fills only the contact fields (and name) that are still blank.
fn merge_contact(record: &mut ResumeRecord, map: &Map<String, Value>) {
    if record.name.trim().is_empty() {
        if let Some(name) = contact_value(map, "name", &["fullName"]) {
            record.name = name.to_string();
        }
    }

    let Contact {
        phone,
        email,
        location,
    } = &mut record.contact;
    for (key, aliases) in CONTACT_FIELDS {
        let slot = match *key {
            "phone" => &mut *phone,
            "email" => &mut *email,
            _ => &mut *location,
        };
        if slot.as_deref().map_or(true, |s| s.trim().is_empty()) {
            if let Some(value) = contact_value(map, key, aliases) {
                *slot = Some(value.to_string());
            }
        }
    }
}

/// Sets blank text, otherwise appends on a new line unless already present.
fn merge_text(existing: Option<&str>, incoming: &str) -> Option<String> {
    let existing = existing.map(str::trim).unwrap_or_default();
    match (existing.is_empty(), incoming.is_empty()) {
        (_, true) if existing.is_empty() => None,
        (_, true) => Some(existing.to_string()),
        (true, false) => Some(incoming.to_string()),
        (false, false) if existing.contains(incoming) => Some(existing.to_string()),
        (false, false) => Some(format!("{existing}\n{incoming}")),
    }
}
