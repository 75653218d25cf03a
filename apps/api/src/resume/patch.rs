//! Path patches: one localized edit from the rich-text surface, addressed by a
//! dot-path, applied onto a copy of the canonical record.
//!
//! Grammar:
//!
//! ```text
//! path      = topLevel | "contact" "." contactField | section "." index "." attribute
//! topLevel  = "name" | "objective" | "summary"
//! attribute = <canonical or alias name> | "titleLine"
//! ```
//!
//! An index past the end of its array is not an error: the entry was most
//! likely removed between render and blur, so the patch is dropped.

use std::num::IntErrorKind;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::resume::aliases::{normalize_items, FieldValue};
use crate::resume::record::{Entry, ResumeRecord, SectionShape, SectionType};
use crate::resume::schema::{schema_for, EntrySchema, FieldKind};

/// Composite attribute naming the heading line of an entry.
pub const TITLE_LINE: &str = "titleLine";
/// Joins the attributes packed into a heading line.
pub const TITLE_LINE_DELIMITER: &str = " - ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("empty field path")]
    Empty,

    #[error("unknown field path '{0}'")]
    UnknownPath(String),

    #[error("section '{0}' is not an entry list")]
    NotAnEntrySection(String),

    #[error("index '{0}' is not a base-10 integer")]
    InvalidIndex(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevelField {
    Name,
    Objective,
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Phone,
    Email,
    Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Field(String),
    TitleLine,
}

/// A parsed field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    TopLevel(TopLevelField),
    Contact(ContactField),
    Entry {
        section: SectionType,
        /// Signed so that negative indices land in the out-of-range no-op.
        index: i64,
        attribute: Attribute,
    },
}

impl FromStr for FieldPath {
    type Err = PatchError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let path = path.trim();
        if path.is_empty() {
            return Err(PatchError::Empty);
        }
        let segments: Vec<&str> = path.split('.').collect();
        match segments.as_slice() {
            ["name"] => Ok(FieldPath::TopLevel(TopLevelField::Name)),
            ["objective"] => Ok(FieldPath::TopLevel(TopLevelField::Objective)),
            ["summary"] => Ok(FieldPath::TopLevel(TopLevelField::Summary)),
            ["contact", field] => match *field {
                "phone" => Ok(FieldPath::Contact(ContactField::Phone)),
                "email" => Ok(FieldPath::Contact(ContactField::Email)),
                "location" => Ok(FieldPath::Contact(ContactField::Location)),
                _ => Err(PatchError::UnknownPath(path.to_string())),
            },
            [section, index, attribute] => {
                let section = SectionType::from_key(section)
                    .ok_or_else(|| PatchError::UnknownPath(path.to_string()))?;
                if section.shape() != SectionShape::Entries {
                    return Err(PatchError::NotAnEntrySection(section.key().to_string()));
                }
                let index = parse_index(index)?;
                let attribute = match *attribute {
                    "" => return Err(PatchError::UnknownPath(path.to_string())),
                    TITLE_LINE => Attribute::TitleLine,
                    name => Attribute::Field(name.to_string()),
                };
                Ok(FieldPath::Entry {
                    section,
                    index,
                    attribute,
                })
            }
            _ => Err(PatchError::UnknownPath(path.to_string())),
        }
    }
}

/// Parses a base-10 index segment: an optional `-` followed by digits only.
/// Values too large for `i64` saturate, which keeps them out of range.
fn parse_index(segment: &str) -> Result<i64, PatchError> {
    let digits = segment.strip_prefix('-').unwrap_or(segment);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PatchError::InvalidIndex(segment.to_string()));
    }
    segment.parse::<i64>().or_else(|e| match e.kind() {
        IntErrorKind::PosOverflow => Ok(i64::MAX),
        IntErrorKind::NegOverflow => Ok(i64::MIN),
        _ => Err(PatchError::InvalidIndex(segment.to_string())),
    })
}

/// What the rich-text surface hands back on commit: plain text, or the
/// discrete items of a bulleted list that survived the edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SurfaceText {
    Plain(String),
    Items(Vec<String>),
}

impl SurfaceText {
    fn plain(&self) -> String {
        match self {
            SurfaceText::Plain(s) => s.trim().to_string(),
            SurfaceText::Items(items) => normalize_items(items).join("\n"),
        }
    }

    fn for_kind(&self, kind: FieldKind) -> FieldValue {
        match (kind, self) {
            (FieldKind::List, SurfaceText::Items(items)) => {
                FieldValue::List(normalize_items(items))
            }
            (FieldKind::List, SurfaceText::Plain(text)) => FieldValue::Text(text.clone()),
            (FieldKind::Text, _) => FieldValue::Text(self.plain()),
        }
    }
}

impl From<&str> for SurfaceText {
    fn from(text: &str) -> Self {
        SurfaceText::Plain(text.to_string())
    }
}

/// Parses `path` and applies the edit to a copy of `record`.
pub fn apply_patch(
    record: &ResumeRecord,
    path: &str,
    text: &SurfaceText,
) -> Result<ResumeRecord, PatchError> {
    let path: FieldPath = path.parse()?;
    Ok(apply_field_patch(record, &path, text))
}

/// Applies an already parsed path. Never fails: an out-of-range index
/// returns the record unchanged.
pub fn apply_field_patch(record: &ResumeRecord, path: &FieldPath, text: &SurfaceText) -> ResumeRecord {
    let mut next = record.clone();
    match path {
        FieldPath::TopLevel(TopLevelField::Name) => next.name = text.plain(),
        FieldPath::TopLevel(TopLevelField::Objective) => next.objective = non_empty(text.plain()),
        FieldPath::TopLevel(TopLevelField::Summary) => next.summary = non_empty(text.plain()),
        FieldPath::Contact(field) => {
            let value = non_empty(text.plain());
            match field {
                ContactField::Phone => next.contact.phone = value,
                ContactField::Email => next.contact.email = value,
                ContactField::Location => next.contact.location = value,
            }
        }
        FieldPath::Entry {
            section,
            index,
            attribute,
        } => {
            let (Some(schema), Some(entries)) = (schema_for(*section), next.entries_mut(*section))
            else {
                return record.clone();
            };
            let len = entries.len();
            let Some(entry) = usize::try_from(*index)
                .ok()
                .and_then(|i| entries.get_mut(i))
            else {
                debug!("Dropping patch for {section}.{index}: {len} entries present");
                return record.clone();
            };
            *entry = match attribute {
                Attribute::TitleLine => write_title_line(schema, entry, &text.plain()),
                Attribute::Field(name) => {
                    let key = schema.canonical_key(name).unwrap_or(name.as_str());
                    let kind = schema.field(key).map_or(FieldKind::Text, |f| f.kind);
                    schema.write_field(entry, key, text.for_kind(kind))
                }
            };
        }
    }
    next
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn write_title_line(schema: &EntrySchema, entry: &Entry, line: &str) -> Entry {
    let parts = split_title_line(line, schema.title_line.len());
    let mut next = entry.clone();
    for (key, part) in schema.title_line.iter().zip(parts) {
        next = schema.write_field(&next, key, FieldValue::Text(part));
    }
    next
}

/// Splits a heading line into at most `slots` parts. Each split happens at the
/// first remaining `" - "`; the last slot keeps whatever is left. Slots with no
/// corresponding text are not returned, so their attributes stay untouched.
pub fn split_title_line(line: &str, slots: usize) -> Vec<String> {
    let mut parts = Vec::with_capacity(slots);
    let mut rest = line.trim();
    while parts.len() < slots {
        if parts.len() + 1 == slots {
            parts.push(rest.trim().to_string());
            break;
        }
        match rest.split_once(TITLE_LINE_DELIMITER) {
            Some((head, tail)) => {
                parts.push(head.trim().to_string());
                rest = strip_separator_remnants(tail);
            }
            None => {
                parts.push(rest.trim().to_string());
                break;
            }
        }
    }
    parts
}

fn strip_separator_remnants(text: &str) -> &str {
    text.trim_start_matches(|c: char| c == '-' || c.is_whitespace())
}
