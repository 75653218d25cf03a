//! The user-visible section list and its mapping onto `sectionOrder`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resume::record::{normalize_section_order, ResumeRecord, SectionType};

/// UI-facing wrapper around one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    /// Stable across reorders.
    pub id: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub title: String,
    pub ordinal: usize,
}

/// Builds the section list shown by the editor: contact pinned first, then
/// the record's order, each with its overridden or default title.
pub fn descriptors(record: &ResumeRecord) -> Vec<SectionDescriptor> {
    std::iter::once(SectionType::Contact)
        .chain(normalize_section_order(&record.section_order))
        .enumerate()
        .map(|(ordinal, section)| SectionDescriptor {
            id: section.ui_id().to_string(),
            section_type: section,
            title: section_title(&record.section_titles, section).to_string(),
            ordinal,
        })
        .collect()
}

pub fn section_title(titles: &BTreeMap<SectionType, String>, section: SectionType) -> &str {
    titles
        .get(&section)
        .map(String::as_str)
        .unwrap_or_else(|| section.default_title())
}

/// Stores a custom title only when it differs from the built-in one. A blank
/// title restores the default.
pub fn set_section_title(
    titles: &BTreeMap<SectionType, String>,
    section: SectionType,
    title: &str,
) -> BTreeMap<SectionType, String> {
    let mut next = titles.clone();
    let title = title.trim();
    if title.is_empty() || title == section.default_title() {
        next.remove(&section);
    } else {
        next.insert(section, title.to_string());
    }
    next
}

/// Moves the movable descriptor at `from` to `to`. Indices count only the
/// non-contact sections; contact is always returned first. An unknown `from`
/// leaves the order as it was, a `to` past the end moves to the last slot.
pub fn reorder(sections: &[SectionDescriptor], from: usize, to: usize) -> Vec<SectionDescriptor> {
    let (pinned, mut movable): (Vec<_>, Vec<_>) = sections
        .iter()
        .cloned()
        .partition(|d| d.section_type == SectionType::Contact);

    if from < movable.len() {
        let to = to.min(movable.len() - 1);
        let moved = movable.remove(from);
        movable.insert(to, moved);
    }

    pinned
        .into_iter()
        .chain(movable)
        .enumerate()
        .map(|(ordinal, descriptor)| SectionDescriptor {
            ordinal,
            ..descriptor
        })
        .collect()
}

/// Translates a UI id (or a canonical key) to its section.
pub fn section_for_id(id: &str) -> Option<SectionType> {
    SectionType::from_key(id)
}

/// The persisted `sectionOrder` for a descriptor list: contact excluded, ids
/// translated to sections, each section exactly once.
pub fn serialize_order(sections: &[SectionDescriptor]) -> Vec<SectionType> {
    let order: Vec<SectionType> = sections
        .iter()
        .map(|d| section_for_id(&d.id).unwrap_or(d.section_type))
        .filter(|section| *section != SectionType::Contact)
        .collect();
    normalize_section_order(&order)
}
