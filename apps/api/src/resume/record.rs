//! The canonical resume record and the section table it is organized by.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::resume::schema::schema_for;

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

/// Every section a resume can show. Serialized under its canonical record key,
/// so `Experience` travels as `"internships"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionType {
    Contact,
    Objective,
    Education,
    #[serde(rename = "internships", alias = "experience")]
    Experience,
    Projects,
    OpenSource,
    Skills,
    Awards,
    Summary,
}

/// How a section's data is held inside the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionShape {
    /// Single object (contact).
    Object,
    /// Free text (objective, summary).
    Text,
    /// Array of entries.
    Entries,
}

struct SectionInfo {
    section: SectionType,
    ui_id: &'static str,
    key: &'static str,
    default_title: &'static str,
    shape: SectionShape,
}

/// UI id, canonical record key, built-in title and shape of each section.
/// Row order is the default section order.
static SECTION_TABLE: [SectionInfo; 9] = [
    SectionInfo {
        section: SectionType::Contact,
        ui_id: "contact",
        key: "contact",
        default_title: "联系方式",
        shape: SectionShape::Object,
    },
    SectionInfo {
        section: SectionType::Objective,
        ui_id: "objective",
        key: "objective",
        default_title: "求职意向",
        shape: SectionShape::Text,
    },
    SectionInfo {
        section: SectionType::Education,
        ui_id: "education",
        key: "education",
        default_title: "教育经历",
        shape: SectionShape::Entries,
    },
    SectionInfo {
        section: SectionType::Experience,
        ui_id: "experience",
        key: "internships",
        default_title: "实习经历",
        shape: SectionShape::Entries,
    },
    SectionInfo {
        section: SectionType::Projects,
        ui_id: "projects",
        key: "projects",
        default_title: "项目经历",
        shape: SectionShape::Entries,
    },
    SectionInfo {
        section: SectionType::OpenSource,
        ui_id: "openSource",
        key: "openSource",
        default_title: "开源经历",
        shape: SectionShape::Entries,
    },
    SectionInfo {
        section: SectionType::Skills,
        ui_id: "skills",
        key: "skills",
        default_title: "专业技能",
        shape: SectionShape::Entries,
    },
    SectionInfo {
        section: SectionType::Awards,
        ui_id: "awards",
        key: "awards",
        default_title: "获奖情况",
        shape: SectionShape::Entries,
    },
    SectionInfo {
        section: SectionType::Summary,
        ui_id: "summary",
        key: "summary",
        default_title: "个人总结",
        shape: SectionShape::Text,
    },
];

impl SectionType {
    pub const ALL: [SectionType; 9] = [
        SectionType::Contact,
        SectionType::Objective,
        SectionType::Education,
        SectionType::Experience,
        SectionType::Projects,
        SectionType::OpenSource,
        SectionType::Skills,
        SectionType::Awards,
        SectionType::Summary,
    ];

    fn info(self) -> &'static SectionInfo {
        let row = match self {
            SectionType::Contact => 0,
            SectionType::Objective => 1,
            SectionType::Education => 2,
            SectionType::Experience => 3,
            SectionType::Projects => 4,
            SectionType::OpenSource => 5,
            SectionType::Skills => 6,
            SectionType::Awards => 7,
            SectionType::Summary => 8,
        };
        &SECTION_TABLE[row]
    }

    /// Id used by the section list UI. Stable across reorders.
    pub fn ui_id(self) -> &'static str {
        self.info().ui_id
    }

    /// Top-level key of this section in the persisted record.
    pub fn key(self) -> &'static str {
        self.info().key
    }

    pub fn default_title(self) -> &'static str {
        self.info().default_title
    }

    pub fn shape(self) -> SectionShape {
        self.info().shape
    }

    /// Accepts either the UI id or the canonical record key.
    pub fn from_key(key: &str) -> Option<SectionType> {
        SECTION_TABLE
            .iter()
            .find(|info| info.key == key || info.ui_id == key)
            .map(|info| info.section)
    }

    /// Sections that take part in ordering, in default order.
    pub fn orderable() -> impl Iterator<Item = SectionType> {
        SectionType::ALL
            .into_iter()
            .filter(|s| *s != SectionType::Contact)
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Dedupes an order, drops contact, and appends any missing section in default order.
pub fn normalize_section_order(order: &[SectionType]) -> Vec<SectionType> {
    let mut normalized: Vec<SectionType> = Vec::with_capacity(SectionType::ALL.len() - 1);
    for section in order {
        if *section != SectionType::Contact && !normalized.contains(section) {
            normalized.push(*section);
        }
    }
    for section in SectionType::orderable() {
        if !normalized.contains(&section) {
            normalized.push(section);
        }
    }
    normalized
}

// ────────────────────────────────────────────────────────────────────────────
// Entries and contact
// ────────────────────────────────────────────────────────────────────────────

/// One item of an array section. Kept as a loose JSON object because producers
/// disagree on attribute names; `EntrySchema` reconciles them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry(Map<String, Value>);

impl Entry {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True when at least one attribute holds non-blank data.
    pub fn has_content(&self) -> bool {
        self.0.values().any(value_has_content)
    }
}

impl From<Map<String, Value>> for Entry {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

pub(crate) fn value_has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => items.iter().any(value_has_content),
        Value::Object(map) => map.values().any(value_has_content),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Record
// ────────────────────────────────────────────────────────────────────────────

/// The single authoritative resume shape. Mutations always produce a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResumeRecord {
    pub name: String,
    pub contact: Contact,
    pub objective: Option<String>,
    pub education: Vec<Entry>,
    pub internships: Vec<Entry>,
    pub projects: Vec<Entry>,
    pub open_source: Vec<Entry>,
    pub skills: Vec<Entry>,
    pub awards: Vec<Entry>,
    pub summary: Option<String>,
    /// Sparse: only titles that differ from the built-in default.
    pub section_titles: BTreeMap<SectionType, String>,
    #[serde(deserialize_with = "lenient_section_order")]
    pub section_order: Vec<SectionType>,
}

impl Default for ResumeRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            contact: Contact::default(),
            objective: None,
            education: Vec::new(),
            internships: Vec::new(),
            projects: Vec::new(),
            open_source: Vec::new(),
            skills: Vec::new(),
            awards: Vec::new(),
            summary: None,
            section_titles: BTreeMap::new(),
            section_order: SectionType::orderable().collect(),
        }
    }
}

impl ResumeRecord {
    /// The document a user starts from: one blank entry per array section.
    pub fn template() -> Self {
        let mut record = Self::default();
        for section in SectionType::orderable() {
            if let (Some(schema), Some(entries)) = (schema_for(section), record.entries_mut(section))
            {
                entries.push(schema.blank_entry());
            }
        }
        record
    }

    /// Parses a stored or imported record and restores the section-order invariant.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut record: ResumeRecord = serde_json::from_value(value)?;
        record.section_order = normalize_section_order(&record.section_order);
        record
            .section_titles
            .retain(|section, title| title.as_str() != section.default_title());
        Ok(record)
    }

    pub fn entries(&self, section: SectionType) -> Option<&Vec<Entry>> {
        match section {
            SectionType::Education => Some(&self.education),
            SectionType::Experience => Some(&self.internships),
            SectionType::Projects => Some(&self.projects),
            SectionType::OpenSource => Some(&self.open_source),
            SectionType::Skills => Some(&self.skills),
            SectionType::Awards => Some(&self.awards),
            SectionType::Contact | SectionType::Objective | SectionType::Summary => None,
        }
    }

    pub fn entries_mut(&mut self, section: SectionType) -> Option<&mut Vec<Entry>> {
        match section {
            SectionType::Education => Some(&mut self.education),
            SectionType::Experience => Some(&mut self.internships),
            SectionType::Projects => Some(&mut self.projects),
            SectionType::OpenSource => Some(&mut self.open_source),
            SectionType::Skills => Some(&mut self.skills),
            SectionType::Awards => Some(&mut self.awards),
            SectionType::Contact | SectionType::Objective | SectionType::Summary => None,
        }
    }

    pub fn text_mut(&mut self, section: SectionType) -> Option<&mut Option<String>> {
        match section {
            SectionType::Objective => Some(&mut self.objective),
            SectionType::Summary => Some(&mut self.summary),
            _ => None,
        }
    }
}

/// Drops section names this build does not know instead of rejecting the record.
fn lenient_section_order<'de, D>(deserializer: D) -> Result<Vec<SectionType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .filter_map(|v| v.as_str().and_then(SectionType::from_key))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_section_reads_its_own_row() {
        for section in SectionType::ALL {
            assert_eq!(section.info().section, section);
            assert_eq!(SectionType::from_key(section.key()), Some(section));
            assert_eq!(SectionType::from_key(section.ui_id()), Some(section));
        }
    }

    #[test]
    fn test_experience_serializes_as_internships() {
        let value = serde_json::to_value(SectionType::Experience).unwrap();
        assert_eq!(value, json!("internships"));
        let parsed: SectionType = serde_json::from_value(json!("experience")).unwrap();
        assert_eq!(parsed, SectionType::Experience);
    }

    #[test]
    fn test_record_has_fixed_top_level_keys() {
        let value = serde_json::to_value(ResumeRecord::template()).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        for key in [
            "name",
            "contact",
            "objective",
            "education",
            "internships",
            "projects",
            "openSource",
            "skills",
            "awards",
            "summary",
            "sectionTitles",
            "sectionOrder",
        ] {
            assert!(keys.contains(&key), "missing top-level key {key}");
        }
        assert_eq!(keys.len(), 12);
    }

    #[test]
    fn test_default_order_excludes_contact() {
        let record = ResumeRecord::default();
        assert_eq!(record.section_order.len(), 8);
        assert!(!record.section_order.contains(&SectionType::Contact));
    }

    #[test]
    fn test_normalize_dedupes_and_fills_missing() {
        let order = normalize_section_order(&[
            SectionType::Skills,
            SectionType::Contact,
            SectionType::Skills,
            SectionType::Education,
        ]);
        assert_eq!(order[0], SectionType::Skills);
        assert_eq!(order[1], SectionType::Education);
        assert_eq!(order.len(), 8);
        for section in SectionType::orderable() {
            assert_eq!(order.iter().filter(|s| **s == section).count(), 1);
        }
    }

    #[test]
    fn test_from_value_is_lenient() {
        let record = ResumeRecord::from_value(json!({
            "name": "张三",
            "sectionOrder": ["skills", "bogus", "experience"],
            "sectionTitles": { "skills": "专业技能", "education": "学历" },
            "unknownKey": 42
        }))
        .unwrap();
        assert_eq!(record.name, "张三");
        assert_eq!(record.section_order[0], SectionType::Skills);
        assert_eq!(record.section_order[1], SectionType::Experience);
        assert_eq!(record.section_order.len(), 8);
        assert!(!record.section_titles.contains_key(&SectionType::Skills));
        assert_eq!(
            record.section_titles.get(&SectionType::Education).map(String::as_str),
            Some("学历")
        );
    }

    #[test]
    fn test_template_has_one_blank_entry_per_array_section() {
        let record = ResumeRecord::template();
        for section in SectionType::orderable() {
            if let Some(entries) = record.entries(section) {
                assert_eq!(entries.len(), 1);
                assert!(!entries[0].has_content());
            }
        }
    }

    #[test]
    fn test_has_content_ignores_whitespace_and_empty_lists() {
        let entry: Entry = serde_json::from_value(json!({
            "category": "  ",
            "details": ["", " "]
        }))
        .unwrap();
        assert!(!entry.has_content());
        let entry: Entry = serde_json::from_value(json!({ "details": ["Rust"] })).unwrap();
        assert!(entry.has_content());
    }
}
