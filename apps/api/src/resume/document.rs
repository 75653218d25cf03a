//! Versioned resume document and the edit commands that produce new versions.
//!
//! Every command is a pure function from one `ResumeDocument` to the next.
//! The revision only moves when the record actually changed, so no-op edits
//! (out-of-range patches, drags onto the same slot) never reach storage.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::resume::merge::{merge_fragment, MergeError};
use crate::resume::patch::{apply_patch, PatchError, SurfaceText};
use crate::resume::record::{Contact, Entry, ResumeRecord, SectionShape, SectionType};
use crate::resume::schema::schema_for;
use crate::resume::sections::{descriptors, reorder, serialize_order, set_section_title};

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("section '{0}' does not hold entries")]
    NotAnEntrySection(SectionType),

    #[error("invalid {section} data: {source}")]
    InvalidSectionData {
        section: SectionType,
        source: serde_json::Error,
    },
}

/// One edit from any of the three views.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditCommand {
    /// Rich-text surface commit.
    Patch { path: String, text: SurfaceText },
    /// Section list drag.
    Reorder { from: usize, to: usize },
    /// Structured editor commit of a whole section.
    ReplaceSection { section: SectionType, data: Value },
    AddEntry { section: SectionType },
    RemoveEntry { section: SectionType, index: usize },
    RenameSection { section: SectionType, title: String },
    /// Extraction output.
    MergeFragment { section: SectionType, fragment: Value },
    /// Start over from the template.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeDocument {
    pub id: Uuid,
    pub revision: u64,
    pub record: ResumeRecord,
}

impl ResumeDocument {
    pub fn new(id: Uuid, revision: u64, record: ResumeRecord) -> Self {
        Self {
            id,
            revision,
            record,
        }
    }

    /// Applies `command` and returns the next document. On error the current
    /// document is left as it was.
    pub fn apply(&self, command: EditCommand) -> Result<ResumeDocument, EditError> {
        let record = match command {
            EditCommand::Patch { path, text } => apply_patch(&self.record, &path, &text)?,
            EditCommand::Reorder { from, to } => {
                let mut next = self.record.clone();
                next.section_order = serialize_order(&reorder(&descriptors(&next), from, to));
                next
            }
            EditCommand::ReplaceSection { section, data } => {
                replace_section(&self.record, section, data)?
            }
            EditCommand::AddEntry { section } => {
                let schema = schema_for(section).ok_or(EditError::NotAnEntrySection(section))?;
                let mut next = self.record.clone();
                if let Some(entries) = next.entries_mut(section) {
                    entries.push(schema.blank_entry());
                }
                next
            }
            EditCommand::RemoveEntry { section, index } => {
                let mut next = self.record.clone();
                let entries = next
                    .entries_mut(section)
                    .ok_or(EditError::NotAnEntrySection(section))?;
                if index < entries.len() {
                    entries.remove(index);
                }
                next
            }
            EditCommand::RenameSection { section, title } => {
                let mut next = self.record.clone();
                next.section_titles = set_section_title(&next.section_titles, section, &title);
                next
            }
            EditCommand::MergeFragment { section, fragment } => {
                merge_fragment(&self.record, section, &fragment)?
            }
            EditCommand::Reset => ResumeRecord::template(),
        };

        if record == self.record {
            return Ok(self.clone());
        }
        Ok(ResumeDocument {
            id: self.id,
            revision: self.revision + 1,
            record,
        })
    }
}

/// The structured editor already sends typed section data; entries are still
/// canonicalized so every alias stays in step.
fn replace_section(
    record: &ResumeRecord,
    section: SectionType,
    data: Value,
) -> Result<ResumeRecord, EditError> {
    let invalid = |source| EditError::InvalidSectionData { section, source };
    let mut next = record.clone();
    match section.shape() {
        SectionShape::Object => {
            next.contact = serde_json::from_value::<Contact>(data).map_err(invalid)?;
        }
        SectionShape::Text => {
            let text: Option<String> = serde_json::from_value(data).map_err(invalid)?;
            if let Some(slot) = next.text_mut(section) {
                *slot = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
            }
        }
        SectionShape::Entries => {
            let entries: Vec<Entry> = serde_json::from_value(data).map_err(invalid)?;
            let schema = schema_for(section).ok_or(EditError::NotAnEntrySection(section))?;
            if let Some(slot) = next.entries_mut(section) {
                *slot = entries.iter().map(|e| schema.canonicalize_entry(e)).collect();
            }
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> ResumeDocument {
        ResumeDocument::new(Uuid::new_v4(), 0, ResumeRecord::template())
    }

    #[test]
    fn test_effective_edit_bumps_revision() {
        let doc = document();
        let next = doc
            .apply(EditCommand::Patch {
                path: "name".into(),
                text: "张三".into(),
            })
            .unwrap();
        assert_eq!(next.revision, 1);
        assert_eq!(next.record.name, "张三");
        assert_eq!(doc.record.name, "");
    }

    #[test]
    fn test_no_op_edit_keeps_revision() {
        let doc = document();
        let next = doc
            .apply(EditCommand::Patch {
                path: "projects.9.title".into(),
                text: "x".into(),
            })
            .unwrap();
        assert_eq!(next, doc);
        let next = doc.apply(EditCommand::Reorder { from: 2, to: 2 }).unwrap();
        assert_eq!(next.revision, 0);
    }

    #[test]
    fn test_reorder_updates_section_order() {
        let doc = document();
        let next = doc.apply(EditCommand::Reorder { from: 2, to: 0 }).unwrap();
        assert_eq!(next.record.section_order[0], doc.record.section_order[2]);
        assert_eq!(next.record.section_order[1], doc.record.section_order[0]);
        assert_eq!(next.revision, 1);
    }

    #[test]
    fn test_add_and_remove_entries() {
        let doc = document();
        let next = doc
            .apply(EditCommand::AddEntry {
                section: SectionType::Awards,
            })
            .unwrap();
        assert_eq!(next.record.awards.len(), 2);
        let next = next
            .apply(EditCommand::RemoveEntry {
                section: SectionType::Awards,
                index: 0,
            })
            .unwrap();
        assert_eq!(next.record.awards.len(), 1);
        let same = next
            .apply(EditCommand::RemoveEntry {
                section: SectionType::Awards,
                index: 5,
            })
            .unwrap();
        assert_eq!(same.revision, next.revision);
        assert!(matches!(
            doc.apply(EditCommand::AddEntry {
                section: SectionType::Summary
            }),
            Err(EditError::NotAnEntrySection(SectionType::Summary))
        ));
    }

    #[test]
    fn test_replace_section_canonicalizes_entries() {
        let doc = document();
        let next = doc
            .apply(EditCommand::ReplaceSection {
                section: SectionType::Experience,
                data: json!([{ "company": "网易", "position": "前端实习生", "highlights": "组件库；埋点" }]),
            })
            .unwrap();
        let entry = &next.record.internships[0];
        assert_eq!(entry.get("role"), Some(&json!("前端实习生")));
        assert_eq!(entry.get("details"), Some(&json!(["组件库", "埋点"])));
    }

    #[test]
    fn test_replace_section_rejects_wrong_shape() {
        let doc = document();
        let err = doc
            .apply(EditCommand::ReplaceSection {
                section: SectionType::Education,
                data: json!("北京大学"),
            })
            .unwrap_err();
        assert!(matches!(err, EditError::InvalidSectionData { .. }));
    }

    #[test]
    fn test_rename_section_is_sparse() {
        let doc = document();
        let next = doc
            .apply(EditCommand::RenameSection {
                section: SectionType::Projects,
                title: "作品".into(),
            })
            .unwrap();
        assert_eq!(next.record.section_titles.len(), 1);
        let back = next
            .apply(EditCommand::RenameSection {
                section: SectionType::Projects,
                title: "项目经历".into(),
            })
            .unwrap();
        assert!(back.record.section_titles.is_empty());
    }

    #[test]
    fn test_failed_merge_leaves_document_untouched() {
        let doc = document();
        let err = doc.apply(EditCommand::MergeFragment {
            section: SectionType::Education,
            fragment: json!(42),
        });
        assert!(matches!(err, Err(EditError::Merge(_))));
        assert_eq!(doc.revision, 0);
    }

    #[test]
    fn test_reset_supersedes_record() {
        let doc = document()
            .apply(EditCommand::Patch {
                path: "name".into(),
                text: "张三".into(),
            })
            .unwrap();
        let reset = doc.apply(EditCommand::Reset).unwrap();
        assert_eq!(reset.record, ResumeRecord::template());
        assert_eq!(reset.revision, 2);
    }

    #[test]
    fn test_commands_deserialize_from_tagged_json() {
        let command: EditCommand = serde_json::from_value(json!({
            "kind": "patch",
            "path": "internships.0.details",
            "text": ["一", "二"]
        }))
        .unwrap();
        assert!(matches!(
            command,
            EditCommand::Patch {
                text: SurfaceText::Items(_),
                ..
            }
        ));
        let command: EditCommand =
            serde_json::from_value(json!({ "kind": "add_entry", "section": "experience" })).unwrap();
        assert!(matches!(
            command,
            EditCommand::AddEntry {
                section: SectionType::Experience
            }
        ));
    }
}
