//! Per-section entry schemas: the static alias table.
//!
//! Each array section carries its own attribute list. Every attribute has one
//! canonical key and the legacy names earlier producers used for it, in the
//! priority order readers should try them.

use serde_json::Value;

use crate::resume::record::{Entry, SectionType};

/// Whether an attribute holds a single line of text or an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    List,
}

#[derive(Debug)]
pub struct FieldSpec {
    pub key: &'static str,
    pub aliases: &'static [&'static str],
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn text(key: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            key,
            aliases,
            kind: FieldKind::Text,
        }
    }

    const fn list(key: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            key,
            aliases,
            kind: FieldKind::List,
        }
    }

    /// Canonical key followed by aliases, in read priority order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.key).chain(self.aliases.iter().copied())
    }

    pub fn empty_value(&self) -> Value {
        match self.kind {
            FieldKind::Text => Value::String(String::new()),
            FieldKind::List => Value::Array(Vec::new()),
        }
    }
}

#[derive(Debug)]
pub struct EntrySchema {
    pub section: SectionType,
    pub fields: &'static [FieldSpec],
    /// Attributes packed into the displayed heading line, in display order.
    pub title_line: &'static [&'static str],
}

const DATE_ALIASES: &[&str] = &["period", "duration", "time"];

static EDUCATION: EntrySchema = EntrySchema {
    section: SectionType::Education,
    fields: &[
        FieldSpec::text("school", &["institution", "university", "college"]),
        FieldSpec::text("degree", &["education", "level"]),
        FieldSpec::text("major", &["field", "fieldOfStudy"]),
        FieldSpec::text("date", DATE_ALIASES),
        FieldSpec::list("details", &["highlights", "description", "courses"]),
    ],
    title_line: &["school", "degree", "major"],
};

static EXPERIENCE: EntrySchema = EntrySchema {
    section: SectionType::Experience,
    fields: &[
        FieldSpec::text("company", &["organization", "employer"]),
        FieldSpec::text("role", &["position", "title", "jobTitle"]),
        FieldSpec::text("date", DATE_ALIASES),
        FieldSpec::list(
            "details",
            &["highlights", "description", "bullets", "responsibilities"],
        ),
    ],
    title_line: &["company", "role"],
};

static PROJECTS: EntrySchema = EntrySchema {
    section: SectionType::Projects,
    fields: &[
        FieldSpec::text("title", &["name", "projectName"]),
        FieldSpec::text("role", &["position"]),
        FieldSpec::text("date", DATE_ALIASES),
        FieldSpec::text("repoUrl", &["link", "url", "repo"]),
        FieldSpec::list("details", &["highlights", "description", "bullets"]),
    ],
    title_line: &["title", "role"],
};

static OPEN_SOURCE: EntrySchema = EntrySchema {
    section: SectionType::OpenSource,
    fields: &[
        FieldSpec::text("title", &["name", "projectName", "repo"]),
        FieldSpec::text("role", &["position", "contribution"]),
        FieldSpec::text("repoUrl", &["link", "url", "repository"]),
        FieldSpec::text("date", DATE_ALIASES),
        FieldSpec::list("details", &["highlights", "description", "bullets"]),
    ],
    title_line: &["title", "role"],
};

static SKILLS: EntrySchema = EntrySchema {
    section: SectionType::Skills,
    fields: &[
        FieldSpec::text("category", &["type", "group", "name"]),
        FieldSpec::list("details", &["items", "skills", "description"]),
    ],
    title_line: &["category", "details"],
};

static AWARDS: EntrySchema = EntrySchema {
    section: SectionType::Awards,
    fields: &[
        FieldSpec::text("title", &["name", "award"]),
        FieldSpec::text("issuer", &["organization", "organizer"]),
        FieldSpec::text("date", &["period", "time"]),
        FieldSpec::list("details", &["highlights", "description"]),
    ],
    title_line: &["title", "issuer"],
};

/// Contact attributes and the names extraction output tends to use for them.
pub const CONTACT_FIELDS: &[(&str, &[&str])] = &[
    ("phone", &["tel", "mobile", "phoneNumber"]),
    ("email", &["mail", "emailAddress"]),
    ("location", &["city", "address"]),
];

/// Schema of an array section. `None` for contact and the text sections.
pub fn schema_for(section: SectionType) -> Option<&'static EntrySchema> {
    match section {
        SectionType::Education => Some(&EDUCATION),
        SectionType::Experience => Some(&EXPERIENCE),
        SectionType::Projects => Some(&PROJECTS),
        SectionType::OpenSource => Some(&OPEN_SOURCE),
        SectionType::Skills => Some(&SKILLS),
        SectionType::Awards => Some(&AWARDS),
        SectionType::Contact | SectionType::Objective | SectionType::Summary => None,
    }
}

impl EntrySchema {
    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Maps a canonical or alias name to its canonical key.
    pub fn canonical_key(&self, name: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.names().any(|n| n == name))
            .map(|f| f.key)
    }

    /// An entry with every canonical key present and empty.
    pub fn blank_entry(&self) -> Entry {
        let mut entry = Entry::new();
        for field in self.fields {
            entry.insert(field.key, field.empty_value());
        }
        entry
    }

    /// JSON example of one entry, used to tell the extractor what to return.
    pub fn example(&self) -> Value {
        Value::Array(vec![serde_json::to_value(self.blank_entry()).unwrap_or_default()])
    }
}
