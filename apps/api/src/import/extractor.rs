//! Section extractor: pluggable text-to-JSON collaborator.
//!
//! Default: `LlmSectionExtractor`, which asks the LLM client for one section's
//! fragment. `AppState` holds an `Arc<dyn SectionExtractor>` so tests can swap
//! in a scripted one.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use crate::import::prompts::{SECTION_EXTRACT_PROMPT, SECTION_EXTRACT_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::resume::document::EditError;
use crate::resume::record::{SectionShape, SectionType};
use crate::resume::schema::{schema_for, CONTACT_FIELDS};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Extraction failed: {0}")]
    Extract(#[from] LlmError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

#[async_trait]
pub trait SectionExtractor: Send + Sync {
    /// Returns the raw JSON fragment for `section`. No shape is guaranteed.
    async fn extract(&self, section: SectionType, text: &str) -> Result<Value, LlmError>;
}

pub struct LlmSectionExtractor {
    llm: LlmClient,
}

impl LlmSectionExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SectionExtractor for LlmSectionExtractor {
    async fn extract(&self, section: SectionType, text: &str) -> Result<Value, LlmError> {
        let prompt = build_prompt(section, text);
        info!("Extracting {section} fragment from {} chars", text.chars().count());
        self.llm.complete_json(&prompt, SECTION_EXTRACT_SYSTEM).await
    }
}

/// The JSON shape the extractor is asked to produce for `section`.
pub fn expected_shape(section: SectionType) -> Value {
    match section.shape() {
        SectionShape::Object => {
            let mut contact = serde_json::Map::new();
            contact.insert("name".into(), json!(""));
            for (key, _) in CONTACT_FIELDS {
                contact.insert((*key).into(), json!(""));
            }
            Value::Object(contact)
        }
        SectionShape::Text => json!("string"),
        SectionShape::Entries => schema_for(section)
            .map(|schema| schema.example())
            .unwrap_or_else(|| json!([])),
    }
}

fn build_prompt(section: SectionType, text: &str) -> String {
    let shape = serde_json::to_string_pretty(&expected_shape(section)).unwrap_or_default();
    SECTION_EXTRACT_PROMPT
        .replace("{section}", section.key())
        .replace("{title}", section.default_title())
        .replace("{shape}", &shape)
        .replace("{raw_text}", text)
}
