// Text import: sends one section's plain text to the extraction collaborator
// and merges the returned fragment into the live document.

pub mod extractor;
pub mod handlers;
pub mod prompts;
