pub mod aliases;
pub mod document;
pub mod handlers;
pub mod merge;
pub mod patch;
pub mod record;
pub mod schema;
pub mod sections;
pub mod session;
