//! Local persistence for topic settings.
//!
//! - [`schema`] opens the SQLite file and creates the table
//! - [`settings`] owns the versioned settings document and its change stream
//! - [`types`] holds topics, the document shapes and error types

mod schema;
mod settings;
mod types;

pub use schema::Database;
pub use settings::SettingsStore;
pub use types::{
    ActiveTopics, SelectionMode, StoreError, Topic, TopicError, TopicSettings, SETTINGS_VERSION,
};
