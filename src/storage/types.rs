use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Settings store errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another instance of the application has locked the settings database
    #[error("Another instance of ghtopics appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Settings migration failed: {0}")]
    Migration(String),

    /// The stored settings document could not be decoded
    #[error("Settings document is corrupt: {0}")]
    Corrupt(String),

    /// The stored settings document was written by a newer schema
    #[error("Unsupported settings document version {0}")]
    UnsupportedVersion(i64),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StoreError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StoreError::InstanceLocked;
        }

        StoreError::Other(err)
    }
}

/// Rejections for topic list edits.
#[derive(Debug, Error)]
pub enum TopicError {
    #[error("Topic must not be empty")]
    Empty,

    #[error("Topic '{0}' is already saved")]
    Duplicate(String),

    /// Whitespace or `:` would leak into the search query as extra terms
    #[error("Topic '{0}' must be a single tag without spaces or ':'")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Topics
// ============================================================================

/// A non-empty topic tag used to filter repositories server-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Parse user input into a topic, trimming surrounding whitespace.
    ///
    /// The result is one search term, so interior whitespace and `:` are
    /// rejected.
    pub fn parse(raw: &str) -> Result<Self, TopicError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TopicError::Empty);
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(TopicError::Invalid(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How many topics may drive the feed at once. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Single,
    #[default]
    Multi,
}

/// The tag or tags currently driving the feed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveTopics {
    Single(Topic),
    Multi(Vec<Topic>),
}

impl ActiveTopics {
    /// Build the active value from the persisted list, or `None` when nothing is selected.
    ///
    /// Single mode only ever looks at the first stored tag.
    pub fn from_list(mode: SelectionMode, list: &[Topic]) -> Option<Self> {
        match (mode, list.first()) {
            (_, None) => None,
            (SelectionMode::Single, Some(first)) => Some(Self::Single(first.clone())),
            (SelectionMode::Multi, Some(_)) => Some(Self::Multi(list.to_vec())),
        }
    }

    pub fn tags(&self) -> &[Topic] {
        match self {
            Self::Single(topic) => std::slice::from_ref(topic),
            Self::Multi(topics) => topics,
        }
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.tags().contains(topic)
    }

    /// Human-readable label, e.g. `rust + cli`.
    pub fn label(&self) -> String {
        self.tags()
            .iter()
            .map(Topic::as_str)
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

// ============================================================================
// Settings Document
// ============================================================================

/// Current schema version of the persisted settings document.
pub const SETTINGS_VERSION: i64 = 2;

/// Canonical (v2) settings document.
///
/// Both lists are ordered sets: insertion order is kept and duplicates are
/// collapsed by [`TopicSettings::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSettings {
    #[serde(default)]
    pub topic_list: Vec<Topic>,
    #[serde(default, rename = "current_topics_list")]
    pub current_topics: Vec<Topic>,
}

/// Legacy (v1) document with a single active topic.
#[derive(Debug, Deserialize)]
pub(crate) struct TopicSettingsV1 {
    #[serde(default)]
    pub topic_list: Vec<String>,
    #[serde(default)]
    pub current_topic: String,
}

impl From<TopicSettingsV1> for TopicSettings {
    fn from(old: TopicSettingsV1) -> Self {
        let topic_list = old
            .topic_list
            .iter()
            .filter_map(|t| Topic::parse(t).ok())
            .collect();
        let current_topics = Topic::parse(&old.current_topic).into_iter().collect();
        Self {
            topic_list,
            current_topics,
        }
        .normalized()
    }
}

impl TopicSettings {
    /// Drop repeated tags, keeping the first occurrence.
    pub fn normalized(mut self) -> Self {
        dedup_in_place(&mut self.topic_list);
        dedup_in_place(&mut self.current_topics);
        self
    }

    /// The active selection as seen through `mode`.
    pub fn active(&self, mode: SelectionMode) -> Option<ActiveTopics> {
        ActiveTopics::from_list(mode, &self.current_topics)
    }
}

fn dedup_in_place(list: &mut Vec<Topic>) {
    let mut seen = std::collections::HashSet::with_capacity(list.len());
    list.retain(|t| seen.insert(t.clone()));
}
