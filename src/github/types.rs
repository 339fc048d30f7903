use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

/// Language shown when the API reports none.
pub const NO_LANGUAGE: &str = "No language";

/// Search endpoint envelope. Only `items` is read; counts and flags are ignored.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<Repository>,
}

/// A repository returned by the search API.
///
/// Identity fields (`html_url`, `name`, `full_name`) are required; every
/// other field falls back to its default when missing, `null`, or of the
/// wrong type, so one odd record does not fail a whole page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub html_url: String,
    pub name: String,
    pub full_name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "lenient")]
    pub pushed_at: String,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: String,
    #[serde(rename = "stargazers_count", default, deserialize_with = "lenient")]
    pub stars: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub watchers: u64,
    #[serde(rename = "forks_count", default, deserialize_with = "lenient")]
    pub forks: u64,
    #[serde(default = "no_language", deserialize_with = "language")]
    pub language: String,
    #[serde(default, deserialize_with = "lenient")]
    pub owner: Owner,
    #[serde(default, deserialize_with = "lenient")]
    pub license: Option<License>,
    #[serde(default, deserialize_with = "lenient")]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default, deserialize_with = "lenient")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
}

fn no_language() -> String {
    NO_LANGUAGE.to_string()
}

/// Deserialize `T`, substituting `T::default()` for `null` or a shape mismatch.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn language<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = lenient(deserializer)?;
    Ok(value.filter(|l| !l.is_empty()).unwrap_or_else(no_language))
}
