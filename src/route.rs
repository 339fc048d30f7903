//! Navigation targets and the repository hand-off token.
//!
//! Opening a repository carries the whole item inside the route as
//! URL-safe base64 of its JSON, so the detail view needs no lookup.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;

use crate::github::Repository;

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("Hand-off token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Hand-off token does not hold a repository: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown route '{0}'")]
    UnknownRoute(String),
}

/// Screens the application can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Topics,
    Repo { encoded: String },
}

impl Route {
    pub fn repo(repo: &Repository) -> Result<Self, HandoffError> {
        Ok(Self::Repo {
            encoded: encode_repository(repo)?,
        })
    }

    /// Path form: `Topics` or `Repo/<token>`.
    pub fn path(&self) -> String {
        match self {
            Self::Topics => "Topics".to_string(),
            Self::Repo { encoded } => format!("Repo/{encoded}"),
        }
    }

    pub fn parse(path: &str) -> Result<Self, HandoffError> {
        match path.split_once('/') {
            None if path == "Topics" => Ok(Self::Topics),
            Some(("Repo", encoded)) if !encoded.is_empty() => Ok(Self::Repo {
                encoded: encoded.to_string(),
            }),
            _ => Err(HandoffError::UnknownRoute(path.to_string())),
        }
    }
}

pub fn encode_repository(repo: &Repository) -> Result<String, HandoffError> {
    let json = serde_json::to_vec(repo)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

pub fn decode_repository(token: &str) -> Result<Repository, HandoffError> {
    let json = URL_SAFE_NO_PAD.decode(token)?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Repository {
        serde_json::from_value(serde_json::json!({
            "html_url": "https://github.com/o/r",
            "name": "r",
            "full_name": "o/r",
            "description": "Slashes / and ? plus & symbols",
            "language": "Rust",
            "license": {"name": "MIT License"},
            "topics": ["rust", "cli"],
        }))
        .unwrap()
    }

    #[test]
    fn test_token_is_path_safe() {
        let token = encode_repository(&sample()).unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_route_through_path() {
        let route = Route::repo(&sample()).unwrap();
        let parsed = Route::parse(&route.path()).unwrap();
        assert_eq!(parsed, route);

        let Route::Repo { encoded } = parsed else {
            panic!("expected repo route");
        };
        assert_eq!(decode_repository(&encoded).unwrap(), sample());
    }

    #[test]
    fn test_topics_route() {
        assert_eq!(Route::parse("Topics").unwrap(), Route::Topics);
        assert_eq!(Route::Topics.path(), "Topics");
    }

    #[test]
    fn test_unknown_routes() {
        assert!(matches!(
            Route::parse("Settings"),
            Err(HandoffError::UnknownRoute(_))
        ));
        assert!(Route::parse("Repo/").is_err());
    }

    #[test]
    fn test_bad_tokens() {
        assert!(matches!(
            decode_repository("!!!"),
            Err(HandoffError::Base64(_))
        ));
        let not_a_repo = URL_SAFE_NO_PAD.encode(br#"{"name":"x"}"#);
        assert!(matches!(
            decode_repository(&not_a_repo),
            Err(HandoffError::Json(_))
        ));
    }
}
