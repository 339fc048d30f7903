//! GitHub REST access: topic-filtered repository search and README retrieval.

mod client;
mod types;

pub use client::{build_http_client, GitHubClient, RepoSearch, SearchError, DEFAULT_API_BASE};
pub use types::{License, Owner, Repository, NO_LANGUAGE};
