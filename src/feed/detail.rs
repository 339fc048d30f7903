use crate::github::Repository;

/// README load state for the detail view.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadmeState {
    Loading,
    Loaded(String),
    Failed(String),
}

/// The repository currently open in the detail view.
#[derive(Debug, Clone)]
pub struct RepoDetail {
    pub repo: Repository,
    pub readme: ReadmeState,
    /// Set when the README fetch fails; cleared by the user.
    pub show_error: bool,
}

impl RepoDetail {
    pub(super) fn new(repo: Repository) -> Self {
        Self {
            repo,
            readme: ReadmeState::Loading,
            show_error: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.readme == ReadmeState::Loading
    }
}
