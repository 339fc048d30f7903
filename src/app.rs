use ratatui::text::Line;
use std::borrow::Cow;
use tokio::time::Instant;

use crate::feed::TopicFeed;
use crate::github::{GitHubClient, RepoSearch, Repository};
use crate::storage::Topic;

/// How long a status message stays visible.
const STATUS_TTL_SECS: u64 = 3;

// ============================================================================
// View and Focus Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Browse, // Topic drawer + repository list
    Detail, // Single repository with README
}

/// Which panel has focus in Browse view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Topics,
    Repos,
}

// ============================================================================
// App
// ============================================================================

/// UI state wrapped around the topic feed.
pub struct App<S: RepoSearch = GitHubClient> {
    pub feed: TopicFeed<S>,

    pub view: View,
    pub focus: Focus,
    pub selected_topic: usize,
    pub selected_repo: usize,

    /// Text typed into the add-topic prompt; `None` when the prompt is closed.
    pub topic_input: Option<String>,
    pub show_help: bool,

    /// Detail view scroll position, in wrapped lines.
    pub detail_scroll: usize,
    /// Index into the open repository's topic tags.
    pub selected_chip: usize,
    /// README rendered once per load.
    pub readme_lines: Option<Vec<Line<'static>>>,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub spinner_frame: usize,

    load_more_buffer: usize,
    near_end: bool,
}

impl<S: RepoSearch> App<S> {
    pub fn new(feed: TopicFeed<S>, load_more_buffer: usize) -> Self {
        Self {
            feed,
            view: View::Browse,
            focus: Focus::Repos,
            selected_topic: 0,
            selected_repo: 0,
            topic_input: None,
            show_help: false,
            detail_scroll: 0,
            selected_chip: 0,
            readme_lines: None,
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
            load_more_buffer,
            near_end: false,
        }
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear the status message once it has expired.
    /// Returns true if a message was actually cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    pub fn selected_repository(&self) -> Option<&Repository> {
        self.feed.items().get(self.selected_repo)
    }

    pub fn selected_saved_topic(&self) -> Option<&Topic> {
        self.feed.saved_topics().get(self.selected_topic)
    }

    /// Topic tag highlighted in the detail view.
    pub fn selected_chip_topic(&self) -> Option<&str> {
        let detail = self.feed.detail()?;
        detail
            .repo
            .topics
            .get(self.selected_chip)
            .map(String::as_str)
    }

    /// Keep selections inside their lists after the lists change.
    pub fn clamp_selections(&mut self) {
        let repos = self.feed.items().len();
        self.selected_repo = self.selected_repo.min(repos.saturating_sub(1));
        let topics = self.feed.saved_topics().len();
        self.selected_topic = self.selected_topic.min(topics.saturating_sub(1));
    }

    pub fn move_selection(&mut self, delta: isize) {
        let (index, len) = match self.focus {
            Focus::Topics => (&mut self.selected_topic, self.feed.saved_topics().len()),
            Focus::Repos => (&mut self.selected_repo, self.feed.items().len()),
        };
        if len == 0 {
            *index = 0;
            return;
        }
        *index = index.saturating_add_signed(delta).min(len - 1);
    }

    pub fn select_last(&mut self) {
        match self.focus {
            Focus::Topics => self.selected_topic = self.feed.saved_topics().len().saturating_sub(1),
            Focus::Repos => self.selected_repo = self.feed.items().len().saturating_sub(1),
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Topics => Focus::Repos,
            Focus::Repos => Focus::Topics,
        };
    }

    /// True once when the selection first comes within `load_more_buffer`
    /// rows of the end of the list.
    ///
    /// Stays quiet while the selection lingers there, so an empty page does
    /// not cause a request loop.
    pub fn check_load_more(&mut self) -> bool {
        let len = self.feed.items().len();
        let near_end = len > 0 && self.selected_repo + 1 > len.saturating_sub(self.load_more_buffer);
        let trigger = near_end && !self.near_end;
        self.near_end = near_end;
        trigger
    }

    pub fn enter_detail(&mut self) {
        self.view = View::Detail;
        self.detail_scroll = 0;
        self.selected_chip = 0;
        self.readme_lines = None;
    }

    pub fn leave_detail(&mut self) {
        self.feed.close_detail();
        self.view = View::Browse;
        self.readme_lines = None;
    }

    pub fn cycle_chip(&mut self, delta: isize) {
        let count = self
            .feed
            .detail()
            .map(|d| d.repo.topics.len())
            .unwrap_or(0);
        if count == 0 {
            return;
        }
        let next = (self.selected_chip as isize + delta).rem_euclid(count as isize);
        self.selected_chip = next as usize;
    }
}
