//! Feed event handling.
//!
//! Applies background completions to the feed, then reconciles the UI state
//! that depends on it: selections, the cached README and the auto load-more
//! trigger.

use crate::app::{App, View};
use crate::feed::{FeedEvent, ReadmeState};
use crate::github::RepoSearch;
use crate::util::strip_control_chars;

use super::detail::render_markdown;

pub(super) fn handle_feed_event<S: RepoSearch>(app: &mut App<S>, event: FeedEvent) {
    let readme_event = matches!(event, FeedEvent::ReadmeLoaded { .. });

    if let Some(notice) = app.feed.handle(event) {
        app.set_status(notice);
    }

    if readme_event {
        app.readme_lines = match app.feed.detail().map(|d| &d.readme) {
            Some(ReadmeState::Loaded(text)) => Some(render_markdown(&strip_control_chars(text))),
            _ => None,
        };
    }

    app.clamp_selections();
    if app.view == View::Browse && app.check_load_more() {
        app.feed.load_more();
    }
}
