//! Topic feed: pagination over the active topic selection plus the
//! repository detail view.

mod controller;
mod detail;

pub use crate::storage::TopicError;
pub use controller::{FeedEvent, FeedState, FeedTask, TopicFeed};
pub use detail::{ReadmeState, RepoDetail};
