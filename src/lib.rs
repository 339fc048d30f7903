//! ghtopics: browse GitHub repositories by topic from the terminal.

pub mod app;
pub mod config;
pub mod feed;
pub mod github;
pub mod route;
pub mod storage;
pub mod ui;
pub mod util;
