//! Terminal user interface.
//!
//! - `loop_runner` - main event loop and terminal management
//! - `input` - keyboard handling per view
//! - `events` - applies background completions from the feed
//! - `render` - view dispatch and overlays
//! - `topics`, `repos`, `detail`, `status`, `help` - widgets

mod detail;
mod events;
mod help;
mod input;
mod loop_runner;
mod render;
mod repos;
mod status;
mod topics;

pub use loop_runner::{run, Action};
