//! Small helpers shared by the UI layer.
//!
//! - **Text**: terminal-safe sanitizing and width-aware truncation
//! - **Time**: human strings for the API's ISO-8601 timestamps
//! - **Links**: validation before handing a URL to the system browser

mod links;
mod text;
mod time;

pub use links::{validate_url_for_open, LinkError};
pub use text::{compact_count, strip_control_chars, truncate_to_width};
pub use time::{format_timestamp, relative_time};
