//! # Utilities Library
//!
//! Shared utility functions for environment variables, time and message text handling.

pub mod envs;
pub mod text;
pub mod time;

// Re-export commonly used functions
pub use envs::{get_env_or, get_env_parse_opt};
pub use text::{contains_ignore_case, truncate_chars};
pub use time::{format_time, now_utc};
