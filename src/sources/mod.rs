//! Fetching of source repositories.

pub mod git;

pub use git::fetch_source;
