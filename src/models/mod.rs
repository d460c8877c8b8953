//! Data models for the Waver tutorial site.
//!
//! Field names follow the JSON the site's clients already consume: tutorial and
//! metadata records are camelCase, repository descriptors keep GitHub's snake_case.

mod file_node;
mod tutorial;
mod waver_config;

pub use file_node::*;
pub use tutorial::*;
pub use waver_config::*;
