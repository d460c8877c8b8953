//! GitHub repository metadata: REST client, file tree builder and the
//! on-demand preview generator.

mod client;
mod generator;
mod tree;

pub use client::{GitHubClient, GitHubError, TreeEntry};
pub use generator::generate_tutorial;
pub use tree::build_file_tree;
