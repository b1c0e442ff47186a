pub mod client;
pub mod content;
pub mod refs;
pub mod tree;

pub use client::GitHubClient;
