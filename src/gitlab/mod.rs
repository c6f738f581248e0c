mod client;
pub mod pagination;
pub mod types;

pub use client::GitLabClient;
