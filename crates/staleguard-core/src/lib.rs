pub mod config;
pub mod error;
pub mod models;
pub mod repo_url;
pub mod retry;
