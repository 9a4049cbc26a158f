//! Detect version drift between upstream releases and the versions pinned
//! across repositories.
//!
//! A run loads the tracked dependencies from the config, resolves each
//! upstream through a fetch adapter, reads every usage, and reports which
//! usages fall behind.

pub mod cache;
pub mod check;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod report;
pub mod resolve;
pub mod usage;
pub mod version;
