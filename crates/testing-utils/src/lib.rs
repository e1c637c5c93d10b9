//! # Translation Scheduler Testing Utils
//!
//! Shared testing utilities for the translation scheduler workspace.
//! This crate provides in-memory collaborators and test data builders
//! that can be used across all other crates in the workspace.
//!
//! ## Features
//!
//! - **Mock History Store**: in-memory history with failure injection and call counting
//! - **Load Providers**: fixed or failing system load snapshots
//! - **Scripted Translator**: per-task failures, panics and latency
//! - **Recording Sleeper**: captures backoff delays without waiting
//! - **Test Data Builders**: tasks and histories with sensible defaults
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! l10n-testing-utils = { path = "../testing-utils" }
//! ```
//!
//! ```rust
//! use l10n_testing_utils::{MockHistoryStore, TaskBuilder};
//!
//! let store = MockHistoryStore::new();
//! let task = TaskBuilder::new("product-1").build();
//! assert_eq!(task.target_locale, "fr");
//! # let _ = store;
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
