//! Shared types, errors, configuration, and text utilities for the Reprise
//! conversational context engine.
//!
//! Every other crate in the workspace builds on the vocabulary defined here:
//! the [`Intent`](types::Intent) taxonomy, the per-session
//! [`Exchange`](types::Exchange) record, clamped score newtypes, and the
//! tunable [`EngineConfig`](config::EngineConfig).

pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::EngineConfig;
pub use error::{RepriseError, Result};
pub use types::*;
