//! Embedding provider contract for the Reprise engine.
//!
//! The embedding function itself is an external collaborator; this crate
//! defines the trait the engine consumes, a deterministic token-hash
//! implementation for tests and offline use, and the timeout-bounded call
//! wrapper that turns provider failures into silent fallback.

pub mod provider;

pub use provider::{
    embed_bounded, DynEmbeddingProvider, EmbeddingProvider, TokenHashProvider,
};
