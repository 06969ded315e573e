//! Embedding provider trait and implementations.
//!
//! - `EmbeddingProvider` is the numeric contract the engine requires from an
//!   external embedding service: text in, fixed-dimension cosine-comparable
//!   vector out.
//! - `TokenHashProvider` is a deterministic bag-of-words implementation for
//!   tests and embedding-free deployments: no model, no network, but real
//!   lexical-overlap similarity.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use reprise_core::error::RepriseError;
use reprise_core::text::normalize_word;
use reprise_core::types::Embedding;
use tracing::warn;

/// Service for generating text embeddings.
///
/// Implementations must be deterministic for a fixed model version. The
/// dimension is fixed for the lifetime of a process.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, RepriseError>> + Send;

    /// Return the dimensionality of vectors produced by this provider.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingProvider`] for dynamic dispatch.
///
/// Because `EmbeddingProvider::embed` returns `impl Future` it is not
/// object-safe. This trait uses a boxed future instead, allowing
/// `Box<dyn DynEmbeddingProvider>` to be injected into the engine without
/// generics. A blanket implementation covers every `EmbeddingProvider`.
pub trait DynEmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, RepriseError>> + Send + 'a>,
    >;

    /// Return the dimensionality of vectors produced by this provider.
    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingProvider> DynEmbeddingProvider for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, RepriseError>> + Send + 'a>,
    > {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingProvider::dimensions(self)
    }
}

/// Call a provider with a timeout, absorbing every failure mode.
///
/// Returns `None` on timeout, provider error, or empty input. The caller
/// switches to the lexical path when this returns `None`; a provider problem
/// must never stall or fail the conversation.
pub async fn embed_bounded(
    provider: &dyn DynEmbeddingProvider,
    text: &str,
    timeout: Duration,
) -> Option<Embedding> {
    if text.trim().is_empty() {
        return None;
    }
    match tokio::time::timeout(timeout, provider.embed_boxed(text)).await {
        Ok(Ok(vector)) => Some(Embedding::new(vector)),
        Ok(Err(e)) => {
            warn!("Embedding provider failed, falling back to lexical path: {}", e);
            None
        }
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Embedding provider timed out, falling back to lexical path"
            );
            None
        }
    }
}

// ---------------------------------------------------------------------------
// TokenHashProvider - deterministic bag-of-words vectors
// ---------------------------------------------------------------------------

/// Deterministic embedding provider that hashes normalized tokens into a
/// fixed-dimension bag-of-words vector and L2-normalizes the result.
///
/// Identical inputs always produce identical outputs, and texts sharing
/// tokens score a genuinely higher cosine similarity than unrelated texts,
/// which makes this suitable both for tests and as a model-free fallback
/// deployment.
#[derive(Debug, Clone)]
pub struct TokenHashProvider {
    dimensions: usize,
}

impl TokenHashProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = vec![0.0f32; self.dimensions];
        for token in text.split_whitespace() {
            let token = normalize_word(token);
            if token.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();
            result[(h % self.dimensions as u64) as usize] += 1.0;
        }

        // L2-normalize so cosine comparisons are well-behaved unit vectors.
        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }
        result
    }
}

impl Default for TokenHashProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for TokenHashProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RepriseError> {
        if text.trim().is_empty() {
            return Err(RepriseError::Embedding(
                "Cannot embed empty text".to_string(),
            ));
        }
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
