use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RepriseError, Result};

/// Top-level configuration for the context engine.
///
/// Every empirically tuned threshold and weight lives here rather than in
/// code. All sections default independently, so a partial TOML file is fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detection: DetectionConfig,
    pub memory: MemoryConfig,
    pub embedding: EmbeddingConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RepriseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Follow-up detection thresholds and adjustments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Aggregated confidence at or above which a message counts as a
    /// follow-up.
    pub followup_threshold: f64,
    /// Per-exchange similarity above which an exchange counts toward
    /// `match_count`.
    pub context_threshold: f64,
    /// How many recent exchanges the similarity scorer looks at (3 to 5).
    pub similarity_window: usize,
    /// Multiplier applied to the intent confidence when the winning intent
    /// is a follow-up intent.
    pub intent_boost: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            followup_threshold: 0.45,
            context_threshold: 0.3,
            similarity_window: 5,
            intent_boost: 1.25,
        }
    }
}

/// Working-memory sizing and compression policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum exchanges kept in working memory; older entries are evicted
    /// FIFO after compression.
    pub max_context_exchanges: usize,
    /// Pairwise similarity above which two exchanges get linked in the graph.
    pub link_threshold: f64,
    /// How many most-recent exchanges a new one is compared against for
    /// linking.
    pub link_candidates: usize,
    /// Responses longer than this are compressed at insert time rather than
    /// stored in full.
    pub max_response_chars: usize,
    /// Hard cap on the length of a compressed summary.
    pub summary_max_chars: usize,
    /// Working-memory token estimate (characters / 4) that triggers a
    /// compression sweep.
    pub token_budget: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_context_exchanges: 5,
            link_threshold: 0.4,
            link_candidates: 5,
            max_response_chars: 4000,
            summary_max_chars: 200,
            token_budget: 2000,
        }
    }
}

/// Embedding provider call policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Per-call timeout; on expiry the engine falls back to the lexical path.
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { timeout_ms: 2000 }
    }
}
