use serde::{Deserialize, Serialize};

/// Frontier tuning knobs. Defaults match the conservative politeness the
/// crawler ships with: back off five times the observed fetch duration,
/// bounded to [2s, 30s], retry transient failures for up to 30 attempts
/// with a 15 minute wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    /// Multiples of the last fetch's elapsed time to wait before contacting
    /// the same origin again.
    pub delay_factor: f64,
    /// Always wait at least this long after a completion, regardless of the
    /// multiple.
    pub min_delay_ms: u64,
    /// Never wait longer than this, regardless of the multiple.
    pub max_delay_ms: u64,
    /// Maximum fetch attempts before an item stops being retried.
    pub max_retries: u32,
    /// Default wait before a delayed retry, in seconds. An item-local
    /// override takes precedence.
    pub retry_delay_secs: u64,
    /// Concurrent in-flight fetches permitted per origin.
    pub host_valence: u32,
    /// Embed/redirect hop count up to which items are promoted to MEDIUM so
    /// near-seed resources (inline images, frames) stay ahead of deep link
    /// traversal. Zero disables the promotion.
    pub preference_embed_hops: u32,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            delay_factor: 5.0,
            min_delay_ms: 2_000,
            max_delay_ms: 30_000,
            max_retries: 30,
            retry_delay_secs: 900,
            host_valence: 1,
            preference_embed_hops: 1,
        }
    }
}

impl FrontierConfig {
    pub fn retry_delay_ms(&self) -> u64 {
        self.retry_delay_secs.saturating_mul(1_000)
    }
}
