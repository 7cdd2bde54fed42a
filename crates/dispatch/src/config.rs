//! Tunables for the dispatch rounds.

use std::time::Duration;

/// Knobs governing candidate search and offer rounds.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Search radius for the first round, in km.
    pub search_radius_km: f64,
    /// Maximum candidates offered per round (K).
    pub max_candidates: usize,
    /// How long a round waits for an acceptance (T).
    pub accept_window: Duration,
    /// Total rounds before giving up (N).
    pub max_rounds: u32,
    /// Radius multiplier applied on each successive round.
    pub widen_factor: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            search_radius_km: 15.0,
            max_candidates: 5,
            accept_window: Duration::from_secs(20),
            max_rounds: 3,
            widen_factor: 1.5,
        }
    }
}
