//! Engine limits.

use serde::{Deserialize, Serialize};

/// Safety caps applied to every script run.
///
/// Deserializes with defaults for any missing field, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Iteration cap for every loop unless the block overrides it.
    pub max_iterations: u32,
    /// Maximum nesting of function calls.
    pub max_call_depth: u32,
    /// Math results beyond this magnitude are clamped.
    pub magnitude_limit: f64,
    /// Cap on the first operand of text operations, in characters.
    pub text_input_limit: usize,
    /// Cap on the second operand of text operations, in characters.
    pub text_argument_limit: usize,
    /// Cap on text operation results, in characters.
    pub text_output_limit: usize,
    /// Execution log entries kept per run.
    pub max_log_entries: usize,
    /// Fixed seed for reproducible randomness.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_call_depth: 64,
            magnitude_limit: 1e15,
            text_input_limit: 10_000,
            text_argument_limit: 1_000,
            text_output_limit: 50_000,
            max_log_entries: 512,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Default limits with a fixed random seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Self::default()
        }
    }
}
