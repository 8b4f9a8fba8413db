use serde::{Deserialize, Serialize};
use sieve_codec::DEFAULT_MAX_DEPTH;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    /// Deepest container nesting accepted, root document included.
    pub max_depth: usize,
    /// Output pre-allocation as a fraction of the input length. Values
    /// outside `0.0..=1.0` are clamped; output never outgrows its input.
    pub initial_capacity_ratio: f64,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            initial_capacity_ratio: 1.0,
        }
    }
}

impl ProjectorConfig {
    pub(crate) fn capacity_for(&self, input_len: usize) -> usize {
        (input_len as f64 * self.initial_capacity_ratio.clamp(0.0, 1.0)) as usize
    }
}
