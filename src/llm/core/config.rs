//! Sampling settings sent with every model request

use crate::config::DEFAULT_MAX_TOKENS;

/// Output budget and sampling temperature for a model call
///
/// The orchestrator sends the same settings with the initial request, every
/// continuation and the plain-generation fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    /// Upper bound on generated tokens per call
    pub max_tokens: u32,
    /// Provider default when unset
    pub temperature: Option<f32>,
}

impl GenerationConfig {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}
