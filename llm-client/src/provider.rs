use std::ops::{Add, AddAssign};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request to send to an LLM provider
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    /// Already clamped to the provider's valid range
    pub temperature: Option<f32>,
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Token usage and cost for one or more generation calls.
///
/// Costs are in currency units and stay at zero when no cost model is
/// configured for the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub input_cost: f64,
    pub output_cost: f64,
}

impl TokenUsage {
    /// Estimate usage from the prompt and generated text.
    pub fn estimate(prompt: &str, output: &str) -> Self {
        Self {
            input_tokens: estimate_tokens(prompt),
            output_tokens: estimate_tokens(output),
            input_cost: 0.0,
            output_cost: 0.0,
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.input_cost + self.output_cost
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            input_cost: self.input_cost + other.input_cost,
            output_cost: self.output_cost + other.output_cost,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: TokenUsage) {
        *self = *self + other;
    }
}

/// Rough token count: one token per four characters of trimmed text.
///
/// Empty text counts as zero; anything else counts as at least one token.
pub fn estimate_tokens(text: &str) -> u32 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0;
    }
    let chars = trimmed.chars().count() as u32;
    (chars / 4).max(1)
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a completion request
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Get the provider name for display
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   \n"), 0);
        assert_eq!(estimate_tokens("hi"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("  abcdefgh  "), 2);
    }

    #[test]
    fn test_usage_sums_additively() {
        let first = TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
            input_cost: 0.25,
            output_cost: 0.5,
        };
        let second = TokenUsage {
            input_tokens: 7,
            output_tokens: 3,
            input_cost: 0.25,
            output_cost: 0.0,
        };

        let mut total = first + second;
        assert_eq!(total.input_tokens, 17);
        assert_eq!(total.output_tokens, 8);
        assert_eq!(total.total_cost(), 1.0);

        total += TokenUsage::default();
        assert_eq!(total.input_tokens, 17);
    }

    #[test]
    fn test_usage_estimate() {
        let usage = TokenUsage::estimate("abcdefghijkl", "abcd");
        assert_eq!(usage.input_tokens, 3);
        assert_eq!(usage.output_tokens, 1);
        assert_eq!(usage.total_cost(), 0.0);
    }
}
