// ABOUTME: Gateway contract between reasoning agents and the language model
// ABOUTME: Every call returns a value plus usage telemetry and never fails

use agentree_core::ParsedAction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Token, cost and latency telemetry for one or more model calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub prompt_cost: f64,
    pub completion_cost: f64,
    pub total_cost: f64,
    /// Seconds spent waiting on the provider
    pub prompt_time: f64,
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, other: Usage) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
            prompt_cost: self.prompt_cost + other.prompt_cost,
            completion_cost: self.completion_cost + other.completion_cost,
            total_cost: self.total_cost + other.total_cost,
            prompt_time: self.prompt_time + other.prompt_time,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Usage) {
        *self = *self + other;
    }
}

impl Sum for Usage {
    fn sum<I: Iterator<Item = Usage>>(iter: I) -> Usage {
        iter.fold(Usage::default(), Add::add)
    }
}

impl<'a> Sum<&'a Usage> for Usage {
    fn sum<I: Iterator<Item = &'a Usage>>(iter: I) -> Usage {
        iter.copied().sum()
    }
}

/// A gateway result together with what it cost to produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation<T> {
    pub output: T,
    pub usage: Usage,
}

impl<T> Generation<T> {
    pub fn new(output: T, usage: Usage) -> Self {
        Self { output, usage }
    }
}

/// What the model sees for one call
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub question: &'a str,
    /// Trajectory so far, rendered as Thought/Action/Observation lines
    pub scratchpad: &'a str,
    /// 1-based index of the step being generated
    pub step: usize,
    pub examples: &'a str,
    pub reflections: &'a [String],
}

/// Language model capabilities consumed by the agents.
///
/// Implementations absorb provider failures: malformed output degrades to
/// [`ParsedAction::invalid`], failed calls to empty text or zero scores.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Next thought for the trajectory in `ctx`
    async fn propose_thought(&self, ctx: &PromptContext<'_>) -> Generation<String>;

    /// Next action; `ctx.scratchpad` already ends with the current thought
    async fn propose_action(&self, ctx: &PromptContext<'_>) -> Generation<ParsedAction>;

    /// One value per candidate trajectory, aligned with `candidates`
    async fn score_candidates(
        &self,
        ctx: &PromptContext<'_>,
        candidates: &[String],
    ) -> Generation<Vec<f64>>;

    /// Self-critique of the failed trajectory in `ctx.scratchpad`
    async fn reflect(&self, ctx: &PromptContext<'_>) -> Generation<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(tokens: u64, cost: f64) -> Usage {
        Usage {
            prompt_tokens: tokens,
            completion_tokens: tokens / 2,
            total_tokens: tokens + tokens / 2,
            prompt_cost: cost,
            completion_cost: cost / 2.0,
            total_cost: cost * 1.5,
            prompt_time: 0.25,
        }
    }

    #[test]
    fn test_usage_sum() {
        let total: Usage = vec![usage(10, 0.1), usage(20, 0.2)].into_iter().sum();
        assert_eq!(total.prompt_tokens, 30);
        assert_eq!(total.completion_tokens, 15);
        assert_eq!(total.total_tokens, 45);
        assert!((total.total_cost - 0.45).abs() < 1e-9);
        assert!((total.prompt_time - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_usage_sum_of_empty_is_zero() {
        let total: Usage = Vec::<Usage>::new().iter().sum();
        assert_eq!(total, Usage::default());
    }
}
