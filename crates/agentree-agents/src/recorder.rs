// ABOUTME: Run telemetry aggregation for token, cost and latency counters
// ABOUTME: Pure reduction over per-iteration usage plus a single wall-clock duration

use agentree_ai::Usage;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Wall-clock time reported in testing mode, so recorded runs are reproducible
pub const TESTING_TOTAL_TIME: f64 = 0.5;

/// Aggregated telemetry for a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub total_tokens: u64,
    pub total_prompt_cost: f64,
    pub total_completion_cost: f64,
    pub total_cost: f64,
    pub total_prompt_time: f64,
    /// Seconds from run start to finish
    pub total_time: f64,
}

impl RunTotals {
    pub fn from_usage(usage: Usage, total_time: f64) -> Self {
        Self {
            total_prompt_tokens: usage.prompt_tokens,
            total_completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            total_prompt_cost: usage.prompt_cost,
            total_completion_cost: usage.completion_cost,
            total_cost: usage.total_cost,
            total_prompt_time: usage.prompt_time,
            total_time,
        }
    }
}

pub struct RunRecorder {
    started: Instant,
    testing: bool,
}

impl RunRecorder {
    /// Start the wall clock for a run
    pub fn start(testing: bool) -> Self {
        Self {
            started: Instant::now(),
            testing,
        }
    }

    /// Sum of per-iteration usage records
    pub fn accumulate<'a, I>(records: I) -> Usage
    where
        I: IntoIterator<Item = &'a Usage>,
    {
        records.into_iter().sum()
    }

    pub fn elapsed(&self) -> f64 {
        if self.testing {
            TESTING_TOTAL_TIME
        } else {
            self.started.elapsed().as_secs_f64()
        }
    }

    pub fn finish<'a, I>(&self, records: I) -> RunTotals
    where
        I: IntoIterator<Item = &'a Usage>,
    {
        RunTotals::from_usage(Self::accumulate(records), self.elapsed())
    }
}
