// ABOUTME: Experience memory injected into agents explicitly, never held as global state
// ABOUTME: In-memory store ranks past successful trajectories by token overlap with the question

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A finished trial kept for later few-shot retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub question: String,
    /// Rendered scratchpad of the trial
    pub trajectory: String,
    pub reward: f64,
    pub succeeded: bool,
}

impl Experience {
    /// Few-shot rendering used when the experience is fed back into prompts
    pub fn as_example(&self) -> String {
        format!("Question: {}{}", self.question, self.trajectory)
    }
}

pub trait ExperienceStore: Send + Sync {
    /// Up to `k` successful experiences most similar to `question`
    fn retrieve(&self, question: &str, k: usize) -> Vec<Experience>;

    fn record(&self, experience: Experience);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Bounded in-memory store; the oldest entry is evicted once `capacity` is reached
pub struct InMemoryExperienceStore {
    entries: RwLock<Vec<Experience>>,
    capacity: usize,
}

impl InMemoryExperienceStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for InMemoryExperienceStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ExperienceStore for InMemoryExperienceStore {
    fn retrieve(&self, question: &str, k: usize) -> Vec<Experience> {
        let query = tokens(question);
        let entries = self.entries.read();

        let mut scored: Vec<(f64, &Experience)> = entries
            .iter()
            .filter(|e| e.succeeded)
            .map(|e| (overlap(&query, &tokens(&e.question)), e))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        // stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored.into_iter().take(k).map(|(_, e)| e.clone()).collect()
    }

    fn record(&self, experience: Experience) {
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity {
            entries.remove(0);
        }
        entries.push(experience);
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}
