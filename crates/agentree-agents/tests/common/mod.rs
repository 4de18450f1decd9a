#![allow(dead_code)]

use agentree_agents::{ActionTool, BenchmarkEnvironment, ToolOutput};
use agentree_ai::{Generation, LlmGateway, PromptContext, Usage};
use agentree_core::{Benchmark, ParsedAction};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type TextFn = Box<dyn Fn(usize) -> String + Send + Sync>;
type ActionFn = Box<dyn Fn(usize) -> ParsedAction + Send + Sync>;
type ScoreFn = Box<dyn Fn(&str) -> f64 + Send + Sync>;

/// Gateway driven by closures over the per-method call index
pub struct ScriptedGateway {
    thought: TextFn,
    action: ActionFn,
    score: ScoreFn,
    reflection: TextFn,
    usage: Usage,
    pub thought_calls: AtomicUsize,
    pub action_calls: AtomicUsize,
    pub score_requests: AtomicUsize,
    pub scored_candidates: AtomicUsize,
    pub reflect_calls: AtomicUsize,
    /// Reflection count visible to each thought prompt
    pub reflections_seen: Mutex<Vec<usize>>,
    pub last_examples: Mutex<String>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            thought: Box::new(|i| format!("thought {}", i)),
            action: Box::new(|i| ParsedAction::new("Search", format!("topic {}", i))),
            score: Box::new(|_| 0.5),
            reflection: Box::new(|i| format!("reflection {}", i)),
            usage: Usage::default(),
            thought_calls: AtomicUsize::new(0),
            action_calls: AtomicUsize::new(0),
            score_requests: AtomicUsize::new(0),
            scored_candidates: AtomicUsize::new(0),
            reflect_calls: AtomicUsize::new(0),
            reflections_seen: Mutex::new(Vec::new()),
            last_examples: Mutex::new(String::new()),
        }
    }

    pub fn thoughts(mut self, f: impl Fn(usize) -> String + Send + Sync + 'static) -> Self {
        self.thought = Box::new(f);
        self
    }

    pub fn actions(mut self, f: impl Fn(usize) -> ParsedAction + Send + Sync + 'static) -> Self {
        self.action = Box::new(f);
        self
    }

    pub fn scores(mut self, f: impl Fn(&str) -> f64 + Send + Sync + 'static) -> Self {
        self.score = Box::new(f);
        self
    }

    pub fn reflections(mut self, f: impl Fn(usize) -> String + Send + Sync + 'static) -> Self {
        self.reflection = Box::new(f);
        self
    }

    /// Usage reported by every call
    pub fn usage_per_call(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn propose_thought(&self, ctx: &PromptContext<'_>) -> Generation<String> {
        let i = self.thought_calls.fetch_add(1, Ordering::SeqCst);
        self.reflections_seen.lock().unwrap().push(ctx.reflections.len());
        *self.last_examples.lock().unwrap() = ctx.examples.to_string();
        Generation::new((self.thought)(i), self.usage)
    }

    async fn propose_action(&self, _ctx: &PromptContext<'_>) -> Generation<ParsedAction> {
        let i = self.action_calls.fetch_add(1, Ordering::SeqCst);
        Generation::new((self.action)(i), self.usage)
    }

    async fn score_candidates(
        &self,
        _ctx: &PromptContext<'_>,
        candidates: &[String],
    ) -> Generation<Vec<f64>> {
        self.score_requests.fetch_add(1, Ordering::SeqCst);
        self.scored_candidates
            .fetch_add(candidates.len(), Ordering::SeqCst);
        let values = candidates.iter().map(|c| (self.score)(c)).collect();
        Generation::new(values, self.usage)
    }

    async fn reflect(&self, _ctx: &PromptContext<'_>) -> Generation<String> {
        let i = self.reflect_calls.fetch_add(1, Ordering::SeqCst);
        Generation::new((self.reflection)(i), self.usage)
    }
}

/// Search tool that echoes its argument
pub struct EchoSearch;

#[async_trait]
impl ActionTool for EchoSearch {
    fn name(&self) -> &str {
        "Search"
    }

    async fn invoke(&self, argument: &str) -> ToolOutput {
        ToolOutput::text(format!("Found a page about {}.", argument))
    }
}

pub fn qa_environment() -> Arc<BenchmarkEnvironment> {
    Arc::new(
        BenchmarkEnvironment::new(Benchmark::HotpotQA.capabilities())
            .with_tool(Arc::new(EchoSearch)),
    )
}

pub fn finish(answer: &str) -> ParsedAction {
    ParsedAction::new("Finish", answer)
}

pub fn search(topic: &str) -> ParsedAction {
    ParsedAction::new("Search", topic)
}

pub fn usage(prompt: u64, completion: u64, cost: f64) -> Usage {
    Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: prompt + completion,
        prompt_cost: cost,
        completion_cost: cost,
        total_cost: cost * 2.0,
        prompt_time: 0.01,
    }
}
