// ABOUTME: LlmGateway implementation over any LLMProvider
// ABOUTME: Renders prompts from capability records, retries provider errors, and degrades failures to sentinels

use crate::gateway::{Generation, LlmGateway, PromptContext, Usage};
use crate::llm_provider::{GenerationConfig, LLMResponse};
use crate::prompts;
use crate::provider_router::{GatewayPhase, ProviderRouter};
use agentree_core::{Capabilities, LLMConfig, ParsedAction};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Adapter that turns a chat-completion provider into a reasoning gateway.
///
/// Retries live here and nowhere else: callers only ever see a response,
/// possibly an empty one.
pub struct ProviderGateway {
    router: ProviderRouter,
    capabilities: &'static Capabilities,
    config: LLMConfig,
}

impl ProviderGateway {
    pub fn new(
        router: ProviderRouter,
        capabilities: &'static Capabilities,
        config: LLMConfig,
    ) -> Self {
        Self {
            router,
            capabilities,
            config,
        }
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    fn generation_config(&self, stop: &[&str], temperature: f32) -> GenerationConfig {
        GenerationConfig {
            temperature,
            max_tokens: Some(self.config.max_tokens),
            max_prompt_tokens: self.config.token_budget,
            top_p: None,
            stop: if stop.is_empty() {
                None
            } else {
                Some(stop.iter().map(|s| s.to_string()).collect())
            },
        }
    }

    fn usage_for(&self, response: &LLMResponse, elapsed: Duration) -> Usage {
        let prompt_tokens = response.prompt_tokens.unwrap_or(0) as u64;
        let completion_tokens = response.completion_tokens.unwrap_or(0) as u64;
        let total_tokens = response
            .total_tokens
            .map(|t| t as u64)
            .unwrap_or(prompt_tokens + completion_tokens);
        let prompt_cost = prompt_tokens as f64 / 1000.0 * self.config.prompt_cost_per_1k;
        let completion_cost =
            completion_tokens as f64 / 1000.0 * self.config.completion_cost_per_1k;

        Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens,
            prompt_cost,
            completion_cost,
            total_cost: prompt_cost + completion_cost,
            prompt_time: elapsed.as_secs_f64(),
        }
    }

    /// Prompt budget for `provider`: the configured budget, never more than the
    /// context window leaves after the completion allowance
    fn prompt_budget(&self, context_window: usize, config: &GenerationConfig) -> usize {
        let room = context_window.saturating_sub(config.max_tokens.unwrap_or(0));
        match config.max_prompt_tokens {
            Some(budget) => budget.min(room),
            None => room,
        }
    }

    /// One provider call with retries. `None` once every attempt failed.
    async fn call(
        &self,
        phase: GatewayPhase,
        prompt: &str,
        config: &GenerationConfig,
    ) -> (Option<String>, Usage) {
        let provider = self.router.get_provider(phase);
        let config = &GenerationConfig {
            max_prompt_tokens: Some(self.prompt_budget(provider.context_window(), config)),
            ..config.clone()
        };
        let mut usage = Usage::default();

        for attempt in 0..=self.config.retry_attempts {
            let started = Instant::now();
            match provider.generate_with_config(prompt, config).await {
                Ok(response) => {
                    usage += self.usage_for(&response, started.elapsed());
                    debug!(
                        target: "ai::gateway",
                        phase = %phase,
                        provider = provider.provider_name(),
                        model = %response.model,
                        tokens = usage.total_tokens,
                        "Provider call completed"
                    );
                    return (Some(response.content), usage);
                }
                Err(e) => {
                    usage.prompt_time += started.elapsed().as_secs_f64();
                    warn!(
                        target: "ai::gateway",
                        phase = %phase,
                        attempt = attempt + 1,
                        error = %e,
                        "Provider call failed"
                    );
                    if attempt < self.config.retry_attempts {
                        let backoff = self.config.retry_backoff_ms * (attempt as u64 + 1);
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                }
            }
        }

        (None, usage)
    }
}

#[async_trait]
impl LlmGateway for ProviderGateway {
    async fn propose_thought(&self, ctx: &PromptContext<'_>) -> Generation<String> {
        let prompt = prompts::thought_prompt(self.capabilities, ctx);
        let config = self.generation_config(&["\nAction"], self.config.temperature);
        let (content, usage) = self.call(GatewayPhase::Thought, &prompt, &config).await;

        let thought = content
            .map(|text| prompts::first_line_without_label(&text, "Thought"))
            .unwrap_or_default();
        Generation::new(thought, usage)
    }

    async fn propose_action(&self, ctx: &PromptContext<'_>) -> Generation<ParsedAction> {
        let prompt = prompts::action_prompt(self.capabilities, ctx);
        let config = self.generation_config(&["\nObservation"], self.config.temperature);
        let (content, usage) = self.call(GatewayPhase::Action, &prompt, &config).await;

        let action = match content {
            Some(text) => self
                .capabilities
                .parse_action(&prompts::strip_label(&text, "Action")),
            None => ParsedAction::invalid(),
        };
        if action.is_invalid() {
            debug!(target: "ai::gateway", step = ctx.step, "Unparsable action, using sentinel");
        }
        Generation::new(action, usage)
    }

    async fn score_candidates(
        &self,
        ctx: &PromptContext<'_>,
        candidates: &[String],
    ) -> Generation<Vec<f64>> {
        let config = self.generation_config(&[], 0.0);
        let mut values = Vec::with_capacity(candidates.len());
        let mut usage = Usage::default();

        for candidate in candidates {
            let prompt = prompts::value_prompt(self.capabilities, ctx, candidate);
            let (content, call_usage) = self.call(GatewayPhase::Evaluation, &prompt, &config).await;
            usage += call_usage;
            values.push(content.map(|text| prompts::parse_value(&text)).unwrap_or(0.0));
        }

        Generation::new(values, usage)
    }

    async fn reflect(&self, ctx: &PromptContext<'_>) -> Generation<String> {
        let prompt = prompts::reflect_prompt(self.capabilities, ctx);
        let config = self.generation_config(&[], self.config.temperature);
        let (content, usage) = self.call(GatewayPhase::Reflection, &prompt, &config).await;

        Generation::new(content.map(|t| t.trim().to_string()).unwrap_or_default(), usage)
    }
}
