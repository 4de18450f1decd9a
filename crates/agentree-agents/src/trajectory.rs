// ABOUTME: Step records and the single think-act-observe cycle shared by every agent
// ABOUTME: Renders steps in the Thought/Action/Observation scratchpad format

use crate::environment::Environment;
use agentree_ai::{LlmGateway, PromptContext, Usage};
use agentree_core::ParsedAction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One executed reasoning step. Blank for a search root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub thought: String,
    pub action_type: String,
    pub argument: String,
    pub observation: String,
    /// Submitted answer when the step was terminal
    pub answer: String,
    pub tool_info: HashMap<String, Value>,
}

impl StepRecord {
    pub fn is_blank(&self) -> bool {
        self.thought.is_empty() && self.action_type.is_empty() && self.observation.is_empty()
    }

    pub fn action(&self) -> ParsedAction {
        ParsedAction::new(self.action_type.clone(), self.argument.clone())
    }

    /// Scratchpad lines for this step, numbered `step`
    pub fn render(&self, step: usize) -> String {
        format!(
            "\nThought {step}: {}\nAction {step}: {}\nObservation {step}: {}",
            self.thought,
            self.action().render(),
            self.observation
        )
    }
}

/// A step together with the environment's verdict and the model usage it cost
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub record: StepRecord,
    pub reward: f64,
    pub done: bool,
    pub usage: Usage,
}

/// Run one think→act→observe cycle on top of `ctx.scratchpad`
pub async fn think_act_observe(
    gateway: &dyn LlmGateway,
    environment: &dyn Environment,
    ctx: &PromptContext<'_>,
    key: &str,
) -> StepResult {
    let thought = gateway.propose_thought(ctx).await;

    let with_thought = format!("{}\nThought {}: {}", ctx.scratchpad, ctx.step, thought.output);
    let action_ctx = PromptContext {
        scratchpad: &with_thought,
        ..*ctx
    };
    let action = gateway.propose_action(&action_ctx).await;

    let outcome = environment.step(&action.output, key).await;

    StepResult {
        record: StepRecord {
            thought: thought.output,
            action_type: action.output.action_type,
            argument: action.output.argument,
            observation: outcome.observation,
            answer: outcome.answer,
            tool_info: outcome.tool_info,
        },
        reward: outcome.reward,
        done: outcome.done,
        usage: thought.usage + action.usage,
    }
}
