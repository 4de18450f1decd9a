// ABOUTME: Environment contract executed by every agent and its benchmark-backed implementation
// ABOUTME: Dispatches actions to registered tools, grades terminal answers, never fails

use agentree_core::{Capabilities, ParsedAction};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Result of executing one action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub observation: String,
    /// 0 for intermediate steps; 0 or 1 once `done`
    pub reward: f64,
    pub done: bool,
    /// Submitted answer when the action was terminal, otherwise empty
    pub answer: String,
    pub tool_info: HashMap<String, Value>,
}

/// Executes actions proposed by an agent.
///
/// Implementations must be total: malformed or unknown actions produce an
/// observation saying so, never an error.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Execute `action`, grading terminal answers against `key`
    async fn step(&self, action: &ParsedAction, key: &str) -> StepOutcome;
}

/// Output of a tool invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub observation: String,
    pub metadata: HashMap<String, Value>,
}

impl ToolOutput {
    pub fn text(observation: impl Into<String>) -> Self {
        Self {
            observation: observation.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A non-terminal action such as `Search` or `Calculate`.
///
/// Tools report their own failures inside the observation text.
#[async_trait]
pub trait ActionTool: Send + Sync {
    /// Action name as it appears in `Name[argument]`
    fn name(&self) -> &str;

    async fn invoke(&self, argument: &str) -> ToolOutput;
}

/// Environment driven by a benchmark capability record and a set of tools
pub struct BenchmarkEnvironment {
    capabilities: &'static Capabilities,
    // keyed by lowercase action name
    tools: HashMap<String, Arc<dyn ActionTool>>,
}

impl std::fmt::Debug for BenchmarkEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkEnvironment")
            .field("capabilities", &self.capabilities)
            .field("tools", &self.tool_names())
            .finish()
    }
}

impl BenchmarkEnvironment {
    pub fn new(capabilities: &'static Capabilities) -> Self {
        Self {
            capabilities,
            tools: HashMap::new(),
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn ActionTool>) -> Self {
        self.tools.insert(tool.name().to_lowercase(), tool);
        self
    }

    /// Registered tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.values().map(|t| t.name().to_string()).collect();
        names.sort();
        names
    }

    fn finish(&self, action: &ParsedAction, key: &str) -> StepOutcome {
        let correct = self.capabilities.is_correct(&action.argument, key);
        let observation = if correct {
            "Answer is CORRECT"
        } else {
            "Answer is INCORRECT"
        };

        let mut tool_info = HashMap::new();
        tool_info.insert("correct".to_string(), Value::Bool(correct));

        StepOutcome {
            observation: observation.to_string(),
            reward: if correct { 1.0 } else { 0.0 },
            done: true,
            answer: action.argument.clone(),
            tool_info,
        }
    }

    fn invalid(&self, action: &ParsedAction) -> StepOutcome {
        debug!(
            target: "agents::environment",
            action_type = %action.action_type,
            "Invalid action"
        );
        StepOutcome {
            observation: self.capabilities.invalid_action_message(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Environment for BenchmarkEnvironment {
    async fn step(&self, action: &ParsedAction, key: &str) -> StepOutcome {
        if action.is_invalid() {
            return self.invalid(action);
        }

        if self.capabilities.is_finish(&action.action_type) {
            let outcome = self.finish(action, key);
            debug!(
                target: "agents::environment",
                reward = outcome.reward,
                "Terminal action graded"
            );
            return outcome;
        }

        match self.tools.get(&action.action_type.to_lowercase()) {
            Some(tool) => {
                let output = tool.invoke(&action.argument).await;
                let mut tool_info = output.metadata;
                tool_info.insert("tool".to_string(), Value::String(tool.name().to_string()));

                debug!(
                    target: "agents::environment",
                    tool = tool.name(),
                    observation_len = output.observation.len(),
                    "Tool invoked"
                );

                StepOutcome {
                    observation: output.observation,
                    reward: 0.0,
                    done: false,
                    answer: String::new(),
                    tool_info,
                }
            }
            None => self.invalid(action),
        }
    }
}
