// ABOUTME: High-level executor wrapper around the architecture-specific agents
// ABOUTME: Orchestrates architecture detection, factory-based executor creation, and delegation

use crate::environment::Environment;
use crate::executor_factory::AgentExecutorFactory;
use crate::experience::ExperienceStore;
use crate::recorder::RunTotals;
use agentree_ai::LlmGateway;
use agentree_core::{AgentArchitecture, AgentreeConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Error type for executor operations
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Agent build failed: {0}")]
    BuildFailed(String),

    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),
}

#[cfg(feature = "lats")]
impl From<crate::lats::SearchTreeError> for ExecutorError {
    fn from(err: crate::lats::SearchTreeError) -> Self {
        ExecutorError::ExecutionFailed(err.to_string())
    }
}

/// A question plus the ground-truth key terminal answers are graded against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub question: String,
    pub key: String,
}

impl Task {
    pub fn new(question: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            key: key.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ExecutorError> {
        if self.question.trim().is_empty() {
            return Err(ExecutorError::InvalidTask("question is empty".to_string()));
        }
        Ok(())
    }
}

/// What every executor reports back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Submitted answer, empty if the agent never answered
    pub answer: String,
    pub reward: f64,
    pub is_correct: bool,
    pub steps_taken: usize,
    /// Rendered Thought/Action/Observation trajectory behind `answer`
    pub trajectory: String,
    #[serde(flatten)]
    pub totals: RunTotals,
}

/// Executor that picks its architecture from the environment and delegates
pub struct AgentreeExecutor {
    factory: AgentExecutorFactory,
    architecture: AgentArchitecture,
}

impl AgentreeExecutor {
    pub fn new(factory: AgentExecutorFactory, architecture: AgentArchitecture) -> Self {
        Self {
            factory,
            architecture,
        }
    }

    pub fn architecture(&self) -> AgentArchitecture {
        self.architecture
    }

    pub async fn execute(&self, task: Task) -> Result<AgentOutput, ExecutorError> {
        let executor = self.factory.create(self.architecture)?;
        executor.execute(task).await
    }
}

/// Builder for AgentreeExecutor with fluent API
pub struct AgentreeExecutorBuilder {
    gateway: Option<Arc<dyn LlmGateway>>,
    environment: Option<Arc<dyn Environment>>,
    config: Option<Arc<AgentreeConfig>>,
    experience: Option<Arc<dyn ExperienceStore>>,
    architecture: Option<AgentArchitecture>,
}

impl AgentreeExecutorBuilder {
    pub fn new() -> Self {
        Self {
            gateway: None,
            environment: None,
            config: None,
            experience: None,
            architecture: None,
        }
    }

    pub fn gateway(mut self, gateway: Arc<dyn LlmGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn config(mut self, config: Arc<AgentreeConfig>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn experience_store(mut self, store: Arc<dyn ExperienceStore>) -> Self {
        self.experience = Some(store);
        self
    }

    /// Fix the architecture instead of detecting it from AGENTREE_AGENT_ARCHITECTURE
    pub fn architecture(mut self, architecture: AgentArchitecture) -> Self {
        self.architecture = Some(architecture);
        self
    }

    pub fn build(self) -> Result<AgentreeExecutor, ExecutorError> {
        let gateway = self
            .gateway
            .ok_or_else(|| ExecutorError::BuildFailed("LLM gateway required".to_string()))?;

        let environment = self
            .environment
            .ok_or_else(|| ExecutorError::BuildFailed("Environment required".to_string()))?;

        let config = self.config.unwrap_or_default();

        let mut factory = AgentExecutorFactory::new(gateway, environment, config);
        if let Some(store) = self.experience {
            factory = factory.with_experience_store(store);
        }

        let architecture = self
            .architecture
            .unwrap_or_else(AgentExecutorFactory::detect_architecture);

        Ok(AgentreeExecutor::new(factory, architecture))
    }
}

impl Default for AgentreeExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
