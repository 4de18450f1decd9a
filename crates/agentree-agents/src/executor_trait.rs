// ABOUTME: Defines the AgentExecutorTrait for pluggable agent architectures
// ABOUTME: Enables runtime switching between ReAct, Reflexion and LATS

use crate::executor::{AgentOutput, ExecutorError, Task};
use agentree_core::AgentArchitecture;
use async_trait::async_trait;

/// Universal executor trait for all agent architectures
#[async_trait]
pub trait AgentExecutorTrait: Send + Sync {
    /// Solve `task`, grading the final answer against its key
    async fn execute(&self, task: Task) -> Result<AgentOutput, ExecutorError>;

    /// Get the architecture type this executor implements
    fn architecture(&self) -> AgentArchitecture;
}
