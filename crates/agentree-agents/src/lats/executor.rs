// ABOUTME: LATS executor implementing AgentExecutorTrait
// ABOUTME: Runs a fresh tree-search controller per task and reports the winning trajectory

use super::controller::{TreeSearchController, TreeSearchResult};
use crate::environment::Environment;
use crate::executor::{AgentOutput, ExecutorError, Task};
use crate::executor_trait::AgentExecutorTrait;
use agentree_ai::LlmGateway;
use agentree_core::{AgentArchitecture, Capabilities, LatsConfig};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// LATS executor.
///
/// Every call gets its own controller, so concurrent tasks never share a tree.
pub struct LATSExecutor {
    gateway: Arc<dyn LlmGateway>,
    environment: Arc<dyn Environment>,
    capabilities: &'static Capabilities,
    config: LatsConfig,
}

impl LATSExecutor {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        environment: Arc<dyn Environment>,
        capabilities: &'static Capabilities,
        config: LatsConfig,
    ) -> Self {
        info!(
            target: "lats::executor",
            n_samples = config.n_samples,
            depth_limit = config.depth_limit,
            max_iterations = config.max_iterations,
            "LATS executor initialized"
        );

        Self {
            gateway,
            environment,
            capabilities,
            config,
        }
    }

    pub fn config(&self) -> &LatsConfig {
        &self.config
    }

    /// Full search result, for callers that want the per-iteration trace
    pub async fn search(
        &self,
        task: &Task,
        cancel: &CancellationToken,
    ) -> Result<TreeSearchResult, ExecutorError> {
        task.validate()?;
        let mut controller = TreeSearchController::new(
            self.gateway.clone(),
            self.environment.clone(),
            self.capabilities,
            self.config.clone(),
        );
        Ok(controller
            .generate_with_cancellation(task, true, cancel)
            .await?)
    }

    pub async fn execute_with_cancellation(
        &self,
        task: Task,
        cancel: &CancellationToken,
    ) -> Result<AgentOutput, ExecutorError> {
        let result = self.search(&task, cancel).await?;
        Ok(output_from(result))
    }
}

fn output_from(result: TreeSearchResult) -> AgentOutput {
    let is_correct = result.is_solved();
    AgentOutput {
        answer: result.answer.state.answer,
        reward: result.answer.reward,
        is_correct,
        steps_taken: result.answer.depth,
        trajectory: result.trajectory,
        totals: result.totals,
    }
}

#[async_trait]
impl AgentExecutorTrait for LATSExecutor {
    async fn execute(&self, task: Task) -> Result<AgentOutput, ExecutorError> {
        self.execute_with_cancellation(task, &CancellationToken::new())
            .await
    }

    fn architecture(&self) -> AgentArchitecture {
        AgentArchitecture::LATS
    }
}
