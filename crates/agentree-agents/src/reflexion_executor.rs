// ABOUTME: Reflexion executor implementing AgentExecutorTrait
// ABOUTME: Repeats failed trials with self-reflections and optional experience retrieval

use crate::environment::Environment;
use crate::executor::{AgentOutput, ExecutorError, Task};
use crate::executor_trait::AgentExecutorTrait;
use crate::experience::ExperienceStore;
use crate::react_executor::output_from_loop;
use crate::recorder::RunRecorder;
use crate::reflexion::ReflectionStrategyLoop;
use agentree_ai::LlmGateway;
use agentree_core::{AgentArchitecture, Capabilities, ReflexionConfig};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct ReflexionExecutor {
    agent_loop: ReflectionStrategyLoop,
    testing: bool,
}

impl ReflexionExecutor {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        environment: Arc<dyn Environment>,
        capabilities: &'static Capabilities,
        config: ReflexionConfig,
    ) -> Self {
        info!(
            target: "agents::reflexion",
            max_trials = config.max_trials,
            max_steps = config.max_steps,
            patience = config.patience,
            "Reflexion executor initialized"
        );

        Self {
            agent_loop: ReflectionStrategyLoop::new(gateway, environment, capabilities, config),
            testing: false,
        }
    }

    pub fn with_experience_store(mut self, store: Arc<dyn ExperienceStore>) -> Self {
        self.agent_loop = self.agent_loop.with_experience_store(store);
        self
    }

    /// Report a fixed wall-clock time
    pub fn with_testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }
}

#[async_trait]
impl AgentExecutorTrait for ReflexionExecutor {
    async fn execute(&self, task: Task) -> Result<AgentOutput, ExecutorError> {
        task.validate()?;
        let recorder = RunRecorder::start(self.testing);
        let outcome = self.agent_loop.run(&task).await;
        Ok(output_from_loop(&outcome, &recorder))
    }

    fn architecture(&self) -> AgentArchitecture {
        AgentArchitecture::Reflexion
    }
}
