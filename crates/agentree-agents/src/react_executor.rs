// ABOUTME: ReAct executor implementing AgentExecutorTrait
// ABOUTME: A single reflection-free trial of the think-act-observe loop

use crate::environment::Environment;
use crate::executor::{AgentOutput, ExecutorError, Task};
use crate::executor_trait::AgentExecutorTrait;
use crate::recorder::RunRecorder;
use crate::reflexion::{LoopOutcome, ReflectionStrategyLoop};
use agentree_ai::LlmGateway;
use agentree_core::{AgentArchitecture, Capabilities};
use async_trait::async_trait;
use std::sync::Arc;

pub struct ReActExecutor {
    agent_loop: ReflectionStrategyLoop,
    testing: bool,
}

impl ReActExecutor {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        environment: Arc<dyn Environment>,
        capabilities: &'static Capabilities,
        max_steps: usize,
    ) -> Self {
        Self {
            agent_loop: ReflectionStrategyLoop::react(gateway, environment, capabilities, max_steps),
            testing: false,
        }
    }

    /// Report a fixed wall-clock time
    pub fn with_testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }
}

/// Shared by the loop-based executors
pub(crate) fn output_from_loop(outcome: &LoopOutcome, recorder: &RunRecorder) -> AgentOutput {
    AgentOutput {
        answer: outcome.answer().to_string(),
        reward: outcome.reward(),
        is_correct: outcome.is_correct(),
        steps_taken: outcome.steps_taken(),
        trajectory: outcome
            .final_trial()
            .map(|t| t.scratchpad.clone())
            .unwrap_or_default(),
        totals: recorder.finish(std::iter::once(&outcome.usage)),
    }
}

#[async_trait]
impl AgentExecutorTrait for ReActExecutor {
    async fn execute(&self, task: Task) -> Result<AgentOutput, ExecutorError> {
        task.validate()?;
        let recorder = RunRecorder::start(self.testing);
        let outcome = self.agent_loop.run(&task).await;
        Ok(output_from_loop(&outcome, &recorder))
    }

    fn architecture(&self) -> AgentArchitecture {
        AgentArchitecture::ReAct
    }
}
