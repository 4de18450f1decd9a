// ABOUTME: Factory for creating architecture-specific agent executors
// ABOUTME: Supports runtime selection via AGENTREE_AGENT_ARCHITECTURE

use crate::environment::Environment;
use crate::executor::ExecutorError;
use crate::executor_trait::AgentExecutorTrait;
use crate::experience::ExperienceStore;
use crate::react_executor::ReActExecutor;
use agentree_ai::LlmGateway;
use agentree_core::{AgentArchitecture, AgentreeConfig, Capabilities};
use std::sync::Arc;

/// Factory for creating architecture-specific agent executors
///
/// Executors share the gateway and environment; their parameters come from
/// the `reflexion` and `lats` config sections and the benchmark selects the
/// capability record.
pub struct AgentExecutorFactory {
    gateway: Arc<dyn LlmGateway>,
    environment: Arc<dyn Environment>,
    config: Arc<AgentreeConfig>,
    // Only the Reflexion executor reads experiences
    #[allow(dead_code)]
    experience: Option<Arc<dyn ExperienceStore>>,
}

impl AgentExecutorFactory {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        environment: Arc<dyn Environment>,
        config: Arc<AgentreeConfig>,
    ) -> Self {
        Self {
            gateway,
            environment,
            config,
            experience: None,
        }
    }

    pub fn with_experience_store(mut self, store: Arc<dyn ExperienceStore>) -> Self {
        self.experience = Some(store);
        self
    }

    fn capabilities(&self) -> &'static Capabilities {
        self.config.agent.benchmark.capabilities()
    }

    /// Create an executor for the specified architecture
    pub fn create(
        &self,
        architecture: AgentArchitecture,
    ) -> Result<Box<dyn AgentExecutorTrait>, ExecutorError> {
        let testing = self.config.lats.testing;

        match architecture {
            AgentArchitecture::ReAct => Ok(Box::new(
                ReActExecutor::new(
                    self.gateway.clone(),
                    self.environment.clone(),
                    self.capabilities(),
                    self.config.reflexion.max_steps,
                )
                .with_testing(testing),
            )),
            #[cfg(feature = "reflexion")]
            AgentArchitecture::Reflexion => {
                use crate::reflexion_executor::ReflexionExecutor;

                let mut executor = ReflexionExecutor::new(
                    self.gateway.clone(),
                    self.environment.clone(),
                    self.capabilities(),
                    self.config.reflexion.clone(),
                )
                .with_testing(testing);
                if let Some(store) = &self.experience {
                    executor = executor.with_experience_store(store.clone());
                }
                Ok(Box::new(executor))
            }
            #[cfg(not(feature = "reflexion"))]
            AgentArchitecture::Reflexion => Err(ExecutorError::BuildFailed(
                "Reflexion requires 'reflexion' feature. Rebuild with --features reflexion"
                    .to_string(),
            )),
            #[cfg(feature = "lats")]
            AgentArchitecture::LATS => {
                use crate::lats::LATSExecutor;

                Ok(Box::new(LATSExecutor::new(
                    self.gateway.clone(),
                    self.environment.clone(),
                    self.capabilities(),
                    self.config.lats.clone(),
                )))
            }
            #[cfg(not(feature = "lats"))]
            AgentArchitecture::LATS => Err(ExecutorError::BuildFailed(
                "LATS requires 'lats' feature. Rebuild with --features lats".to_string(),
            )),
        }
    }

    /// Executor for the architecture named in the configuration
    pub fn create_configured(&self) -> Result<Box<dyn AgentExecutorTrait>, ExecutorError> {
        self.create(self.config.agent.architecture)
    }

    /// Detect architecture from environment or use default
    pub fn detect_architecture() -> AgentArchitecture {
        if let Ok(arch_str) = std::env::var("AGENTREE_AGENT_ARCHITECTURE") {
            if let Some(arch) = AgentArchitecture::parse(&arch_str) {
                tracing::info!(
                    architecture = %arch,
                    "Detected agent architecture from AGENTREE_AGENT_ARCHITECTURE"
                );
                return arch;
            } else {
                tracing::warn!(
                    value = %arch_str,
                    "Invalid AGENTREE_AGENT_ARCHITECTURE value, falling back to ReAct"
                );
            }
        }

        tracing::debug!("Using default ReAct architecture");
        AgentArchitecture::ReAct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_detect_architecture_default() {
        std::env::remove_var("AGENTREE_AGENT_ARCHITECTURE");
        assert_eq!(
            AgentExecutorFactory::detect_architecture(),
            AgentArchitecture::ReAct
        );
    }

    #[test]
    #[serial]
    fn test_detect_architecture_from_env() {
        std::env::set_var("AGENTREE_AGENT_ARCHITECTURE", "lats");
        let arch = AgentExecutorFactory::detect_architecture();
        std::env::remove_var("AGENTREE_AGENT_ARCHITECTURE");
        assert_eq!(arch, AgentArchitecture::LATS);
    }

    #[test]
    #[serial]
    fn test_detect_architecture_invalid_env() {
        std::env::set_var("AGENTREE_AGENT_ARCHITECTURE", "tree-of-thoughts");
        let arch = AgentExecutorFactory::detect_architecture();
        std::env::remove_var("AGENTREE_AGENT_ARCHITECTURE");
        assert_eq!(arch, AgentArchitecture::ReAct);
    }
}
