// ABOUTME: Routes LLM requests to appropriate providers based on gateway phase
// ABOUTME: Supports different models for thoughts, actions, evaluation, and reflection

use crate::llm_provider::LLMProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayPhase {
    Thought,
    Action,
    Evaluation,
    Reflection,
}

impl std::fmt::Display for GatewayPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thought => write!(f, "thought"),
            Self::Action => write!(f, "action"),
            Self::Evaluation => write!(f, "evaluation"),
            Self::Reflection => write!(f, "reflection"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderStats {
    pub default_provider: String,
    pub phase_providers: HashMap<String, String>,
}

/// Routes LLM requests to a provider per gateway phase.
///
/// Phases without a dedicated provider fall back to the default one, so a
/// single-model setup needs nothing beyond [`ProviderRouter::new`].
pub struct ProviderRouter {
    providers: HashMap<GatewayPhase, Arc<dyn LLMProvider>>,
    default_provider: Arc<dyn LLMProvider>,
}

impl ProviderRouter {
    pub fn new(default_provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider,
        }
    }

    /// Use `provider` for `phase` instead of the default
    pub fn with_phase_provider(
        mut self,
        phase: GatewayPhase,
        provider: Arc<dyn LLMProvider>,
    ) -> Self {
        self.providers.insert(phase, provider);
        self
    }

    pub fn get_provider(&self, phase: GatewayPhase) -> Arc<dyn LLMProvider> {
        self.providers
            .get(&phase)
            .cloned()
            .unwrap_or_else(|| self.default_provider.clone())
    }

    /// Which providers serve which phases, for debugging and monitoring
    pub fn stats(&self) -> ProviderStats {
        ProviderStats {
            default_provider: self.default_provider.provider_name().to_string(),
            phase_providers: self
                .providers
                .iter()
                .map(|(phase, provider)| {
                    (format!("{}", phase), provider.provider_name().to_string())
                })
                .collect(),
        }
    }

    pub fn has_phase_provider(&self, phase: GatewayPhase) -> bool {
        self.providers.contains_key(&phase)
    }

    pub fn unique_provider_count(&self) -> usize {
        let mut unique_providers = std::collections::HashSet::new();
        unique_providers.insert(self.default_provider.provider_name());
        for provider in self.providers.values() {
            unique_providers.insert(provider.provider_name());
        }
        unique_providers.len()
    }
}
