pub mod gateway;
pub mod llm_provider;
pub mod prompts;
pub mod provider_gateway;
pub mod provider_router;

pub use gateway::*;
pub use llm_provider::*;
pub use provider_gateway::ProviderGateway;
pub use provider_router::{GatewayPhase, ProviderRouter, ProviderStats};
