// ABOUTME: Defines agent architecture types for runtime selection between ReAct, Reflexion and LATS
// ABOUTME: Supports configuration-driven architecture switching via AGENTREE_AGENT_ARCHITECTURE

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentArchitecture {
    #[default]
    ReAct,
    Reflexion,
    LATS,
}

impl AgentArchitecture {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "react" => Some(Self::ReAct),
            "reflexion" => Some(Self::Reflexion),
            "lats" => Some(Self::LATS),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentArchitecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReAct => write!(f, "react"),
            Self::Reflexion => write!(f, "reflexion"),
            Self::LATS => write!(f, "lats"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(AgentArchitecture::parse("LATS"), Some(AgentArchitecture::LATS));
        assert_eq!(AgentArchitecture::parse(" ReAct "), Some(AgentArchitecture::ReAct));
        assert_eq!(
            AgentArchitecture::parse("reflexion"),
            Some(AgentArchitecture::Reflexion)
        );
        assert_eq!(AgentArchitecture::parse("tot"), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for arch in [
            AgentArchitecture::ReAct,
            AgentArchitecture::Reflexion,
            AgentArchitecture::LATS,
        ] {
            assert_eq!(AgentArchitecture::parse(&arch.to_string()), Some(arch));
        }
    }
}
