use crate::agent_architecture::AgentArchitecture;
use crate::benchmark::Benchmark;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Main configuration for agentree
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentreeConfig {
    /// Agent selection
    #[serde(default)]
    pub agent: AgentConfig,

    /// LLM provider and pricing
    #[serde(default)]
    pub llm: LLMConfig,

    /// Tree search parameters
    #[serde(default)]
    pub lats: LatsConfig,

    /// Stand-alone ReAct/Reflexion loop parameters
    #[serde(default)]
    pub reflexion: ReflexionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub architecture: AgentArchitecture,

    #[serde(default = "default_benchmark")]
    pub benchmark: Benchmark,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            architecture: AgentArchitecture::default(),
            benchmark: default_benchmark(),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider name, used for logging and routing
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default)]
    pub model: Option<String>,

    /// Sampling temperature for thought/action generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Maximum prompt tokens; enforced by the provider, not the agents
    #[serde(default)]
    pub token_budget: Option<usize>,

    /// USD per 1000 prompt tokens
    #[serde(default)]
    pub prompt_cost_per_1k: f64,

    /// USD per 1000 completion tokens
    #[serde(default)]
    pub completion_cost_per_1k: f64,

    /// Extra attempts after a failed provider call
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            token_budget: None,
            prompt_cost_per_1k: 0.0,
            completion_cost_per_1k: 0.0,
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// LATS controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatsConfig {
    /// Candidates drawn per expansion
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,

    /// Cap on stored reflections
    #[serde(default = "default_lats_max_reflections")]
    pub max_reflections: usize,

    /// Maximum trajectory depth
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,

    /// Cap on distinct failed trajectories considered for reflection
    #[serde(default = "default_max_unique")]
    pub max_unique: usize,

    /// Memoize evaluation scores by trajectory text
    #[serde(default = "default_true")]
    pub cache_values: bool,

    /// Report a fixed wall-clock time instead of measuring it
    #[serde(default)]
    pub testing: bool,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for LatsConfig {
    fn default() -> Self {
        Self {
            n_samples: default_n_samples(),
            max_reflections: default_lats_max_reflections(),
            depth_limit: default_depth_limit(),
            max_unique: default_max_unique(),
            cache_values: true,
            testing: false,
            max_iterations: default_max_iterations(),
        }
    }
}

/// ReAct / Reflexion loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflexionConfig {
    /// Think/act/observe steps per trial
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    #[serde(default = "default_max_trials")]
    pub max_trials: usize,

    #[serde(default = "default_reflexion_max_reflections")]
    pub max_reflections: usize,

    /// Consecutive failed trials before a reflection is generated
    #[serde(default = "default_patience")]
    pub patience: usize,
}

impl Default for ReflexionConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_trials: default_max_trials(),
            max_reflections: default_reflexion_max_reflections(),
            patience: default_patience(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// pretty or compact
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_benchmark() -> Benchmark {
    Benchmark::HotpotQA
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> usize {
    512
}
fn default_retry_attempts() -> usize {
    2
}
fn default_retry_backoff_ms() -> u64 {
    250
}
fn default_n_samples() -> usize {
    5
}
fn default_lats_max_reflections() -> usize {
    4
}
fn default_depth_limit() -> usize {
    7
}
fn default_max_unique() -> usize {
    5
}
fn default_true() -> bool {
    true
}
fn default_max_iterations() -> usize {
    30
}
fn default_max_steps() -> usize {
    6
}
fn default_max_trials() -> usize {
    3
}
fn default_reflexion_max_reflections() -> usize {
    3
}
fn default_patience() -> usize {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with file discovery and environment overrides
pub struct ConfigManager {
    config: AgentreeConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.agentree.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!(target: "config", "Loading agentree configuration");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        info!(
            target: "config",
            path = ?config_path,
            architecture = %config.agent.architecture,
            benchmark = %config.agent.benchmark,
            provider = %config.llm.provider,
            "Configuration loaded"
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Parse and validate a TOML document, without file discovery or env overrides
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AgentreeConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    /// Load a specific file, then apply environment overrides
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::apply_env_overrides(Self::read_toml_file(path)?);
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!(target: "config", "Failed to load .env file: {}", e);
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".agentree.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!(target: "config", "Failed to load .agentree.env: {}", e);
                }
            }
        }
    }

    /// Search order: ./.agentree.toml, ~/.agentree/config.toml, defaults
    fn load_config_file() -> Result<(AgentreeConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".agentree.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".agentree").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!(target: "config", "No config file found, using defaults");
        Ok((AgentreeConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<AgentreeConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: AgentreeConfig) -> AgentreeConfig {
        if let Ok(arch) = std::env::var("AGENTREE_AGENT_ARCHITECTURE") {
            match AgentArchitecture::parse(&arch) {
                Some(parsed) => config.agent.architecture = parsed,
                None => warn!(target: "config", value = %arch, "Ignoring invalid AGENTREE_AGENT_ARCHITECTURE"),
            }
        }
        if let Ok(benchmark) = std::env::var("AGENTREE_BENCHMARK") {
            match Benchmark::parse(&benchmark) {
                Some(parsed) => config.agent.benchmark = parsed,
                None => warn!(target: "config", value = %benchmark, "Ignoring invalid AGENTREE_BENCHMARK"),
            }
        }

        if let Ok(provider) = std::env::var("AGENTREE_LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("AGENTREE_MODEL") {
            config.llm.model = Some(model);
        }
        if let Ok(temp) = std::env::var("AGENTREE_TEMPERATURE") {
            if let Ok(t) = temp.parse() {
                config.llm.temperature = t;
            }
        }
        if let Ok(max_tokens) = std::env::var("AGENTREE_MAX_TOKENS") {
            if let Ok(m) = max_tokens.parse() {
                config.llm.max_tokens = m;
            }
        }

        if let Ok(n) = std::env::var("AGENTREE_N_SAMPLES") {
            if let Ok(n) = n.parse() {
                config.lats.n_samples = n;
            }
        }
        if let Ok(depth) = std::env::var("AGENTREE_DEPTH_LIMIT") {
            if let Ok(d) = depth.parse() {
                config.lats.depth_limit = d;
            }
        }
        if let Ok(iterations) = std::env::var("AGENTREE_MAX_ITERATIONS") {
            if let Ok(i) = iterations.parse() {
                config.lats.max_iterations = i;
            }
        }
        if let Ok(cache) = std::env::var("AGENTREE_CACHE_VALUES") {
            config.lats.cache_values = cache == "1" || cache.to_lowercase() == "true";
        }
        if let Ok(testing) = std::env::var("AGENTREE_TESTING") {
            config.lats.testing = testing == "1" || testing.to_lowercase() == "true";
        }

        if let Ok(level) = std::env::var("AGENTREE_LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }

    pub fn validate_config(config: &AgentreeConfig) -> Result<(), ConfigError> {
        if config.lats.n_samples == 0 {
            return Err(ConfigError::ValidationError(
                "lats.n_samples must be at least 1".to_string(),
            ));
        }
        if config.lats.depth_limit == 0 {
            return Err(ConfigError::ValidationError(
                "lats.depth_limit must be at least 1".to_string(),
            ));
        }
        if config.lats.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "lats.max_iterations must be at least 1".to_string(),
            ));
        }
        if config.reflexion.max_steps == 0 || config.reflexion.max_trials == 0 {
            return Err(ConfigError::ValidationError(
                "reflexion.max_steps and reflexion.max_trials must be at least 1".to_string(),
            ));
        }
        if config.llm.prompt_cost_per_1k < 0.0 || config.llm.completion_cost_per_1k < 0.0 {
            return Err(ConfigError::ValidationError(
                "LLM token costs must not be negative".to_string(),
            ));
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &AgentreeConfig {
        &self.config
    }

    pub fn into_config(self) -> AgentreeConfig {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Write the default configuration to `path`
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = AgentreeConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}
