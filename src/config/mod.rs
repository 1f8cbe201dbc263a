mod defaults;
mod types;

pub use types::*;

use crate::error::ConfigError;
use defaults::*;
use std::path::Path;

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            timeout_sec: default_timeout_sec(),
            report_dir: default_report_dir(),
            interaction_log: None,
            providers: ProvidersConfig::default(),
            defaults: StageConfig::default(),
            agentic: AgenticConfig::default(),
            prompt_limits: PromptLimits::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        let revision = &self.agentic.revision;
        if revision.hard_limit == 0 || revision.soft_limit > revision.hard_limit {
            return Err(ConfigError::RevisionLimits {
                soft: revision.soft_limit,
                hard: revision.hard_limit,
            });
        }

        if self.timeout_sec == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.defaults.model.trim().is_empty() {
            return Err(ConfigError::MissingModel("default".to_string()));
        }

        Ok(())
    }
}
