//! Guild configuration.
//!
//! Governor settings and logging, loaded from a TOML file.

use guild_governance::GovernorSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildConfig {
    /// Label of the deploying account
    pub deployer: String,
    /// Governor parameters
    pub governor: GovernorSettings,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            deployer: "deployer".to_string(),
            governor: GovernorSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GuildConfig {
    /// Load configuration from file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: GuildConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.deployer.trim().is_empty() {
            anyhow::bail!("deployer cannot be empty");
        }

        self.governor.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    pub level: String,
    /// Log format (json|pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn json(&self) -> bool {
        self.format == "json"
    }

    fn validate(&self) -> anyhow::Result<()> {
        match self.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => anyhow::bail!("Unknown log format '{}' (expected json or pretty)", other),
        }
    }
}
