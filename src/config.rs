//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/prompt-kun/prompt-kun.toml`
//! 3. Local config: an explicit file passed by the host
//! 4. Environment variables: `PROMPT_KUN_*` prefix, `__` between nested keys

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::FactorPolicy;

/// Sample content of a fresh session without stored state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SeedConfig {
    /// Text of the positive sample fragment
    pub positive: String,
    /// Text of the negative sample fragment, stored without the `n!` prefix
    pub negative: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            positive: "masterpiece".into(),
            negative: "worst quality".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSeedConfig {
    pub positive: Option<String>,
    pub negative: Option<String>,
}

/// Raw settings for intermediate parsing; `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub store_dir: Option<PathBuf>,
    pub storage_key: Option<String>,
    pub factor_policy: Option<FactorPolicy>,
    pub pretty_export: Option<bool>,
    #[serde(default)]
    pub seed: RawSeedConfig,
}

/// Unified configuration for prompt-kun.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory of the file-backed store (default: ~/.prompt-kun)
    pub store_dir: PathBuf,
    /// Key holding the persisted composition
    pub storage_key: String,
    /// How group factors reach the compiled prompt
    pub factor_policy: FactorPolicy,
    /// Pretty-print copied and exported blobs
    pub pretty_export: bool,
    pub seed: SeedConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: dirs_default_store_dir(),
            storage_key: "prompt-kun".into(),
            factor_policy: FactorPolicy::default(),
            pretty_export: true,
            seed: SeedConfig::default(),
        }
    }
}

fn dirs_default_store_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".prompt-kun"))
        .unwrap_or_else(|| PathBuf::from("~/.prompt-kun"))
}

/// Get the XDG config directory for prompt-kun.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "prompt-kun").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("prompt-kun.toml"))
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    parse_raw_settings(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn parse_raw_settings(content: &str) -> Result<RawSettings, toml::de::Error> {
    toml::from_str(content)
}

impl Settings {
    /// Expand `~`, `$VAR` and `${VAR}` in the store directory.
    fn expand_paths(&mut self) {
        let raw = self.store_dir.to_string_lossy().to_string();
        let expanded = shellexpand::full(&raw)
            .map(|s| s.into_owned())
            .unwrap_or(raw);
        self.store_dir = PathBuf::from(expanded);
    }

    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store_dir: overlay
                .store_dir
                .clone()
                .unwrap_or_else(|| self.store_dir.clone()),
            storage_key: overlay
                .storage_key
                .clone()
                .unwrap_or_else(|| self.storage_key.clone()),
            factor_policy: overlay.factor_policy.unwrap_or(self.factor_policy),
            pretty_export: overlay.pretty_export.unwrap_or(self.pretty_export),
            seed: SeedConfig {
                positive: overlay
                    .seed
                    .positive
                    .clone()
                    .unwrap_or_else(|| self.seed.positive.clone()),
                negative: overlay
                    .seed
                    .negative
                    .clone()
                    .unwrap_or_else(|| self.seed.negative.clone()),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_config` - Optional host-specific TOML file; must exist when given
    pub fn load(local_config: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(local_path) = local_config {
            let raw = load_raw_settings(local_path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply `PROMPT_KUN_*` environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // config crate only does the env var parsing
        let config = Config::builder()
            .add_source(Environment::with_prefix("PROMPT_KUN").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("store_dir") {
            settings.store_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("storage_key") {
            settings.storage_key = val;
        }
        if let Ok(val) = config.get_string("factor_policy") {
            settings.factor_policy = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_bool("pretty_export") {
            settings.pretty_export = val;
        }
        if let Ok(val) = config.get_string("seed.positive") {
            settings.seed.positive = val;
        }
        if let Ok(val) = config.get_string("seed.negative") {
            settings.seed.negative = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.storage_key.trim().is_empty() {
            return Err(ApplicationError::Config {
                message: "storage_key must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# prompt-kun configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/prompt-kun/prompt-kun.toml
#   Local:  file passed by the embedding host
#   Env:    PROMPT_KUN_* environment variables (PROMPT_KUN_SEED__POSITIVE for [seed])

# Directory of the file-backed store
# store_dir = "~/.prompt-kun"

# Key holding the persisted composition (<store_dir>/<storage_key>.json)
# storage_key = "prompt-kun"

# Group factors: "wrap" wraps a group's joined output once,
# "inherit" hands the factor to its fragments instead
# factor_policy = "wrap"

# Pretty-print copied and exported compositions
# pretty_export = true

[seed]
# Content of a fresh session
# positive = "masterpiece"
# negative = "worst quality"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
