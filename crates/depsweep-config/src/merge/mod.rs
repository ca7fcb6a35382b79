//! Configuration layering: defaults, `depsweep.toml`, environment overrides

use camino::{Utf8Path, Utf8PathBuf};
use depsweep_core::DepsweepError;
use std::collections::HashMap;
use tracing::debug;

use crate::engine::{CacheConfig, EngineConfig};
use crate::ConfigResult;

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "depsweep.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "DEPSWEEP_";

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Built-in defaults only
    Defaults,
    /// Project depsweep.toml file
    ProjectToml(Utf8PathBuf),
}

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Directory the search for depsweep.toml starts from
    cwd: Utf8PathBuf,
}

impl ConfigLoader {
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Find the nearest configuration file, walking up the directory tree
    pub fn find_config_file(&self) -> Option<Utf8PathBuf> {
        let mut current: Option<&Utf8Path> = Some(self.cwd.as_path());
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            current = dir.parent();
        }
        None
    }

    /// Load the layered configuration using the process environment
    pub async fn load(&self) -> ConfigResult<(EngineConfig, ConfigSource)> {
        self.load_with_env(&Self::collect_env_overrides()).await
    }

    /// Load the layered configuration with explicit environment overrides
    pub async fn load_with_env(
        &self,
        env: &HashMap<String, String>,
    ) -> ConfigResult<(EngineConfig, ConfigSource)> {
        let (mut config, source) = match self.find_config_file() {
            Some(path) => {
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| DepsweepError::io(format!("Failed to read {}", path), e))?;
                let config = EngineConfig::from_toml_str(&content)?;
                debug!(path = %path, "Loaded configuration file");
                (config, ConfigSource::ProjectToml(path))
            },
            None => (EngineConfig::default(), ConfigSource::Defaults),
        };

        Self::apply_env_overrides(&mut config, env)?;
        config.validate()?;
        Ok((config, source))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(config: &mut EngineConfig, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "DEPSWEEP_MAX_DEPTH" => {
                    config.max_depth = match value.trim() {
                        "" | "none" | "unlimited" => None,
                        depth => Some(parse_number(key, depth)?),
                    };
                },
                "DEPSWEEP_MAX_WORKERS" => {
                    config.max_workers = parse_number(key, value)?;
                },
                "DEPSWEEP_AUDIT_WORKERS" => {
                    config.audit_workers = parse_number(key, value)?;
                },
                "DEPSWEEP_MAX_RETRIES" => {
                    config.max_retries = parse_number(key, value)?;
                },
                "DEPSWEEP_CLEAR_CACHE" => {
                    config.clear_cache = parse_flag(key, value)?;
                },
                "DEPSWEEP_AUDIT" => {
                    config.audit = parse_flag(key, value)?;
                },
                "DEPSWEEP_CACHE_PATH" => {
                    config.cache = match value.trim() {
                        "" | "memory" => CacheConfig::Memory,
                        path => CacheConfig::File {
                            path: Utf8PathBuf::from(path),
                        },
                    };
                },
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| DepsweepError::ConfigValidation {
        field: key.to_string(),
        reason: format!("expected a non-negative integer, got '{}': {}", value, e),
    })
}

fn parse_flag(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(DepsweepError::ConfigValidation {
            field: key.to_string(),
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}
