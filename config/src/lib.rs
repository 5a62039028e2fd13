//! Configuration for deduct, read from `~/.deduct/config.toml`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use deduct_checker::CheckerConfig;
use deduct_types::{RuleKind, UnknownRule};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct DeductConfig {
    pub verification: Option<VerificationConfig>,
    pub rules: Option<RulesConfig>,
    /// External checker; without it every check runs in process.
    pub checker: Option<CheckerConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerificationConfig {
    /// Quiet period after an edit before the line verifies itself.
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RulesConfig {
    /// Rule identifiers the proofs are restricted to; empty allows all.
    #[serde(default)]
    pub restricted: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{source} in [rules] of {}", path.display())]
    UnknownRule { path: PathBuf, source: UnknownRule },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::UnknownRule { path, .. } => path,
        }
    }
}

/// Replaces every `${VAR}` with the variable's value; unset variables expand
/// to nothing and an unterminated `${` is kept as written.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        if !name.is_empty() {
            out.push_str(&env::var(name).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    out
}

impl DeductConfig {
    /// Loads the default config file. `Ok(None)` when there is none.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    /// Loads and checks a config file. Rule names must be known and
    /// `${VAR}` references in the checker command are expanded.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| {
            tracing::warn!("Failed to parse config at {}: {source}", path.display());
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;

        config
            .restricted_rules()
            .map_err(|source| ConfigError::UnknownRule {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(checker) = &mut config.checker {
            checker.command = expand_env_vars(&checker.command);
            for arg in &mut checker.args {
                *arg = expand_env_vars(arg);
            }
        }
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// The rules proofs are restricted to.
    pub fn restricted_rules(&self) -> Result<BTreeSet<RuleKind>, UnknownRule> {
        self.rules
            .iter()
            .flat_map(|rules| &rules.restricted)
            .map(|name| name.parse())
            .collect()
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        let millis = self
            .verification
            .as_ref()
            .and_then(|verification| verification.debounce_ms)
            .unwrap_or(DEFAULT_DEBOUNCE_MS);
        Duration::from_millis(millis)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".deduct").join("config.toml"))
}
