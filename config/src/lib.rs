//! Configuration for Canopy.
//!
//! Loaded from TOML. The file is looked up, in order, at the path passed on the
//! command line, at `$CANOPY_CONFIG`, and at `~/.canopy/config.toml`. A missing
//! default file means defaults; every other section and field is optional too.
//!
//! String values may reference environment variables as `${NAME}`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use canopy_core::{DEFAULT_AGGREGATE_COUNT, MaterializeOptions, Strategy};
use canopy_types::LevelProgression;
use serde::Deserialize;

pub const CONFIG_ENV_VAR: &str = "CANOPY_CONFIG";

const DEFAULT_LATENCY_MS: u64 = 100;
const DEFAULT_MIN_BRANCHING: usize = 5;
const DEFAULT_MAX_BRANCHING: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CanopyConfig {
    pub lookup: LookupConfig,
    pub materialize: MaterializeConfig,
    pub aggregate: AggregateConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Randomized data with a fixed latency.
    #[default]
    Simulated,
    /// JSON over HTTP at `base_url`.
    Http,
    /// Records loaded from the JSON file at `fixture`.
    Fixture,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LookupConfig {
    pub backend: BackendKind,
    pub latency_ms: u64,
    pub min_branching: usize,
    /// Exclusive upper bound.
    pub max_branching: usize,
    /// Type labels whose simulated records never have children.
    pub leaf_types: Vec<String>,
    pub base_url: Option<String>,
    pub fixture: Option<PathBuf>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            latency_ms: DEFAULT_LATENCY_MS,
            min_branching: DEFAULT_MIN_BRANCHING,
            max_branching: DEFAULT_MAX_BRANCHING,
            leaf_types: vec!["service".to_string()],
            base_url: None,
            fixture: None,
        }
    }
}

impl LookupConfig {
    #[must_use]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MaterializeConfig {
    pub strategy: Strategy,
    pub levels: LevelProgression,
    /// Defaults to the number of levels.
    pub max_depth: Option<usize>,
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            levels: LevelProgression::default(),
            max_depth: None,
        }
    }
}

impl MaterializeConfig {
    #[must_use]
    pub fn options(&self) -> MaterializeOptions {
        let options = MaterializeOptions::default()
            .with_strategy(self.strategy)
            .with_levels(self.levels.clone());
        match self.max_depth {
            Some(max_depth) => options.with_max_depth(max_depth),
            None => options,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AggregateConfig {
    pub count: usize,
    pub latency_ms: u64,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_AGGREGATE_COUNT,
            latency_ms: DEFAULT_LATENCY_MS,
        }
    }
}

impl AggregateConfig {
    #[must_use]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl CanopyConfig {
    /// Load the config, falling back to defaults when no file exists at the
    /// default location. An explicitly named file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => match env::var_os(CONFIG_ENV_VAR) {
                Some(path) => (PathBuf::from(path), true),
                None => match config_path() {
                    Some(path) => (path, false),
                    None => return Ok(Self::default()),
                },
            },
        };

        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read { path, source: err });
            }
        };

        let config = Self::parse(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, source);
                ConfigError::Parse {
                    path: path.clone(),
                    source,
                }
            }
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate TOML content. Parse errors carry an empty path.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.expand_env();
        config.validate()?;
        Ok(config)
    }

    fn expand_env(&mut self) {
        if let Some(base_url) = &self.lookup.base_url {
            self.lookup.base_url = Some(expand_env_vars(base_url));
        }
        if let Some(fixture) = &self.lookup.fixture
            && let Some(raw) = fixture.to_str()
        {
            self.lookup.fixture = Some(PathBuf::from(expand_env_vars(raw)));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let lookup = &self.lookup;
        if lookup.min_branching >= lookup.max_branching {
            return Err(ConfigError::Invalid(format!(
                "lookup.min_branching ({}) must be below lookup.max_branching ({})",
                lookup.min_branching, lookup.max_branching
            )));
        }
        match lookup.backend {
            BackendKind::Http if lookup.base_url.as_deref().is_none_or(str::is_empty) => {
                return Err(ConfigError::Invalid(
                    "lookup.base_url is required for the http backend".to_string(),
                ));
            }
            BackendKind::Fixture if lookup.fixture.is_none() => {
                return Err(ConfigError::Invalid(
                    "lookup.fixture is required for the fixture backend".to_string(),
                ));
            }
            _ => {}
        }
        let deepest = self.materialize.levels.deepest();
        if lookup.backend == BackendKind::Simulated
            && !lookup.leaf_types.iter().any(|leaf| leaf == deepest)
        {
            return Err(ConfigError::Invalid(format!(
                "lookup.leaf_types must include the deepest level {deepest:?}, \
                 or simulated trees never stop branching"
            )));
        }
        if self.materialize.max_depth == Some(0) {
            return Err(ConfigError::Invalid(
                "materialize.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Replace `${NAME}` with the value of environment variable `NAME`.
///
/// Unset variables expand to nothing. An unclosed `${` is kept verbatim.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + end_rel];
        if !name.is_empty() {
            out.push_str(&env::var(name).unwrap_or_default());
        }
        rest = &rest[start + 3 + end_rel..];
    }

    out.push_str(rest);
    out
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".canopy").join("config.toml"))
}
