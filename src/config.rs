//! Engine configuration: fork-join pool sizing, branch timeout, registry duplicate policy.
//!
//! Loaded from a JSON file (all fields optional) and then overridden by environment variables:
//!
//! - `PIPELINE_FORK_JOIN_PARALLELISM`: branch pool size
//! - `PIPELINE_BRANCH_TIMEOUT_MS`: per-branch join timeout in milliseconds
//! - `PIPELINE_REGISTRY_ON_DUPLICATE`: `reject` or `overwrite`

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

pub const ENV_PARALLELISM: &str = "PIPELINE_FORK_JOIN_PARALLELISM";
pub const ENV_BRANCH_TIMEOUT_MS: &str = "PIPELINE_BRANCH_TIMEOUT_MS";
pub const ENV_ON_DUPLICATE: &str = "PIPELINE_REGISTRY_ON_DUPLICATE";

const DEFAULT_PARALLELISM: usize = 5;
const DEFAULT_BRANCH_TIMEOUT_MS: u64 = 10_000;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
  pub fork_join: ForkJoinConfig,
  pub registry: RegistryConfig,
}

/// Settings of the per-operator branch pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForkJoinConfig {
  /// Maximum number of branches running at once.
  pub parallelism: usize,
  /// How long the join step waits for each branch.
  pub branch_timeout_ms: u64,
}

impl Default for ForkJoinConfig {
  fn default() -> Self {
    Self {
      parallelism: DEFAULT_PARALLELISM,
      branch_timeout_ms: DEFAULT_BRANCH_TIMEOUT_MS,
    }
  }
}

impl ForkJoinConfig {
  pub fn branch_timeout(&self) -> Duration {
    Duration::from_millis(self.branch_timeout_ms)
  }
}

/// What the node registry does when a type tag is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
  #[default]
  Reject,
  Overwrite,
}

impl std::str::FromStr for DuplicatePolicy {
  type Err = PipelineError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "reject" => Ok(DuplicatePolicy::Reject),
      "overwrite" => Ok(DuplicatePolicy::Overwrite),
      other => Err(PipelineError::Config(format!(
        "unknown duplicate policy '{}', expected 'reject' or 'overwrite'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
  pub on_duplicate: DuplicatePolicy,
}

impl EngineConfig {
  /// Loads a JSON config file. Missing fields take their defaults.
  #[instrument(level = "trace", skip(path))]
  pub fn load(path: &Path) -> Result<Self> {
    let bytes = std::fs::read(path)
      .map_err(|e| PipelineError::Config(format!("reading {}: {}", path.display(), e)))?;
    let config: EngineConfig = serde_json::from_slice(&bytes)
      .map_err(|e| PipelineError::Config(format!("parsing {}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
  }

  /// Applies environment overrides on top of `self`.
  pub fn with_env_overrides(self) -> Result<Self> {
    self.with_overrides(|key| std::env::var(key).ok())
  }

  /// Applies overrides from an arbitrary key lookup (the environment in production).
  pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    if let Some(v) = lookup(ENV_PARALLELISM) {
      self.fork_join.parallelism = v
        .trim()
        .parse::<usize>()
        .map_err(|e| PipelineError::Config(format!("{}={}: {}", ENV_PARALLELISM, v, e)))?;
      debug!(parallelism = self.fork_join.parallelism, "parallelism overridden");
    }
    if let Some(v) = lookup(ENV_BRANCH_TIMEOUT_MS) {
      self.fork_join.branch_timeout_ms = v
        .trim()
        .parse::<u64>()
        .map_err(|e| PipelineError::Config(format!("{}={}: {}", ENV_BRANCH_TIMEOUT_MS, v, e)))?;
      debug!(
        branch_timeout_ms = self.fork_join.branch_timeout_ms,
        "branch timeout overridden"
      );
    }
    if let Some(v) = lookup(ENV_ON_DUPLICATE) {
      self.registry.on_duplicate = v.parse()?;
    }
    self.validate()?;
    Ok(self)
  }

  pub fn validate(&self) -> Result<()> {
    if self.fork_join.parallelism == 0 {
      return Err(PipelineError::Config(
        "forkJoin.parallelism must be at least 1".to_string(),
      ));
    }
    if self.fork_join.branch_timeout_ms == 0 {
      return Err(PipelineError::Config(
        "forkJoin.branchTimeoutMs must be positive".to_string(),
      ));
    }
    Ok(())
  }
}
