use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, WorkflowError};
use crate::naming::NamingPolicy;
use crate::workflow::WorkflowSettings;

/// Main configuration structure for taskflow
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskflowConfig {
    /// Branch handling
    pub workflow: WorkflowConfig,
    /// Branch and tag name prefixes
    pub naming: NamingPolicy,
    /// External review tool
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Branch releases are merged into and tagged on
    pub mainline: String,
    /// Remote integration branches and tags are pushed to
    pub remote: String,
    /// Merge attempts per merge step before giving up on conflicts
    pub max_conflict_attempts: u32,
    /// Word the operator types once conflicts are resolved
    pub confirm_word: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            mainline: "master".to_string(),
            remote: "origin".to_string(),
            max_conflict_attempts: 10,
            confirm_word: "continue".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Review tool executable, `arc` for Phabricator
    pub program: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            program: "arc".to_string(),
        }
    }
}

pub const CONFIG_FILE: &str = "taskflow.toml";
pub const RC_FILE: &str = ".taskflow-rc";
pub const ENV_PREFIX: &str = "TASKFLOW";

impl TaskflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files in the working copy (taskflow.toml, .taskflow-rc)
    /// 3. Environment variables (TASKFLOW_<SECTION>__<KEY>)
    pub fn load(workdir: &Path) -> Result<Self> {
        let builder = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(
                File::from(workdir.join(CONFIG_FILE))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                File::from(workdir.join(RC_FILE))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: TaskflowConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a .env file from the working copy if it exists
    pub fn load_env_file(workdir: &Path) -> Result<()> {
        let path = workdir.join(".env");
        if path.exists() {
            dotenvy::from_path(&path)
                .map_err(|e| WorkflowError::Config(format!("{}: {e}", path.display())))?;
            tracing::debug!(path = %path.display(), "loaded environment file");
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("workflow.mainline", &self.workflow.mainline),
            ("workflow.remote", &self.workflow.remote),
            ("workflow.confirm_word", &self.workflow.confirm_word),
            ("naming.integration_prefix", &self.naming.integration_prefix),
            ("naming.release_prefix", &self.naming.release_prefix),
            ("review.program", &self.review.program),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(WorkflowError::Config(format!("{key} must not be empty")));
            }
        }
        if self.workflow.max_conflict_attempts == 0 {
            return Err(WorkflowError::Config(
                "workflow.max_conflict_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            mainline: self.workflow.mainline.clone(),
            naming: self.naming.clone(),
            max_conflict_attempts: self.workflow.max_conflict_attempts,
        }
    }
}
