//! Session configuration, loaded from JSON.

use crate::collab::CsvSink;
use crate::session::output_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What the host needs to run one participant through one experiment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionConfig {
    pub experiment: String,
    pub participant: String,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_inter_trial_interval")]
    pub inter_trial_interval_secs: f64,
    /// Key that begins the session from `Idle`; `None` leaves it to the host.
    #[serde(default)]
    pub start_key: Option<String>,
    /// Results file name; defaults to a UTC-stamped name per participant.
    #[serde(default)]
    pub results_file: Option<String>,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("Results")
}

fn default_inter_trial_interval() -> f64 {
    1.5
}

impl SessionConfig {
    pub fn new(experiment: impl Into<String>, participant: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            participant: participant.into(),
            output_root: default_output_root(),
            inter_trial_interval_secs: default_inter_trial_interval(),
            start_key: None,
            results_file: None,
        }
    }

    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    pub fn with_inter_trial_interval(mut self, interval: Duration) -> Self {
        self.inter_trial_interval_secs = interval.as_secs_f64();
        self
    }

    pub fn with_start_key(mut self, key: impl Into<String>) -> Self {
        self.start_key = Some(key.into());
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.experiment.trim().is_empty() {
            return Err(ConfigError::Invalid("experiment name is empty".into()));
        }
        if self.participant.trim().is_empty() {
            return Err(ConfigError::Invalid("participant code is empty".into()));
        }
        if Duration::try_from_secs_f64(self.inter_trial_interval_secs).is_err() {
            return Err(ConfigError::Invalid(format!(
                "inter-trial interval {} is not a valid duration",
                self.inter_trial_interval_secs
            )));
        }
        Ok(())
    }

    /// The inter-trial interval; invalid values fall back to the default.
    pub fn inter_trial_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.inter_trial_interval_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_inter_trial_interval()))
    }

    pub fn output_dir(&self) -> PathBuf {
        output_dir(&self.output_root, &self.experiment, &self.participant)
    }

    /// CSV sink named by `results_file`, or stamped with the participant.
    pub fn csv_sink(&self) -> CsvSink {
        match &self.results_file {
            Some(name) => CsvSink::new(name.clone()),
            None => CsvSink::stamped(&self.participant),
        }
    }
}
