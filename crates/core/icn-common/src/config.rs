//! Validator configuration
use serde::{Deserialize, Serialize};
use std::{
    env,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use crate::error::{Error, Result};

/// Base trait for all configuration types
pub trait Configuration: Serialize + for<'de> Deserialize<'de> + Default {
    /// Validate the configuration
    fn validate(&self) -> Result<()>;

    /// Apply overrides from environment variables with the given prefix
    fn apply_env(&mut self, prefix: &str) -> Result<()>;

    /// Load configuration from a file
    fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::configuration(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| Error::configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Load configuration from defaults plus environment variables with the given prefix
    fn from_env(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(prefix)?;
        config.validate()?;
        Ok(config)
    }
}

/// How `ExecuteProposal` decides whether enough votes were cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumMode {
    /// Raw vote count against the percentage constant: `total * 100 >= quorum`
    #[default]
    Literal,
    /// Votes cast as a share of the registry's member count
    Electorate,
}

/// How `CastVote` decides whether a proposal is still open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDeadlineMode {
    /// The proposal's own creation time against its own deadline
    #[default]
    Literal,
    /// The caller-supplied reference time against the deadline
    SubmissionBound,
}

/// Who may replace governance parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamsAuthorization {
    /// Any authorizing identity
    #[default]
    AnySigner,
    /// At least one authorizing identity must be a registry admin
    RegistryAdmin,
}

macro_rules! impl_mode_from_str {
    ($ty:ty, $($name:literal => $variant:expr),+ $(,)?) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(Error::configuration(format!(
                        "Invalid value for {}: {}", stringify!($ty), other
                    ))),
                }
            }
        }
    };
}

impl_mode_from_str!(QuorumMode,
    "literal" => QuorumMode::Literal,
    "electorate" => QuorumMode::Electorate,
);

impl_mode_from_str!(VoteDeadlineMode,
    "literal" => VoteDeadlineMode::Literal,
    "submission_bound" => VoteDeadlineMode::SubmissionBound,
);

impl_mode_from_str!(ParamsAuthorization,
    "any_signer" => ParamsAuthorization::AnySigner,
    "registry_admin" => ParamsAuthorization::RegistryAdmin,
);

/// Configuration shared by the treasury and governance validators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub quorum_mode: QuorumMode,

    #[serde(default)]
    pub vote_deadline: VoteDeadlineMode,

    #[serde(default)]
    pub params_authorization: ParamsAuthorization,

    /// Required approvals for transaction types missing from a treasury's thresholds
    #[serde(default = "default_required_approvals")]
    pub default_required_approvals: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_required_approvals() -> u32 {
    2
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
            quorum_mode: QuorumMode::default(),
            vote_deadline: VoteDeadlineMode::default(),
            params_authorization: ParamsAuthorization::default(),
            default_required_approvals: default_required_approvals(),
        }
    }
}

fn env_var(prefix: &str, name: &str) -> Option<String> {
    env::var(format!("{}_{}", prefix, name)).ok()
}

impl Configuration for ValidatorConfig {
    fn validate(&self) -> Result<()> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {},
            _ => return Err(Error::configuration(format!(
                "Invalid log level: {}", self.log_level
            ))),
        }

        if self.default_required_approvals == 0 {
            return Err(Error::configuration(
                "default_required_approvals must be at least 1",
            ));
        }

        Ok(())
    }

    fn apply_env(&mut self, prefix: &str) -> Result<()> {
        if let Some(level) = env_var(prefix, "LOG_LEVEL") {
            self.log_level = level.to_ascii_lowercase();
        }
        if let Some(dir) = env_var(prefix, "LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(mode) = env_var(prefix, "QUORUM_MODE") {
            self.quorum_mode = mode.parse()?;
        }
        if let Some(mode) = env_var(prefix, "VOTE_DEADLINE") {
            self.vote_deadline = mode.parse()?;
        }
        if let Some(mode) = env_var(prefix, "PARAMS_AUTHORIZATION") {
            self.params_authorization = mode.parse()?;
        }
        if let Some(count) = env_var(prefix, "DEFAULT_REQUIRED_APPROVALS") {
            self.default_required_approvals = count.parse().map_err(|e| Error::configuration(format!(
                "Invalid value for {}_DEFAULT_REQUIRED_APPROVALS: {}", prefix, e
            )))?;
        }
        Ok(())
    }
}
