use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_CONFIG_PATH: &str = "~/.bjtrainer.yml";
const DEFAULT_CONFIG_FILE_NAME: &str = ".bjtrainer.yml";

/// Split limits above this make a single trial's tree needlessly deep.
const MAX_SPLIT_ALL_LIMITS: u8 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.into(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rule: ConfigRule,
    pub ev_lookup_builder: ConfigEvLookupBuilder,
    pub ev_estimator: ConfigEvEstimator,
    pub logging: ConfigLogging,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigRule {
    pub dealer_hit_on_soft17: bool,
    pub allow_das: bool,
    pub split_all_limits: u8,
}

impl Default for ConfigRule {
    fn default() -> Self {
        let rule = bjtrainer::Rule::default();
        ConfigRule {
            dealer_hit_on_soft17: rule.dealer_hit_on_soft17,
            allow_das: rule.allow_das,
            split_all_limits: rule.split_all_limits,
        }
    }
}

impl TryFrom<ConfigRule> for bjtrainer::Rule {
    type Error = ConfigError;

    fn try_from(config_rule: ConfigRule) -> Result<Self, Self::Error> {
        if config_rule.split_all_limits > MAX_SPLIT_ALL_LIMITS {
            return Err(invalid(
                "rule.split_all_limits",
                format!("must be at most {}", MAX_SPLIT_ALL_LIMITS),
            ));
        }
        Ok(bjtrainer::Rule {
            dealer_hit_on_soft17: config_rule.dealer_hit_on_soft17,
            allow_das: config_rule.allow_das,
            split_all_limits: config_rule.split_all_limits,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigEvLookupBuilder {
    /// 0 uses every available core.
    pub number_of_threads: usize,
    pub trials_per_scenario: u32,
    pub seed: u64,
    pub output: PathBuf,
}

impl Default for ConfigEvLookupBuilder {
    fn default() -> Self {
        ConfigEvLookupBuilder {
            number_of_threads: 0,
            trials_per_scenario: bjtrainer::TABLE_TRIALS,
            seed: 0,
            output: PathBuf::from("evLookup.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigEvEstimator {
    pub trials: u32,
    /// Precomputed table to consult before simulating.
    pub table: Option<PathBuf>,
}

impl Default for ConfigEvEstimator {
    fn default() -> Self {
        ConfigEvEstimator {
            trials: bjtrainer::INTERACTIVE_TRIALS,
            table: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLogging {
    pub level: String,
}

impl Default for ConfigLogging {
    fn default() -> Self {
        ConfigLogging {
            level: String::from("info"),
        }
    }
}

impl ConfigLogging {
    pub fn level(&self) -> Result<Level, ConfigError> {
        self.level
            .parse::<Level>()
            .map_err(|_| invalid("logging.level", format!("unknown level {:?}", self.level)))
    }
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let file_content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        source,
        path: path.to_path_buf(),
    })?;
    serde_yaml::from_str(&file_content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

/// Loads `path`, or for [`DEFAULT_CONFIG_PATH`] the file in the home
/// directory. A missing default file yields the built-in defaults; a missing
/// explicit file is an error.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    if path != DEFAULT_CONFIG_PATH {
        return parse_config_from_file(path);
    }
    let config_file_path = match home::home_dir() {
        Some(home_dir) => home_dir.join(DEFAULT_CONFIG_FILE_NAME),
        None => return Ok(Config::default()),
    };
    if !config_file_path.exists() {
        return Ok(Config::default());
    }
    if config_file_path.is_dir() {
        return Err(invalid(
            "config",
            format!("{} is a directory", config_file_path.display()),
        ));
    }
    parse_config_from_file(&config_file_path)
}

/// Installs a fmt subscriber. `RUST_LOG` takes precedence over `logging`.
pub fn init_logging(logging: &ConfigLogging) -> Result<(), ConfigError> {
    let level = logging.level()?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    // Already installed (e.g. by a test harness) is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
    Ok(())
}
