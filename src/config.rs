//! Runtime configuration, read from the environment (and `.env` if present)

use std::env;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_DATA_DIR: &str = "data/ledger";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const MINING_REWARD: i64 = 10;
pub const INITIAL_BALANCE: i64 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Settings the ledger engine itself depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// Difficulty used for the first block mined after startup
    pub initial_difficulty: u32,

    /// Coins paid by the network to whoever mines a block
    pub mining_reward: i64,

    /// Balance given to every newly registered user
    pub initial_balance: i64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            initial_difficulty: DEFAULT_DIFFICULTY,
            mining_reward: MINING_REWARD,
            initial_balance: INITIAL_BALANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: String,
    pub host: String,
    pub port: u16,
    pub chain: ChainConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            chain: ChainConfig::default(),
        }
    }
}

impl Config {
    /// Loads `.env` (if any) and reads `LEDGER_*` variables over the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            data_dir: lookup("LEDGER_DATA_DIR").unwrap_or(defaults.data_dir),
            host: lookup("LEDGER_HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "LEDGER_PORT", defaults.port)?,
            chain: ChainConfig {
                initial_difficulty: parse(
                    &lookup,
                    "LEDGER_DIFFICULTY",
                    defaults.chain.initial_difficulty,
                )?,
                mining_reward: parse(&lookup, "LEDGER_MINING_REWARD", defaults.chain.mining_reward)?,
                initial_balance: parse(
                    &lookup,
                    "LEDGER_INITIAL_BALANCE",
                    defaults.chain.initial_balance,
                )?,
            },
        })
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}
