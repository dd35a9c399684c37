use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub events_path: String,
    pub output_path: String,
    pub prices_path: Option<String>,
    pub tokens_path: Option<String>,
    pub batch_size: usize,
    pub protocol: ProtocolConfig,
}

/// How deposits mint shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareAccounting {
    /// Shares minted pro rata against the pooled balance.
    Pooled,
    /// One share per raw unit deposited.
    OneToOne,
}

/// Knobs that distinguish one lending deployment from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub network: String,
    pub share_accounting: ShareAccounting,
    /// Borrowed funds are re-deposited on the borrower's behalf.
    pub borrow_creates_deposit: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            id: "burrow".to_string(),
            name: "Burrow".to_string(),
            slug: "burrow".to_string(),
            network: "near".to_string(),
            share_accounting: ShareAccounting::Pooled,
            borrow_creates_deposit: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let events_path = env_map
            .get("EVENTS_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("EVENTS_PATH".to_string()))?;

        let output_path = env_map
            .get("OUTPUT_PATH")
            .cloned()
            .unwrap_or_else(|| "ledger_state.json".to_string());

        let prices_path = env_map.get("PRICES_PATH").cloned();
        let tokens_path = env_map.get("TOKENS_PATH").cloned();

        let batch_size = env_map
            .get("BATCH_SIZE")
            .map(|s| s.as_str())
            .unwrap_or("1000")
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "BATCH_SIZE".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let share_accounting = match env_map
            .get("SHARE_ACCOUNTING")
            .map(|s| s.as_str())
            .unwrap_or("pooled")
        {
            "pooled" => ShareAccounting::Pooled,
            "one_to_one" => ShareAccounting::OneToOne,
            other => {
                return Err(ConfigError::InvalidValue(
                    "SHARE_ACCOUNTING".to_string(),
                    format!("must be pooled or one_to_one, got {}", other),
                ))
            }
        };

        let borrow_creates_deposit = match env_map
            .get("BORROW_CREATES_DEPOSIT")
            .map(|s| s.as_str())
            .unwrap_or("true")
        {
            "true" => true,
            "false" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "BORROW_CREATES_DEPOSIT".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        let defaults = ProtocolConfig::default();
        let protocol = ProtocolConfig {
            id: env_map.get("PROTOCOL_ID").cloned().unwrap_or(defaults.id),
            name: env_map.get("PROTOCOL_NAME").cloned().unwrap_or(defaults.name),
            slug: env_map.get("PROTOCOL_SLUG").cloned().unwrap_or(defaults.slug),
            network: env_map.get("NETWORK").cloned().unwrap_or(defaults.network),
            share_accounting,
            borrow_creates_deposit,
        };

        Ok(Config {
            events_path,
            output_path,
            prices_path,
            tokens_path,
            batch_size,
            protocol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("EVENTS_PATH".to_string(), "/tmp/events.jsonl".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.output_path, "ledger_state.json");
        assert_eq!(config.batch_size, 1000);
        assert!(config.prices_path.is_none());
        assert_eq!(config.protocol, ProtocolConfig::default());
    }

    #[test]
    fn test_missing_events_path() {
        let result = Config::from_env_map(HashMap::new());
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "EVENTS_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_protocol_overrides() {
        let mut env_map = setup_required_env();
        env_map.insert("PROTOCOL_ID".to_string(), "comet-usdc".to_string());
        env_map.insert("SHARE_ACCOUNTING".to_string(), "one_to_one".to_string());
        env_map.insert("BORROW_CREATES_DEPOSIT".to_string(), "false".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.protocol.id, "comet-usdc");
        assert_eq!(config.protocol.share_accounting, ShareAccounting::OneToOne);
        assert!(!config.protocol.borrow_creates_deposit);
    }

    #[test]
    fn test_invalid_share_accounting() {
        let mut env_map = setup_required_env();
        env_map.insert("SHARE_ACCOUNTING".to_string(), "invalid".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SHARE_ACCOUNTING"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_batch_size() {
        let mut env_map = setup_required_env();
        env_map.insert("BATCH_SIZE".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "BATCH_SIZE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_borrow_flag() {
        let mut env_map = setup_required_env();
        env_map.insert("BORROW_CREATES_DEPOSIT".to_string(), "yes".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "BORROW_CREATES_DEPOSIT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
