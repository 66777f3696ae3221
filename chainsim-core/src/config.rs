//! Configuration for the chainsim engines and driver

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Hex digest length of a block hash; the hardest reachable difficulty.
pub const MAX_DIFFICULTY: u32 = 64;

/// Top-level simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimConfig {
    /// Proof-of-work chain configuration
    #[serde(default)]
    pub pow: PowConfig,
    /// Replicated-log network configuration
    #[serde(default)]
    pub smr: SmrConfig,
    /// Proof-of-stake chain configuration
    #[serde(default)]
    pub pos: PosConfig,
    /// Action history configuration
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Proof-of-work configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowConfig {
    /// Required leading zero nibbles of a block hash
    pub difficulty: u32,
    /// Mining attempt budget per block; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u64>,
}

/// Replicated-log network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmrConfig {
    /// Number of replicas created with a fresh network
    pub nodes: usize,
    /// Where the network record is saved and loaded
    pub snapshot_path: PathBuf,
}

/// Proof-of-stake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosConfig {
    /// Seed for leader selection; entropy-seeded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Initial validator set, in selection order
    pub validators: Vec<ValidatorSpec>,
}

/// One validator of the initial proof-of-stake set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidatorSpec {
    /// Unique validator name
    pub name: String,
    /// Starting balance
    pub balance: f64,
    /// Amount moved from balance to deposit at start-up
    pub stake: f64,
}

/// Action history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Write the action history to `path` when a driver finishes
    pub enabled: bool,
    /// History log file
    pub path: PathBuf,
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            difficulty: 2,
            max_attempts: None,
        }
    }
}

impl Default for SmrConfig {
    fn default() -> Self {
        Self {
            nodes: 5,
            snapshot_path: SimConfig::default_config_dir().join("network.json"),
        }
    }
}

impl Default for PosConfig {
    fn default() -> Self {
        let mut validators: Vec<ValidatorSpec> = (0..5)
            .map(|i| ValidatorSpec {
                name: format!("Node{}", i),
                balance: 100.0,
                stake: 50.0,
            })
            .collect();
        validators.push(ValidatorSpec {
            name: "Attacker".to_string(),
            balance: 300.0,
            stake: 50.0,
        });

        Self {
            seed: None,
            validators,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: SimConfig::default_config_dir().join("actions.log"),
        }
    }
}

impl SimConfig {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&content).map_err(|e| CoreError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file, creating the parent directory if needed
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration directory
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_default().join("chainsim")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("chainsim.toml")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pow.difficulty > MAX_DIFFICULTY {
            return Err(CoreError::InvalidConfig(format!(
                "PoW difficulty {} exceeds {}",
                self.pow.difficulty, MAX_DIFFICULTY
            )));
        }

        if self.pow.max_attempts == Some(0) {
            return Err(CoreError::InvalidConfig(
                "PoW max_attempts cannot be zero".to_string(),
            ));
        }

        if self.smr.nodes == 0 {
            return Err(CoreError::InvalidConfig(
                "Replicated network needs at least one node".to_string(),
            ));
        }

        if self.pos.validators.is_empty() {
            return Err(CoreError::InvalidConfig(
                "PoS validator set cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for spec in &self.pos.validators {
            if spec.name.is_empty() {
                return Err(CoreError::InvalidConfig(
                    "Validator name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(CoreError::InvalidConfig(format!(
                    "Duplicate validator name {}",
                    spec.name
                )));
            }
            if !(spec.balance.is_finite() && spec.balance > 0.0) {
                return Err(CoreError::InvalidConfig(format!(
                    "Validator {} needs a positive balance",
                    spec.name
                )));
            }
            if !(spec.stake.is_finite() && spec.stake >= 0.0) {
                return Err(CoreError::InvalidConfig(format!(
                    "Validator {} has a negative stake",
                    spec.name
                )));
            }
        }

        Ok(())
    }
}
