use anyhow::{anyhow, Context};
use consensus_core::config::Params;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub consensus: ConsensusConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub network: String,
    /// Verify block signatures of submitted blocks
    pub check_signatures: bool,
    /// Overrides the network's coinbase maturity
    pub coinbase_maturity: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub in_memory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, `RUST_LOG` takes precedence
    pub level: String,
}

impl Config {
    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Default configuration for a known network
    pub fn for_network(network: &str) -> anyhow::Result<Self> {
        Params::for_network(network).ok_or_else(|| anyhow!("unknown network: {network}"))?;
        let mut config = Config::default();
        config.consensus.network = network.to_string();
        config.storage.data_dir = PathBuf::from("./data").join(network);
        Ok(config)
    }

    /// Override config with CLI arguments
    pub fn apply_cli_overrides(&mut self, args: &crate::cli::Args) {
        if let Some(network) = &args.network {
            self.consensus.network = network.clone();
        }
        if let Some(data_dir) = &args.data_dir {
            self.storage.data_dir = data_dir.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.in_memory {
            self.storage.in_memory = true;
        }
        if args.no_signature_check {
            self.consensus.check_signatures = false;
        }
    }

    /// Consensus parameters of the configured network, with overrides applied.
    pub fn params(&self) -> anyhow::Result<Params> {
        let mut params =
            Params::for_network(&self.consensus.network).ok_or_else(|| anyhow!("unknown network: {}", self.consensus.network))?;
        if let Some(maturity) = self.consensus.coinbase_maturity {
            params.coinbase_maturity = maturity;
        }
        Ok(params)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            consensus: ConsensusConfig { network: "mainnet".to_string(), check_signatures: true, coinbase_maturity: None },
            storage: StorageConfig { data_dir: PathBuf::from("./data/mainnet"), in_memory: false },
            logging: LoggingConfig { level: "info".to_string() },
        }
    }
}
