use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::config::genesis::GenesisParams;
use crate::constants::{COIN, COINBASE_MATURITY, MAX_FUTURE_BLOCK_TIME, MAX_FUTURE_TX_DRIFT};
use crate::{Hash, PowAlgorithm};

/// Consensus parameters of one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Network name ("mainnet", "regtest")
    pub network: String,
    /// Easiest allowed target, compact encoded
    pub pow_limit_bits: u32,
    /// Target seconds between consecutive blocks of any algorithm
    pub target_spacing: u64,
    /// Lineage blocks averaged by the per-algorithm retarget
    pub retarget_window: usize,
    /// Skip retargeting, any bits up to the limit are accepted
    pub pow_no_retargeting: bool,
    /// Algorithms allowed to mine blocks
    pub enabled_algos: Vec<PowAlgorithm>,
    pub max_future_block_time: u64,
    pub max_tx_future_drift: u64,
    pub coinbase_maturity: u64,
    /// Block reward at height zero, in base units
    pub initial_subsidy: u64,
    pub subsidy_halving_interval: u64,
    pub genesis: GenesisParams,
}

impl Params {
    pub fn mainnet() -> Self {
        Self {
            network: "mainnet".into(),
            pow_limit_bits: 0x1e0f_ffff,
            target_spacing: 30,
            retarget_window: 10,
            pow_no_retargeting: false,
            enabled_algos: PowAlgorithm::ALL.to_vec(),
            max_future_block_time: MAX_FUTURE_BLOCK_TIME,
            max_tx_future_drift: MAX_FUTURE_TX_DRIFT,
            coinbase_maturity: COINBASE_MATURITY,
            initial_subsidy: 200 * COIN,
            subsidy_halving_interval: 1_000_000,
            genesis: GenesisParams {
                timestamp: 1_412_878_964,
                bits: 0x1e0f_ffff,
                algo: PowAlgorithm::Sha256d,
                nonce: 1_473_191,
                reward: 0,
                coinbase_message: "multi-algo chain genesis".into(),
            },
        }
    }

    /// Local testing network: trivial difficulty, no retargeting, short maturity.
    pub fn regtest() -> Self {
        Self {
            network: "regtest".into(),
            pow_limit_bits: 0x207f_ffff,
            target_spacing: 30,
            retarget_window: 10,
            pow_no_retargeting: true,
            enabled_algos: PowAlgorithm::ALL.to_vec(),
            max_future_block_time: MAX_FUTURE_BLOCK_TIME,
            max_tx_future_drift: MAX_FUTURE_TX_DRIFT,
            coinbase_maturity: 10,
            initial_subsidy: 50 * COIN,
            subsidy_halving_interval: 150,
            genesis: GenesisParams {
                timestamp: 1_700_000_000,
                bits: 0x207f_ffff,
                algo: PowAlgorithm::Sha256d,
                nonce: 0,
                reward: 50 * COIN,
                coinbase_message: "regtest genesis".into(),
            },
        }
    }

    pub fn for_network(name: &str) -> Option<Self> {
        match name {
            "mainnet" => Some(Self::mainnet()),
            "regtest" => Some(Self::regtest()),
            _ => None,
        }
    }

    /// Easiest allowed target. A malformed limit yields zero, which nothing satisfies.
    pub fn pow_limit(&self) -> U256 {
        chain_math::target_from_compact(self.pow_limit_bits).unwrap_or_default()
    }

    /// Target spacing between two blocks of the same algorithm.
    pub fn algo_spacing(&self) -> u64 {
        self.target_spacing * self.enabled_algos.len().max(1) as u64
    }

    pub fn is_algo_enabled(&self, algo: PowAlgorithm) -> bool {
        self.enabled_algos.contains(&algo)
    }

    pub fn genesis_block(&self) -> Block {
        self.genesis.build_block()
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis_block().hash()
    }

    pub fn block_subsidy(&self, height: u64) -> u64 {
        crate::subsidy::block_subsidy(height, self.initial_subsidy, self.subsidy_halving_interval)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::mainnet()
    }
}
