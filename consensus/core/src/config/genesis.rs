use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::constants::BLOCK_VERSION;
use crate::header::Header;
use crate::script::ScriptPublicKey;
use crate::tx::{Transaction, TransactionInput, TransactionOutpoint, TransactionOutput};
use crate::{PowAlgorithm, ZERO_HASH};

/// The constants uniquely representing a network's genesis block.
///
/// Genesis is trusted by hash: it is not mined against its own target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisParams {
    pub timestamp: u64,
    pub bits: u32,
    pub algo: PowAlgorithm,
    pub nonce: u64,
    pub reward: u64,
    pub coinbase_message: String,
}

impl GenesisParams {
    pub fn build_coinbase(&self) -> Transaction {
        let input = TransactionInput::new(TransactionOutpoint::null(), self.coinbase_message.as_bytes().to_vec(), u32::MAX);
        let output = TransactionOutput::new(self.reward, ScriptPublicKey::anyone_can_spend());
        Transaction::new(1, self.timestamp, vec![input], vec![output], 0)
    }

    pub fn build_block(&self) -> Block {
        let coinbase = self.build_coinbase();
        let header = Header::new(BLOCK_VERSION, ZERO_HASH, coinbase.id(), self.timestamp, self.bits, self.algo, self.nonce);
        Block::new(header, vec![coinbase])
    }
}
