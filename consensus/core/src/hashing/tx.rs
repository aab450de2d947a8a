use crypto_hashes::{HashWriter, Hashable};

use crate::script::ScriptPublicKey;
use crate::tx::{Transaction, TransactionInput, TransactionOutpoint, TransactionOutput};
use crate::Hash;

impl Hashable for TransactionOutpoint {
    fn hash_into(&self, writer: &mut HashWriter) {
        writer.update(self.transaction_id.as_bytes()).write_u32(self.index);
    }
}

impl Hashable for TransactionOutput {
    fn hash_into(&self, writer: &mut HashWriter) {
        writer.write_u64(self.value).write_var_bytes(self.script_public_key.script());
    }
}

impl Hashable for TransactionInput {
    fn hash_into(&self, writer: &mut HashWriter) {
        writer.hash_object(&self.previous_outpoint).write_var_bytes(&self.signature_script).write_u32(self.sequence);
    }
}

impl Hashable for Transaction {
    fn hash_into(&self, writer: &mut HashWriter) {
        writer.write_u16(self.version).write_u64(self.time).write_u64(self.inputs.len() as u64);
        for input in &self.inputs {
            writer.hash_object(input);
        }
        writer.write_u64(self.outputs.len() as u64);
        for output in &self.outputs {
            writer.hash_object(output);
        }
        writer.write_u32(self.lock_time);
    }
}

/// Transaction id, double SHA-256 over the full serialization.
pub fn id(tx: &Transaction) -> Hash {
    tx.content_hash()
}

/// Message signed by the input at `input_index`.
///
/// Every signature script is left out and the spent output's script takes the place of
/// the signed input, so a signature commits to all inputs, all outputs and the coin it spends.
pub fn sig_hash(tx: &Transaction, input_index: usize, spent_script: &ScriptPublicKey) -> Hash {
    let mut writer = HashWriter::new();
    writer.write_u16(tx.version).write_u64(tx.time).write_u64(tx.inputs.len() as u64);
    for (i, input) in tx.inputs.iter().enumerate() {
        writer.hash_object(&input.previous_outpoint);
        if i == input_index {
            writer.write_var_bytes(spent_script.script());
        } else {
            writer.write_var_bytes(&[]);
        }
        writer.write_u32(input.sequence);
    }
    writer.write_u64(tx.outputs.len() as u64);
    for output in &tx.outputs {
        writer.hash_object(output);
    }
    writer.write_u32(tx.lock_time).write_u32(input_index as u32);
    writer.finalize_double()
}
