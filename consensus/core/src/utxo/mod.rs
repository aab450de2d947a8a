pub mod utxo_collection;
pub mod utxo_diff;
pub mod utxo_inquirer;
pub mod utxo_view;

pub use utxo_collection::UtxoCollection;
pub use utxo_diff::UtxoDiff;
pub use utxo_inquirer::UtxoInquirer;
pub use utxo_view::UtxoView;
