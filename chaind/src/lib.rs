//! chaind - multi-algorithm proof-of-work chain daemon
//!
//! Loads configuration, opens the chain store and imports block files into it.

pub mod cli;
pub mod config;
pub mod node;

pub use cli::Args;
pub use config::Config;
pub use node::{ImportSummary, Node};
