use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "chaind")]
#[command(about = "Multi-algorithm proof-of-work chain daemon", long_about = None)]
pub struct Args {
    /// Path to configuration file (optional, uses defaults if not provided)
    #[arg(short, long)]
    pub config_path: Option<PathBuf>,

    /// Data directory
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Network (mainnet, regtest)
    #[arg(short, long)]
    pub network: Option<String>,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Keep the chain in memory only
    #[arg(long)]
    pub in_memory: bool,

    /// Import blocks from a bincode encoded block file
    #[arg(long)]
    pub import: Option<PathBuf>,

    /// Skip block signature checks on imported blocks
    #[arg(long)]
    pub no_signature_check: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}
