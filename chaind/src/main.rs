use chaind::{cli, Config, Node};
use std::process;
use tracing::{error, info};

fn main() {
    let args = cli::parse_args();

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            process::exit(1);
        }
    };
    config.apply_cli_overrides(&args);
    init_logging(&config.logging.level);

    if let Err(e) = run(&config, &args) {
        error!("chaind error: {e:#}");
        process::exit(1);
    }
    info!("chaind stopped");
}

fn load_config(args: &cli::Args) -> anyhow::Result<Config> {
    match (&args.config_path, &args.network) {
        (Some(path), _) => Config::load(path),
        (None, Some(network)) => Config::for_network(network),
        (None, None) => Ok(Config::default()),
    }
}

fn run(config: &Config, args: &cli::Args) -> anyhow::Result<()> {
    info!("starting chaind {} on {}", env!("CARGO_PKG_VERSION"), config.consensus.network);
    let node = Node::open(config)?;
    node.log_status();

    if let Some(path) = &args.import {
        let summary = node.import(path)?;
        info!("import finished: {} accepted, {} rejected", summary.accepted, summary.rejected);
        node.log_status();
    }
    Ok(())
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt().with_env_filter(filter).with_target(true).with_thread_ids(true).init();
}
