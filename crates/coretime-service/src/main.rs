//! Main entry point for the on-demand coretime watcher.
//!
//! Loads the configuration, derives the funding account, connects to the
//! relay chain (and the parachain in transaction pool mode) and runs the
//! control loop until interrupted.

use clap::Parser;
use coretime_config::Config;
use coretime_types::OrderingMode;
use std::path::PathBuf;

mod builder;
mod error;

use builder::build_engine;
use error::ServiceError;

/// Command-line arguments for the watcher.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file (JSON, or TOML with a .toml extension)
	#[arg(short, long, default_value = "./config.json")]
	config: PathBuf,

	/// Ordering mode: block or transaction_pool
	#[arg(short, long, default_value = "block")]
	mode: String,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	if let Err(e) = run(args).await {
		tracing::error!(error = %e, "Watcher stopped");
		std::process::exit(1);
	}
}

async fn run(args: Args) -> Result<(), ServiceError> {
	let mode: OrderingMode = args.mode.parse()?;

	let config = Config::from_file(&args.config).await?;
	tracing::info!(
		parachain_id = config.parachain_id,
		relay_chain = %config.relay_chain,
		%mode,
		"Loaded configuration"
	);

	let engine = build_engine(&config, mode).await?;
	engine.run().await?;

	tracing::info!("Stopped watcher");
	Ok(())
}
