//! Main entry point for the settlement engine service.
//!
//! This binary loads configuration, wires the engine with the registered
//! storage and notifier implementations, and runs the settlement event
//! loop alongside the HTTP API server.

use clap::Parser;
use settler_config::Config;
use settler_core::{SettlerBuilder, SettlerFactories};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the settlement service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Collects the registered implementations into factory maps.
fn default_factories() -> SettlerFactories {
	SettlerFactories {
		storage: settler_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		notifiers: settler_notify::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
	}
}

/// Main entry point.
///
/// 1. Parses command-line arguments
/// 2. Initializes logging
/// 3. Loads and validates configuration (missing payment credentials fail
///    here, before any network call)
/// 4. Builds the engine
/// 5. Runs the event loop and the API server until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
	fmt().with_env_filter(env_filter).with_target(true).init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Config path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.settler.id);

	let engine = Arc::new(SettlerBuilder::new(config.clone(), default_factories()).build()?);

	if let Some(api_config) = config.api.clone().filter(|api| api.enabled) {
		let api_engine = Arc::clone(&engine);

		tokio::select! {
			result = engine.run() => {
				tracing::info!("Settlement event loop finished");
				result?;
			}
			result = server::start_server(api_config, api_engine) => {
				tracing::info!("API server finished");
				result?;
			}
		}
	} else {
		tracing::warn!("API server disabled; payment callbacks cannot be received");
		engine.run().await?;
	}

	tracing::info!("Stopped settler");
	Ok(())
}
