//! Entry point for the `permit` binary.
//!
//! Signs, submits and pre-checks EIP-712 deposit and purchase permits, and
//! optionally serves the issuer's purchase-permit API over HTTP.

use clap::Parser;
use permit_config::Config;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod commands;
mod factory_registry;
mod server;

use commands::Command;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/permit.toml", env = "PERMIT_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// stdout carries artifacts and reports.
	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::debug!(path = %config_path, "Loaded configuration");

	let toolkit = factory_registry::build_toolkit_from_config(config.clone()).await?;

	match args.command {
		Command::Serve => {
			let api_config = config
				.api
				.filter(|api| api.enabled)
				.ok_or("The [api] section is missing or disabled")?;
			server::start_server(api_config, Arc::new(toolkit)).await?;
			tracing::info!("API server stopped");
		},
		command => commands::run(command, &toolkit).await?,
	}

	Ok(())
}
