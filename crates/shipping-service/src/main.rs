//! Main entry point for the shipping service.
//!
//! The binary either fetches a single order from the order service and prints
//! it (`--order-id`), or serves the shipping API when `[api]` is enabled.

use clap::Parser;
use shipping_client::{create_primary_transport, OrderServiceClient};
use shipping_config::Config;
use std::path::PathBuf;

mod apis;
mod server;

/// Command-line arguments for the shipping service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Fetch this order once, print it as JSON and exit
	#[arg(short, long)]
	order_id: Option<i32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	// RUST_LOG takes precedence over --log-level
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started shipping service");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.shipping.id);

	let orders = build_order_client(&config)?;

	if let Some(order_id) = args.order_id {
		let order = orders.fetch_order(order_id).await?;
		println!("{}", serde_json::to_string_pretty(&order)?);
		return Ok(());
	}

	match config.api.as_ref().filter(|api| api.enabled) {
		Some(api_config) => {
			let state = server::AppState {
				shipping_id: config.shipping.id.clone(),
				orders,
			};
			server::start_server(api_config.clone(), state).await?;
		},
		None => {
			tracing::warn!("API disabled and no --order-id given; nothing to do");
		},
	}

	tracing::info!("Stopped shipping service");
	Ok(())
}

/// Wires the configured primary transport into an order service client.
fn build_order_client(config: &Config) -> Result<OrderServiceClient, Box<dyn std::error::Error>> {
	let transport = create_primary_transport(&config.transport)?;
	let client = OrderServiceClient::from_config(&config.order_service, transport)?;
	tracing::info!("Order service at {}", client.base_url());
	Ok(client)
}
