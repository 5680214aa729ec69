use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use wagate::MessageDispatcher;
use wagate::client::process::ProcessClient;
use wagate::session::{CredentialStore, SessionManager};
use wagate_gateway::config::GatewayConfig;
use wagate_gateway::http::{self, AppState};
use wagate_gateway::logging;

#[tokio::main]
async fn main() {
	let config = GatewayConfig::parse();
	logging::init_logging(config.verbose);

	if let Err(err) = run(config).await {
		error!(target = "wagate", error = %err, "gateway failed");
		std::process::exit(1);
	}
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
	let store = CredentialStore::new(&config.auth_dir);
	let client = ProcessClient::new(&config.client_cmd)?;
	let manager = SessionManager::new(client, store);
	let dispatcher = Arc::new(MessageDispatcher::new(Arc::clone(&manager)));

	// Warm start: bring the session up without blocking the listener.
	{
		let manager = Arc::clone(&manager);
		tokio::spawn(async move {
			if let Err(err) = manager.ensure_session().await {
				warn!(target = "wagate", error = %err, "warm start failed; will retry on demand");
			}
		});
	}

	let state = AppState::new(manager, dispatcher, config.token.clone());
	let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
		.await
		.with_context(|| format!("failed to bind port {}", config.port))?;
	info!(target = "wagate", port = config.port, "gateway listening");

	http::serve(listener, state).await?;
	Ok(())
}
