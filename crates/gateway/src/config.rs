//! Flag/environment configuration for the gateway process.

use std::path::PathBuf;

use clap::Parser;

/// Runtime configuration; every flag doubles as an environment variable.
#[derive(Parser, Debug)]
#[command(name = "wagate")]
#[command(about = "HTTP gateway for a single chat-network device session")]
#[command(version)]
pub struct GatewayConfig {
	/// Port to listen on.
	#[arg(long, env = "WAGATE_PORT", default_value_t = 3000)]
	pub port: u16,

	/// Bearer token guarding every route; unset disables the check.
	#[arg(long, env = "WAGATE_TOKEN")]
	pub token: Option<String>,

	/// Directory holding the device credential records.
	#[arg(long, env = "WAGATE_AUTH_DIR", default_value = "./auth", value_name = "DIR")]
	pub auth_dir: PathBuf,

	/// Sidecar client command: program followed by its arguments.
	#[arg(
		long = "client-cmd",
		env = "WAGATE_CLIENT_CMD",
		value_name = "CMD",
		num_args = 1..,
		value_delimiter = ' ',
		required = true
	)]
	pub client_cmd: Vec<String>,

	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}
