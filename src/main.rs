//! Ansible dynamic inventory script backed by Active Directory.
//!
//! Prints the inventory document for `--list`, or the variables of one host for
//! `--host <name>`. Diagnostics go to stderr so stdout carries nothing but
//! JSON.
use std::{io::Write, path::PathBuf};

use ad_inventory::{sync::load, Config};
use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "ad-inventory", version, about = "Dynamic Ansible inventory from Active Directory")]
struct CommandLine {
	/// Path of the TOML configuration file
	#[arg(
		short,
		long,
		env = "AD_INVENTORY_CONFIG",
		default_value = "active_directory_inventory.toml"
	)]
	config: PathBuf,

	/// Password of the bind user, overriding the configuration file
	#[arg(long, env = "AD_INVENTORY_BIND_PASSWORD", hide_env_values = true)]
	bind_password: Option<String>,

	/// Print the whole inventory (the default)
	#[arg(long, conflicts_with = "host")]
	list: bool,

	/// Print the variables of a single host
	#[arg(long, value_name = "HOST")]
	host: Option<String>,

	/// Increase log verbosity, may be repeated
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

/// Log to stderr, at a level chosen by the verbosity flag unless `RUST_LOG`
/// says otherwise
fn init_logging(verbose: u8) {
	let level = match verbose {
		0 => LevelFilter::WARN,
		1 => LevelFilter::INFO,
		2 => LevelFilter::DEBUG,
		_ => LevelFilter::TRACE,
	};
	let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = CommandLine::parse();
	init_logging(args.verbose);

	let mut config = Config::from_file(&args.config)
		.await
		.with_context(|| format!("Failed to load inventory source {}", args.config.display()))?;
	if let Some(password) = args.bind_password {
		config.set_bind_password(password);
	}

	let inventory = load(&config).await?;
	let document = match args.host.as_deref() {
		Some(host) if !args.list => inventory.host_vars_json(host)?,
		_ => inventory.to_json()?,
	};

	let mut stdout = std::io::stdout().lock();
	writeln!(stdout, "{document}")?;
	stdout.flush()?;
	Ok(())
}
