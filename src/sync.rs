//! Running a complete synchronization from the directory to an inventory

use std::sync::Arc;

use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::{
	config::{Config, GroupMode},
	directory::Directory,
	entry::normalize,
	error::Error,
	group::checked_group_name,
	inventory::InventoryBuilder,
	ldap::LdapDirectory,
	planner::{plan_and_execute, ScopeResult},
	snapshot::InventorySnapshot,
};

/// Connect to the configured directory, search every base DN and build the
/// inventory.
///
/// Either a complete inventory is returned or the first error encountered.
/// The connection is closed on every path once it has been established.
pub async fn load(config: &Config) -> Result<InventorySnapshot, Error> {
	config.validate()?;
	let deadline = Instant::now() + config.connection.run_timeout();

	info!(server = %config.server_uri, "Connecting to directory server");
	let directory = timeout_at(deadline, LdapDirectory::connect(config))
		.await
		.map_err(|_| Error::Timeout(config.connection.run_timeout()))??;
	info!("Connected and authenticated to directory server");

	sync_until(Arc::new(directory), config, deadline).await
}

/// Build the inventory from an already connected directory, closing it
/// afterwards.
///
/// The searches must finish within the configured run timeout.
pub async fn sync_directory<D>(directory: Arc<D>, config: &Config) -> Result<InventorySnapshot, Error>
where
	D: Directory + ?Sized + 'static,
{
	sync_until(directory, config, Instant::now() + config.connection.run_timeout()).await
}

/// Search, build and close, with all searches bounded by `deadline`
async fn sync_until<D>(
	directory: Arc<D>,
	config: &Config,
	deadline: Instant,
) -> Result<InventorySnapshot, Error>
where
	D: Directory + ?Sized + 'static,
{
	let searched = timeout_at(
		deadline,
		plan_and_execute(
			Arc::clone(&directory),
			&config.base_dns,
			config.searches.max_concurrent_searches,
		),
	)
	.await
	.map_err(|_| Error::Timeout(config.connection.run_timeout()))
	.and_then(|searched| searched);

	match timeout(config.connection.operation_timeout(), directory.close()).await {
		Ok(Ok(())) => debug!("Directory connection closed"),
		Ok(Err(err)) => warn!("Closing directory connection failed: {err}"),
		Err(_) => warn!("Closing directory connection timed out"),
	}

	build_inventory(searched?, config)
}

/// Turn search results into an inventory according to the configured grouping
/// policy.
pub fn build_inventory(
	results: Vec<ScopeResult>,
	config: &Config,
) -> Result<InventorySnapshot, Error> {
	let mut builder = InventoryBuilder::new();

	for scope in results {
		let group = match config.inventory.group_mode {
			GroupMode::Scoped => {
				let name = checked_group_name(&scope.base_dn)?;
				debug!(base_dn = %scope.base_dn, group = %name, "Assigning hosts to group");
				builder.add_group(&name);
				Some(name)
			}
			GroupMode::Flat => None,
		};

		for entry in scope.entries {
			let host = match normalize(entry, &config.attributes) {
				Ok(host) => host,
				Err(err) if !config.inventory.strict => {
					warn!(base_dn = %scope.base_dn, "Skipping entry: {err}");
					continue;
				}
				Err(err) => return Err(err),
			};
			debug!(
				host = %host.host_id(),
				ansible_host = %host.ansible_host(),
				group = group.as_deref().unwrap_or("-"),
				"Adding host"
			);
			builder.add_host(host, group.as_deref());
		}
	}

	info!(hosts = builder.host_count(), "Inventory built");
	Ok(builder.build())
}
