//! Naming of inventory groups after the organizational unit they come from.

use crate::{error::Error, snapshot::META};

/// Group name used for base DNs without an organizational unit component
pub const UNGROUPED: &str = "ungrouped";

/// Derive a group name from a base DN.
///
/// The first `OU=` component of the DN is taken, spaces are replaced by
/// underscores and the result is lowercased, so `OU=Web Servers,DC=example`
/// becomes `web_servers`. The prefix is matched case-sensitively, as Active
/// Directory returns it. DNs without such a component yield [`UNGROUPED`].
#[must_use]
pub fn derive_group_name(base_dn: &str) -> String {
	base_dn
		.split(',')
		.find_map(|component| component.strip_prefix("OU="))
		.map_or_else(|| UNGROUPED.to_owned(), |ou| ou.replace(' ', "_").to_lowercase())
}

/// Derive the group name for a base DN, rejecting names the inventory
/// cannot represent: an empty name (`OU=` without a value) and the reserved
/// [`META`] key.
pub fn checked_group_name(base_dn: &str) -> Result<String, Error> {
	let name = derive_group_name(base_dn);
	if name.is_empty() {
		return Err(Error::Config(format!("Base DN {base_dn:?} has an empty OU and cannot name a group")));
	}
	if name == META {
		return Err(Error::Config(format!(
			"Base DN {base_dn:?} would produce the reserved group name {META:?}"
		)));
	}
	Ok(name)
}
