//! Accumulation of hosts and groups into an inventory
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::snapshot::InventorySnapshot;

/// A host in the inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
	/// Unique id of the host, the directory object's name
	host_id: String,
	/// Address Ansible connects to
	ansible_host: String,
	/// Names of the groups the host is a member of, in order of first sighting
	groups: Vec<String>,
	/// Extra host variables
	vars: BTreeMap<String, String>,
}

impl HostRecord {
	/// Create a host record which is not a member of any group.
	#[must_use]
	pub fn new(
		host_id: impl Into<String>,
		ansible_host: impl Into<String>,
		vars: BTreeMap<String, String>,
	) -> Self {
		Self { host_id: host_id.into(), ansible_host: ansible_host.into(), groups: Vec::new(), vars }
	}

	/// Unique id of the host
	#[must_use]
	pub fn host_id(&self) -> &str {
		&self.host_id
	}

	/// Address Ansible connects to
	#[must_use]
	pub fn ansible_host(&self) -> &str {
		&self.ansible_host
	}

	/// Groups the host is a member of
	#[must_use]
	pub fn groups(&self) -> &[String] {
		&self.groups
	}

	/// Extra host variables
	#[must_use]
	pub fn vars(&self) -> &BTreeMap<String, String> {
		&self.vars
	}

	/// Add the host to a group, returning whether it was not a member before.
	fn join(&mut self, group: &str) -> bool {
		if self.groups.iter().any(|known| known == group) {
			return false;
		}
		self.groups.push(group.to_owned());
		true
	}
}

/// A group of hosts in the inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
	/// Name of the group
	name: String,
	/// Ids of the member hosts, in order of first sighting
	hosts: Vec<String>,
}

impl GroupRecord {
	/// Name of the group
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Ids of the member hosts
	#[must_use]
	pub fn hosts(&self) -> &[String] {
		&self.hosts
	}
}

/// Collects hosts and groups, keeping a single record per host id.
///
/// Hosts and groups keep the order in which they were first added so that the
/// finished snapshot renders identically for identical input.
#[derive(Debug, Default)]
pub struct InventoryBuilder {
	/// Host records in order of first sighting
	hosts: Vec<HostRecord>,
	/// Position of each host id in `hosts`
	host_index: HashMap<String, usize>,
	/// Group records in order of creation
	groups: Vec<GroupRecord>,
	/// Position of each group name in `groups`
	group_index: HashMap<String, usize>,
}

impl InventoryBuilder {
	/// Create an empty builder
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Make sure a group exists, even if no host is ever added to it.
	pub fn add_group(&mut self, name: &str) {
		self.group_position(name);
	}

	/// Add a host, optionally as a member of `group`.
	///
	/// A host id seen before is not duplicated: its first address and
	/// variables are kept and `group` is added to its memberships.
	pub fn add_host(&mut self, host: HostRecord, group: Option<&str>) {
		let position = match self.host_index.get(&host.host_id) {
			Some(&position) => {
				let known = &self.hosts[position];
				if known.ansible_host != host.ansible_host {
					debug!(
						host = %known.host_id,
						kept = %known.ansible_host,
						ignored = %host.ansible_host,
						"Host seen again with a different address"
					);
				}
				position
			}
			None => {
				let position = self.hosts.len();
				self.host_index.insert(host.host_id.clone(), position);
				self.hosts.push(HostRecord { groups: Vec::new(), ..host });
				position
			}
		};

		if let Some(group) = group {
			let group_position = self.group_position(group);
			let host = &mut self.hosts[position];
			if host.join(group) {
				self.groups[group_position].hosts.push(host.host_id.clone());
			}
		}
	}

	/// Number of distinct hosts added so far
	#[must_use]
	pub fn host_count(&self) -> usize {
		self.hosts.len()
	}

	/// Finish the inventory
	#[must_use]
	pub fn build(self) -> InventorySnapshot {
		InventorySnapshot::new(self.hosts, self.groups)
	}

	/// Position of the named group, creating it if necessary
	fn group_position(&mut self, name: &str) -> usize {
		if let Some(&position) = self.group_index.get(name) {
			return position;
		}
		let position = self.groups.len();
		self.group_index.insert(name.to_owned(), position);
		self.groups.push(GroupRecord { name: name.to_owned(), hosts: Vec::new() });
		position
	}
}
