//! The finished inventory and its rendering as an Ansible dynamic inventory
//! document.
//!
//! The document has the shape
//!
//! ```json
//! {
//!   "_meta": { "hostvars": { "WEB01": { "ansible_host": "web01.example.com" } } },
//!   "web_servers": { "hosts": ["WEB01"] }
//! }
//! ```
//!
//! Hosts and groups appear in the order they were first seen, so the same
//! snapshot always renders to the same bytes.
use std::collections::HashMap;

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
	error::Error,
	inventory::{GroupRecord, HostRecord},
};

/// Name of the host variable holding the address Ansible connects to
pub const ANSIBLE_HOST: &str = "ansible_host";

/// Key of the metadata section in the inventory document
pub(crate) const META: &str = "_meta";

/// A complete inventory. It cannot be modified once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySnapshot {
	/// Hosts in order of first sighting
	hosts: Vec<HostRecord>,
	/// Groups in order of creation
	groups: Vec<GroupRecord>,
	/// Position of each host id in `hosts`
	host_index: HashMap<String, usize>,
}

impl InventorySnapshot {
	/// Wrap the records accumulated by the
	/// [`InventoryBuilder`](crate::inventory::InventoryBuilder)
	pub(crate) fn new(hosts: Vec<HostRecord>, groups: Vec<GroupRecord>) -> Self {
		let host_index =
			hosts.iter().enumerate().map(|(i, host)| (host.host_id().to_owned(), i)).collect();
		Self { hosts, groups, host_index }
	}

	/// All hosts
	#[must_use]
	pub fn hosts(&self) -> &[HostRecord] {
		&self.hosts
	}

	/// All groups
	#[must_use]
	pub fn groups(&self) -> &[GroupRecord] {
		&self.groups
	}

	/// Look up a host by id
	#[must_use]
	pub fn host(&self, host_id: &str) -> Option<&HostRecord> {
		self.host_index.get(host_id).map(|&i| &self.hosts[i])
	}

	/// Look up a group by name
	#[must_use]
	pub fn group(&self, name: &str) -> Option<&GroupRecord> {
		self.groups.iter().find(|group| group.name() == name)
	}

	/// Render the complete inventory document as indented JSON.
	pub fn to_json(&self) -> Result<String, Error> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	/// Render the variables of a single host as indented JSON. Unknown hosts
	/// render as an empty object.
	pub fn host_vars_json(&self, host_id: &str) -> Result<String, Error> {
		Ok(match self.host(host_id) {
			Some(host) => serde_json::to_string_pretty(&HostVars(host))?,
			None => serde_json::to_string_pretty(&serde_json::Map::new())?,
		})
	}
}

impl Serialize for InventorySnapshot {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.groups.len() + 1))?;
		map.serialize_entry(META, &Meta { hostvars: AllHostVars(&self.hosts) })?;
		for group in &self.groups {
			map.serialize_entry(group.name(), &GroupHosts { hosts: group.hosts() })?;
		}
		map.end()
	}
}

/// The `_meta` section
#[derive(Serialize)]
struct Meta<'a> {
	/// Variables of every host
	hostvars: AllHostVars<'a>,
}

/// Host variables keyed by host id
struct AllHostVars<'a>(&'a [HostRecord]);

impl Serialize for AllHostVars<'_> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.0.len()))?;
		for host in self.0 {
			map.serialize_entry(host.host_id(), &HostVars(host))?;
		}
		map.end()
	}
}

/// Variables of one host, `ansible_host` first
struct HostVars<'a>(&'a HostRecord);

impl Serialize for HostVars<'_> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.0.vars().len() + 1))?;
		map.serialize_entry(ANSIBLE_HOST, self.0.ansible_host())?;
		for (name, value) in self.0.vars() {
			map.serialize_entry(name, value)?;
		}
		map.end()
	}
}

/// A group entry
#[derive(Serialize)]
struct GroupHosts<'a> {
	/// Member host ids
	hosts: &'a [String],
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use std::collections::BTreeMap;

	use crate::inventory::{HostRecord, InventoryBuilder};

	#[test]
	fn renders_inventory_contract() {
		let mut builder = InventoryBuilder::new();
		builder.add_host(
			HostRecord::new("WEB01", "web01.example.com", BTreeMap::new()),
			Some("web_servers"),
		);
		builder.add_group("db");

		let json = builder.build().to_json().unwrap();

		assert_eq!(
			json,
			r#"{
  "_meta": {
    "hostvars": {
      "WEB01": {
        "ansible_host": "web01.example.com"
      }
    }
  },
  "web_servers": {
    "hosts": [
      "WEB01"
    ]
  },
  "db": {
    "hosts": []
  }
}"#
		);
	}

	#[test]
	fn extra_vars_follow_ansible_host() {
		let mut builder = InventoryBuilder::new();
		let vars = BTreeMap::from([
			("os".to_owned(), "Windows Server 2022".to_owned()),
			("description".to_owned(), "Payroll".to_owned()),
		]);
		builder.add_host(HostRecord::new("APP01", "app01.example.com", vars), None);
		let snapshot = builder.build();

		let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
		assert_eq!(
			value,
			serde_json::json!({
				"_meta": { "hostvars": { "APP01": {
					"ansible_host": "app01.example.com",
					"description": "Payroll",
					"os": "Windows Server 2022",
				} } }
			})
		);

		let host = snapshot.host_vars_json("APP01").unwrap();
		assert!(host.starts_with("{\n  \"ansible_host\": \"app01.example.com\",\n  \"description\""));
	}

	#[test]
	fn unknown_host_has_no_vars() {
		let snapshot = InventoryBuilder::new().build();
		assert_eq!(snapshot.host_vars_json("NOPE").unwrap(), "{}");
		assert_eq!(snapshot.to_json().unwrap(), "{\n  \"_meta\": {\n    \"hostvars\": {}\n  }\n}");
	}

	#[test]
	fn rendering_is_stable() {
		let build = || {
			let mut builder = InventoryBuilder::new();
			for (id, group) in [("B", "two"), ("A", "one"), ("C", "two"), ("A", "two")] {
				builder.add_host(HostRecord::new(id, id, BTreeMap::new()), Some(group));
			}
			builder.build()
		};

		let first = build().to_json().unwrap();
		assert_eq!(first, build().to_json().unwrap());
		assert!(first.find("\"two\"").unwrap() < first.find("\"one\"").unwrap());
	}
}
