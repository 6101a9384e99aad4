//! Helper methods for extracting data from search results, and the mapping of
//! directory entries to host records.
use std::collections::BTreeMap;

use ldap3::SearchEntry;

use crate::{config::AttributeConfig, error::Error, inventory::HostRecord};

/// An extension trait for [`SearchEntry`] that provides convenience methods for
/// extracting data.
pub trait SearchEntryExt {
	/// Get the first value of an attribute. Attribute names are matched
	/// case-insensitively, as the server may return them in a different case
	/// than requested.
	fn attr_first(&self, attr: &str) -> Option<&str>;
}

impl SearchEntryExt for SearchEntry {
	fn attr_first(&self, attr: &str) -> Option<&str> {
		let values = match self.attrs.get(attr) {
			Some(values) => values,
			None => {
				self.attrs.iter().find(|(name, _)| name.eq_ignore_ascii_case(attr)).map(|(_, v)| v)?
			}
		};
		values.first().map(String::as_str)
	}
}

/// The attributes of a computer object relevant to the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
	/// Distinguished name of the object, used in diagnostics.
	pub dn: String,
	/// The object's name, which becomes the host id.
	pub name: Option<String>,
	/// The object's fully qualified DNS name.
	pub dns_host_name: Option<String>,
	/// Values for the configured extra host variables, keyed by variable name.
	pub vars: BTreeMap<String, String>,
}

impl DirectoryEntry {
	/// Converts a [`SearchEntry`] to a [`DirectoryEntry`] using the attribute
	/// names in the given configuration.
	#[must_use]
	pub fn from_search(entry: &SearchEntry, attributes: &AttributeConfig) -> Self {
		let vars = attributes
			.host_vars
			.iter()
			.filter_map(|(var, attr)| Some((var.clone(), entry.attr_first(attr)?.to_owned())))
			.collect();
		Self {
			dn: entry.dn.clone(),
			name: entry.attr_first(&attributes.name).map(String::from),
			dns_host_name: entry.attr_first(&attributes.dns_host_name).map(String::from),
			vars,
		}
	}
}

/// Map a directory entry to a host record without any group membership.
///
/// The host id is the entry's name. The address Ansible connects to is the DNS
/// host name, or the host id if the entry has none.
pub fn normalize(entry: DirectoryEntry, attributes: &AttributeConfig) -> Result<HostRecord, Error> {
	let Some(host_id) = entry.name.filter(|name| !name.trim().is_empty()) else {
		return Err(Error::Normalization { dn: entry.dn, attribute: attributes.name.clone() });
	};
	let ansible_host = match entry.dns_host_name {
		Some(fqdn) if !fqdn.trim().is_empty() => fqdn,
		_ => host_id.clone(),
	};
	Ok(HostRecord::new(host_id, ansible_host, entry.vars))
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use std::collections::{BTreeMap, HashMap};

	use ldap3::SearchEntry;

	use super::{normalize, DirectoryEntry, SearchEntryExt};
	use crate::{config::AttributeConfig, error::Error};

	fn computer(dn: &str, attrs: &[(&str, &str)]) -> SearchEntry {
		SearchEntry {
			dn: dn.to_owned(),
			attrs: attrs.iter().map(|(k, v)| ((*k).to_owned(), vec![(*v).to_owned()])).collect(),
			bin_attrs: HashMap::default(),
		}
	}

	#[test]
	fn attr_first() {
		let entry = SearchEntry {
			dn: String::from("dontcare"),
			attrs: [(
				String::from("name"),
				vec![String::from("Foo Bar"), String::from("Bar McBaz")],
			)]
			.into_iter()
			.collect(),
			bin_attrs: HashMap::default(),
		};
		assert_eq!(
			entry.attr_first("attribute_does_not_exist"),
			None,
			"Undefined attributes should return None"
		);
		assert_eq!(entry.attr_first("name"), Some("Foo Bar"), "Should return the first value");
		assert_eq!(entry.attr_first("NAME"), Some("Foo Bar"), "Lookup should ignore case");
		assert_ne!(entry.attr_first("name"), Some("Bar McBaz"), "Should return the correct value");
	}

	#[test]
	fn from_search_extracts_configured_attributes() {
		let entry = computer(
			"CN=WEB01,OU=Web Servers,DC=example,DC=com",
			&[
				("name", "WEB01"),
				("dnshostname", "web01.example.com"),
				("operatingSystem", "Windows Server 2022"),
			],
		);
		let entry = DirectoryEntry::from_search(&entry, &AttributeConfig::example());

		assert_eq!(entry.name.as_deref(), Some("WEB01"));
		assert_eq!(entry.dns_host_name.as_deref(), Some("web01.example.com"));
		assert_eq!(entry.vars, BTreeMap::from([("os".to_owned(), "Windows Server 2022".to_owned())]));
	}

	#[test]
	fn dns_host_name_becomes_ansible_host() {
		let entry = DirectoryEntry {
			dn: "CN=WEB01,OU=Web Servers,DC=example,DC=com".to_owned(),
			name: Some("WEB01".to_owned()),
			dns_host_name: Some("web01.example.com".to_owned()),
			..DirectoryEntry::default()
		};
		let host = normalize(entry, &AttributeConfig::default()).unwrap();

		assert_eq!(host.host_id(), "WEB01");
		assert_eq!(host.ansible_host(), "web01.example.com");
		assert!(host.groups().is_empty(), "Normalizing must not assign groups");
	}

	#[test]
	fn missing_dns_host_name_falls_back_to_name() {
		for dns_host_name in [None, Some(String::new())] {
			let entry = DirectoryEntry {
				dn: "CN=DB02,OU=DB,DC=example,DC=com".to_owned(),
				name: Some("DB02".to_owned()),
				dns_host_name,
				..DirectoryEntry::default()
			};
			let host = normalize(entry, &AttributeConfig::default()).unwrap();
			assert_eq!(host.ansible_host(), "DB02");
		}
	}

	#[test]
	fn missing_name_is_an_error() {
		let entry = DirectoryEntry {
			dn: "CN=ghost,OU=DB,DC=example,DC=com".to_owned(),
			dns_host_name: Some("ghost.example.com".to_owned()),
			..DirectoryEntry::default()
		};
		let err = normalize(entry, &AttributeConfig::default()).unwrap_err();

		assert!(matches!(
			err,
			Error::Normalization { ref dn, ref attribute }
				if dn == "CN=ghost,OU=DB,DC=example,DC=com" && attribute == "name"
		));
	}
}
