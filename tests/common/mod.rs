#![allow(dead_code)]

use std::{
	collections::HashMap,
	error::Error,
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration,
};

use ad_inventory::{directory::Directory, entry::DirectoryEntry, Config};
use async_trait::async_trait;
use ldap3::LdapConnAsync;

/// In-memory directory keyed by base DN
#[derive(Debug, Default)]
pub struct FakeDirectory {
	scopes: HashMap<String, Vec<DirectoryEntry>>,
	failing: Option<String>,
	delay: Duration,
	closes: AtomicUsize,
}

impl FakeDirectory {
	pub fn with_computer(mut self, base_dn: &str, name: &str, dns_host_name: Option<&str>) -> Self {
		self.scopes.entry(base_dn.to_owned()).or_default().push(DirectoryEntry {
			dn: format!("CN={name},{base_dn}"),
			name: Some(name.to_owned()),
			dns_host_name: dns_host_name.map(str::to_owned),
			..DirectoryEntry::default()
		});
		self
	}

	pub fn with_empty(mut self, base_dn: &str) -> Self {
		self.scopes.entry(base_dn.to_owned()).or_default();
		self
	}

	pub fn failing_on(mut self, base_dn: &str) -> Self {
		self.failing = Some(base_dn.to_owned());
		self
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}

	pub fn closes(&self) -> usize {
		self.closes.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Directory for FakeDirectory {
	async fn search(&self, base_dn: &str) -> Result<Vec<DirectoryEntry>, ad_inventory::Error> {
		tokio::time::sleep(self.delay).await;
		if self.failing.as_deref() == Some(base_dn) {
			return Err(ad_inventory::Error::Search {
				base_dn: base_dn.to_owned(),
				source: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into(),
			});
		}
		Ok(self.scopes.get(base_dn).cloned().unwrap_or_default())
	}

	async fn close(&self) -> Result<(), ad_inventory::Error> {
		self.closes.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

pub fn config(base_dns: &[&str]) -> Config {
	Config::new(
		"ldap://localhost:1389".parse().expect("valid url"),
		"cn=admin,dc=example,dc=org",
		"adminpassword",
		base_dns.iter().map(|&dn| dn.to_owned()).collect(),
	)
}

pub async fn ldap_connect() -> Result<ldap3::Ldap, Box<dyn Error>> {
	let (conn, mut ldap) = LdapConnAsync::new("ldap://localhost:1389").await?;
	let _handle = tokio::spawn(async move {
		if let Err(err) = conn.drive().await {
			panic!("Ldap connection error {err}");
		}
	});
	ldap.simple_bind("cn=admin,dc=example,dc=org", "adminpassword").await?;
	Ok(ldap)
}

pub async fn ldap_add_organizational_unit(
	ldap: &mut ldap3::Ldap,
	ou: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.add(
		&format!("ou={},dc=example,dc=org", ou),
		vec![("objectClass", ["organizationalUnit"].into())],
	)
	.await?
	.success()?;
	Ok(())
}

pub async fn ldap_delete_organizational_unit(
	ldap: &mut ldap3::Ldap,
	ou: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.delete(&format!("ou={},dc=example,dc=org", ou)).await?.success()?;
	Ok(())
}

pub async fn ldap_add_device(
	ldap: &mut ldap3::Ldap,
	ou: &str,
	cn: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.add(
		&format!("cn={},ou={},dc=example,dc=org", cn, ou),
		vec![("objectClass", ["device"].into())],
	)
	.await?
	.success()?;
	Ok(())
}

pub async fn ldap_delete_device(
	ldap: &mut ldap3::Ldap,
	ou: &str,
	cn: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.delete(&format!("cn={},ou={},dc=example,dc=org", cn, ou)).await?.success()?;
	Ok(())
}
