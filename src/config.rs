//! Config for the directory inventory.
use std::{collections::BTreeMap, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use ldap3::LdapConnSettings;
use rustls::{Certificate, ClientConfig, PrivateKey, RootCertStore};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
	error::Error,
	group::checked_group_name,
};

/// The object class filter Active Directory uses for computer accounts
pub const DEFAULT_FILTER: &str = "(objectClass=computer)";

/// Inventory configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
	/// The URL to connect to the server with. Supports ldap, ldaps, and ldapi
	/// schemes
	pub server_uri: Url,
	/// The user to bind as, either a DN or a user principal name
	pub bind_user: String,
	/// The password for the bind user, already decrypted
	pub bind_password: SecretString,
	/// Search bases, one subtree search is issued per entry
	pub base_dns: Vec<String>,
	/// Connection settings.
	#[serde(default)]
	pub connection: ConnectionConfig,
	/// Filter and paging to use for searches
	#[serde(default)]
	pub searches: Searches,
	/// Names of attributes to search for and extract data from
	#[serde(default)]
	pub attributes: AttributeConfig,
	/// How search results are shaped into an inventory
	#[serde(default)]
	pub inventory: InventoryConfig,
}

/// Configuration for how to connect to the LDAP server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
	/// Timeout to establish a connection in seconds.
	pub timeout: u64,

	/// LDAP operation timeout in seconds. Applies to each search.
	pub operation_timeout: u64,

	/// Deadline in seconds for the whole run, from connecting until the last
	/// search has returned.
	pub run_timeout: u64,

	/// TLS config
	pub tls: TLSConfig,
}

impl Default for ConnectionConfig {
	fn default() -> Self {
		Self { timeout: 5, operation_timeout: 30, run_timeout: 120, tls: TLSConfig::default() }
	}
}

/// TLS Configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TLSConfig {
	/// Use StartTLS extended operation for establishing a secure connection,
	/// rather than TLS on a dedicated port.
	pub starttls: bool,

	/// Disable verification of TLS certificates. Cannot be combined with
	/// `root_certificates_path`, as a custom TLS configuration always verifies.
	pub no_tls_verify: bool,

	/// TLS root certificates path
	pub root_certificates_path: Option<PathBuf>,

	/// Path of the TLS client key to use for the connection
	pub client_key_path: Option<PathBuf>,

	/// Path of the TLS client certificate to use for the connection
	pub client_certificate_path: Option<PathBuf>,
}

/// Names of attributes to use for extracting relevant data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeConfig {
	/// The attribute holding the host's name, used as the unique host id
	pub name: String,
	/// The attribute holding the host's fully qualified DNS name
	pub dns_host_name: String,
	/// Additional host variables, mapping the variable name to the attribute
	/// its value is read from
	pub host_vars: BTreeMap<String, String>,
}

impl Default for AttributeConfig {
	fn default() -> Self {
		Self {
			name: "name".to_owned(),
			dns_host_name: "dNSHostName".to_owned(),
			host_vars: BTreeMap::new(),
		}
	}
}

impl AttributeConfig {
	/// Returns the list of LDAP object attributes the server should return.
	#[must_use]
	pub fn get_attr_filter(&self) -> Vec<String> {
		let mut attrs = vec![self.name.clone(), self.dns_host_name.clone()];
		for attr in self.host_vars.values() {
			if !attrs.iter().any(|known| known.eq_ignore_ascii_case(attr)) {
				attrs.push(attr.clone());
			}
		}
		attrs
	}

	/// Returns an example AttributeConfig
	#[allow(dead_code)]
	pub(crate) fn example() -> Self {
		AttributeConfig {
			host_vars: BTreeMap::from([
				("os".to_owned(), "operatingSystem".to_owned()),
				("description".to_owned(), "description".to_owned()),
			]),
			..Self::default()
		}
	}
}

/// Configurable filter and paging to use for LDAP searches
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Searches {
	/// The search filter used below every base DN
	pub filter: String,
	/// If set, enables the [simple paged search control] and sets the page size
	/// to the given value
	///
	/// [simple paged search control]: https://www.rfc-editor.org/rfc/rfc2696.html
	pub page_size: Option<i32>,
	/// How many base DNs may be searched at the same time over the connection
	pub max_concurrent_searches: usize,
}

impl Default for Searches {
	fn default() -> Self {
		Self { filter: DEFAULT_FILTER.to_owned(), page_size: None, max_concurrent_searches: 1 }
	}
}

/// How search results are turned into an inventory
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
	/// Whether hosts are grouped by the organizational unit they were found in
	pub group_mode: GroupMode,
	/// Fail the run on entries lacking the name attribute instead of skipping
	/// them
	pub strict: bool,
}

impl Default for InventoryConfig {
	fn default() -> Self {
		Self { group_mode: GroupMode::Scoped, strict: true }
	}
}

/// Grouping policy for the generated inventory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
	/// Create one group per base DN, named after its first OU, even if the
	/// search below it returned nothing
	#[default]
	Scoped,
	/// Only list hosts, without any group
	Flat,
}

impl Config {
	/// Create a configuration with default settings for everything but the
	/// directory target.
	#[must_use]
	pub fn new(
		server_uri: Url,
		bind_user: impl Into<String>,
		bind_password: impl Into<String>,
		base_dns: Vec<String>,
	) -> Self {
		let mut config = Self {
			server_uri,
			bind_user: bind_user.into(),
			bind_password: SecretString::from(bind_password.into()),
			base_dns,
			connection: ConnectionConfig::default(),
			searches: Searches::default(),
			attributes: AttributeConfig::default(),
			inventory: InventoryConfig::default(),
		};
		config.trim_credentials();
		config
	}

	/// Replace the bind password. Surrounding whitespace is stripped.
	pub fn set_bind_password(&mut self, password: String) {
		self.bind_password = SecretString::from(password.trim());
	}

	/// Strip surrounding whitespace from the credentials
	fn trim_credentials(&mut self) {
		self.bind_user = self.bind_user.trim().to_owned();
		let password = self.bind_password.expose_secret().trim().to_owned();
		self.set_bind_password(password);
	}

	/// Read a TOML configuration file and validate it.
	pub async fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
		tokio::fs::read_to_string(path).await?.parse()
	}

	/// Check the configuration for settings the run cannot work with.
	pub fn validate(&self) -> Result<(), Error> {
		match self.server_uri.scheme() {
			"ldap" | "ldaps" | "ldapi" => {}
			scheme => {
				return Err(Error::Config(format!("Unsupported server_uri scheme `{scheme}`")))
			}
		}
		if self.bind_user.trim().is_empty() {
			return Err(Error::Config("Missing required setting bind_user".to_owned()));
		}
		if self.bind_password.expose_secret().trim().is_empty() {
			return Err(Error::Config("Missing required setting bind_password".to_owned()));
		}
		if self.base_dns.is_empty() {
			return Err(Error::Config("base_dns must list at least one base DN".to_owned()));
		}
		if let Some(position) = self.base_dns.iter().position(|dn| dn.trim().is_empty()) {
			return Err(Error::Config(format!("base_dns entry {position} is empty")));
		}
		if self.inventory.group_mode == GroupMode::Scoped {
			for base_dn in &self.base_dns {
				checked_group_name(base_dn)?;
			}
		}
		if self.searches.filter.trim().is_empty() {
			return Err(Error::Config("searches.filter must not be empty".to_owned()));
		}
		if self.searches.max_concurrent_searches == 0 {
			return Err(Error::Config(
				"searches.max_concurrent_searches must be at least 1".to_owned(),
			));
		}
		if matches!(self.searches.page_size, Some(size) if size <= 0) {
			return Err(Error::Config("searches.page_size must be positive".to_owned()));
		}
		if self.attributes.name.is_empty() || self.attributes.dns_host_name.is_empty() {
			return Err(Error::Config("Attribute names must not be empty".to_owned()));
		}
		if self.attributes.host_vars.contains_key(crate::snapshot::ANSIBLE_HOST) {
			return Err(Error::Config(
				"ansible_host is derived from the DNS host name and cannot be a host variable"
					.to_owned(),
			));
		}
		let connection = &self.connection;
		if connection.timeout == 0 || connection.operation_timeout == 0 || connection.run_timeout == 0
		{
			return Err(Error::Config("Connection timeouts must be at least one second".to_owned()));
		}
		if connection.tls.client_key_path.is_some() != connection.tls.client_certificate_path.is_some()
		{
			return Err(Error::Config(
				"Both a client certificate and key file in PKCS8 format must be specified".to_owned(),
			));
		}
		if connection.tls.no_tls_verify && connection.tls.root_certificates_path.is_some() {
			return Err(Error::Config(
				"no_tls_verify cannot be combined with root_certificates_path".to_owned(),
			));
		}
		Ok(())
	}
}

impl FromStr for Config {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut config: Config = toml::from_str(s).map_err(|err| Error::Config(err.to_string()))?;
		config.trim_credentials();
		config.validate()?;
		Ok(config)
	}
}

impl ConnectionConfig {
	/// Per search operation timeout
	#[must_use]
	pub fn operation_timeout(&self) -> Duration {
		Duration::from_secs(self.operation_timeout)
	}

	/// Deadline for the whole run
	#[must_use]
	pub fn run_timeout(&self) -> Duration {
		Duration::from_secs(self.run_timeout)
	}

	/// Create a [`LdapConnSettings`] based on this [`ConnectionConfig`]
	pub(crate) async fn to_settings(&self) -> Result<LdapConnSettings, Error> {
		let mut settings = LdapConnSettings::new();

		settings = settings.set_conn_timeout(Duration::from_secs(self.timeout));
		settings = settings.set_starttls(self.tls.starttls);
		settings = settings.set_no_tls_verify(self.tls.no_tls_verify);

		if let Some(path) = &self.tls.root_certificates_path {
			let mut roots = RootCertStore::empty();
			let pem = tokio::fs::read(path).await?;
			let certs = rustls_pemfile::certs(&mut pem.as_slice())?;
			let (added, _) = roots.add_parsable_certificates(&certs);
			if added == 0 {
				return Err(Error::Config("Could not read root certificate".to_owned()));
			}

			let builder = ClientConfig::builder().with_safe_defaults().with_root_certificates(roots);
			let tls = match (&self.tls.client_key_path, &self.tls.client_certificate_path) {
				(Some(key_path), Some(cert_path)) => {
					let chain: Vec<Certificate> =
						rustls_pemfile::certs(&mut tokio::fs::read(cert_path).await?.as_slice())?
							.into_iter()
							.map(Certificate)
							.collect();
					let key = rustls_pemfile::pkcs8_private_keys(
						&mut tokio::fs::read(key_path).await?.as_slice(),
					)?
					.into_iter()
					.next()
					.map(PrivateKey)
					.ok_or_else(|| Error::Config("Could not read client certificates".to_owned()))?;
					builder
						.with_client_auth_cert(chain, key)
						.map_err(|_| Error::Config("Could not read client certificates".to_owned()))?
				}
				(None, None) => builder.with_no_client_auth(),
				_ => {
					return Err(Error::Config(
						"Both a client certificate and key file in PKCS8 format must be specified"
							.to_owned(),
					))
				}
			};
			settings = settings.set_config(Arc::new(tls));
		}
		Ok(settings)
	}
}
