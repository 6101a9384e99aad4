//! Client for connecting to LDAP and searching for computer objects

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{
	adapters::{Adapter, EntriesOnly, PagedResults},
	LdapConnAsync, Scope, SearchEntry,
};
use secrecy::ExposeSecret;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
	config::{AttributeConfig, Config},
	directory::Directory,
	entry::DirectoryEntry,
	error::Error,
};

/// An authenticated connection to an LDAP server.
#[derive(Debug)]
pub struct LdapDirectory {
	/// The server the connection was made to, for diagnostics.
	uri: String,
	/// Handle used to issue operations on the connection.
	ldap: ldap3::Ldap,
	/// Background task driving the connection, joined on close.
	driver: Mutex<Option<JoinHandle<()>>>,
	/// The search filter used below every base DN
	filter: String,
	/// Attributes to request and extract
	attributes: AttributeConfig,
	/// Page size for the simple paged results control
	page_size: Option<i32>,
	/// Timeout applied to each search
	operation_timeout: Duration,
}

impl LdapDirectory {
	/// Connect to the server given in the configuration and bind as the
	/// configured user.
	///
	/// Network, TLS and bind failures are all reported as
	/// [`Error::Connection`].
	pub async fn connect(config: &Config) -> Result<Self, Error> {
		let settings = config.connection.to_settings().await?;
		let uri = config.server_uri.to_string();
		let connection_error = |source| Error::Connection { uri: uri.clone(), source };

		let (conn, mut ldap) = LdapConnAsync::from_url_with_settings(settings, &config.server_uri)
			.await
			.map_err(connection_error)?;
		let driver = tokio::spawn(async move {
			if let Err(err) = conn.drive().await {
				warn!("Ldap connection error {err}");
			}
		});

		debug!(bind_user = %config.bind_user, "Binding to directory");
		let password = config.bind_password.expose_secret();
		if let Err(source) =
			ldap.simple_bind(&config.bind_user, password).await.and_then(|result| result.success())
		{
			driver.abort();
			return Err(connection_error(source));
		}

		Ok(Self {
			uri,
			ldap,
			driver: Mutex::new(Some(driver)),
			filter: config.searches.filter.clone(),
			attributes: config.attributes.clone(),
			page_size: config.searches.page_size,
			operation_timeout: config.connection.operation_timeout(),
		})
	}

	/// Run the search, collecting every returned entry.
	async fn search_entries(&self, base_dn: &str) -> Result<Vec<DirectoryEntry>, ldap3::LdapError> {
		let mut ldap = self.ldap.clone();

		let mut adapters: Vec<Box<dyn Adapter<_, _>>> = vec![Box::new(EntriesOnly::new())];
		if let Some(page_size) = self.page_size {
			adapters.push(Box::new(PagedResults::new(page_size)));
		}

		let mut search = ldap
			.with_timeout(self.operation_timeout)
			.streaming_search_with(
				adapters,
				base_dn,
				Scope::Subtree,
				&self.filter,
				self.attributes.get_attr_filter(),
			)
			.await?;

		let mut entries = Vec::new();
		while let Some(entry) = search.next().await?.map(SearchEntry::construct) {
			entries.push(DirectoryEntry::from_search(&entry, &self.attributes));
		}
		search.finish().await.success()?;

		Ok(entries)
	}
}

#[async_trait]
impl Directory for LdapDirectory {
	async fn search(&self, base_dn: &str) -> Result<Vec<DirectoryEntry>, Error> {
		self.search_entries(base_dn)
			.await
			.map_err(|source| Error::Search { base_dn: base_dn.to_owned(), source })
	}

	async fn close(&self) -> Result<(), Error> {
		let unbound = self.ldap.clone().unbind().await;

		let driver = self.driver.lock().await.take();
		if let Some(driver) = driver {
			if unbound.is_err() {
				driver.abort();
			}
			if let Err(err) = driver.await {
				if !err.is_cancelled() {
					warn!("Failed to join background task: {err}");
				}
			}
		}

		unbound.map_err(|source| Error::Connection { uri: self.uri.clone(), source })
	}
}
