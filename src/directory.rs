//! Abstraction over the directory service the inventory is read from.
use async_trait::async_trait;

use crate::{entry::DirectoryEntry, error::Error};

/// A connected, authenticated directory which can be searched for computer
/// objects.
///
/// [`LdapDirectory`](crate::ldap::LdapDirectory) is the implementation used
/// against real servers.
#[async_trait]
pub trait Directory: Send + Sync {
	/// Search the subtree below `base_dn` for computer objects. A single
	/// attempt is made; failures are reported as [`Error::Search`].
	async fn search(&self, base_dn: &str) -> Result<Vec<DirectoryEntry>, Error>;

	/// Release the connection. Called exactly once at the end of every run,
	/// whether or not the searches succeeded.
	async fn close(&self) -> Result<(), Error>;
}
