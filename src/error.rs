//! Error codes

use std::time::Duration;

/// Errors that can occur when building an inventory
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// A required setting was missing or invalid. Raised before any network
	/// activity takes place.
	#[error("Invalid configuration: {0}")]
	Config(String),
	/// Connecting, negotiating TLS or binding to the directory failed.
	#[error("Failed to connect to directory server {uri}: {source}")]
	Connection {
		/// The server URI the connection was attempted against
		uri: String,
		/// The underlying protocol or network error
		#[source]
		source: ldap3::LdapError,
	},
	/// The search below one base DN failed.
	#[error("LDAP search failed for base DN {base_dn}: {source}")]
	Search {
		/// The base DN the search was scoped to
		base_dn: String,
		/// The underlying protocol or network error
		#[source]
		source: ldap3::LdapError,
	},
	/// A search result lacked an attribute required to build a host record.
	#[error("Directory entry {dn} is missing required attribute {attribute}")]
	Normalization {
		/// DN of the offending entry
		dn: String,
		/// Name of the missing attribute
		attribute: String,
	},
	/// The whole run did not finish within the configured deadline.
	#[error("Directory synchronization did not complete within {0:?}")]
	Timeout(Duration),
	/// Reading configuration or TLS material from disk failed.
	#[error(transparent)]
	Io(#[from] std::io::Error),
	/// Rendering the inventory document failed.
	#[error(transparent)]
	Json(#[from] serde_json::Error),
}
