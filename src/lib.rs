//! Build an Ansible dynamic inventory from computer objects in Active
//! Directory.
//!
//! The library connects to a directory server over LDAP, searches the subtree
//! below each configured base DN for computer objects, and collects them into
//! an [`InventorySnapshot`]. Every host is identified by its `name` attribute
//! and reached through its `dNSHostName`, falling back to the name when the
//! object has no DNS name. Hosts found below several base DNs appear once,
//! as a member of every group they were found in.
//!
//! Groups are named after the first organizational unit of the base DN, so
//! `OU=Web Servers,DC=example,DC=com` becomes `web_servers`. With
//! [`GroupMode::Flat`] no groups are created at all.
//!
//! For a general primer on LDAP, the [introduction] in the `ldap3` crate which
//! is used here for interfacing with LDAP is an excellent resource.
//!
//! [introduction]: https://github.com/inejge/ldap3/blob/master/LDAP-primer.md
//!
//! # Getting started
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use ad_inventory::{sync::load, Config};
//!
//! // Configuration is usually read from a TOML file with
//! // `Config::from_file`. It's hand-constructed here for demonstration
//! // purposes.
//! let config = Config::new(
//!     "ldaps://ad.example.com".parse()?,
//!     "svc-inventory@example.com",
//!     "verysecret",
//!     vec!["OU=Web Servers,DC=example,DC=com".to_owned()],
//! );
//!
//! let inventory = load(&config).await?;
//! println!("{}", inventory.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//! * A failing search aborts the whole run; partial inventories are never
//!   produced.
//! * Nothing is retried. Each connect, bind and search is attempted once.

pub mod config;
pub mod directory;
pub mod entry;
pub mod error;
pub mod group;
pub mod inventory;
pub mod ldap;
pub mod planner;
pub mod snapshot;
pub mod sync;

pub use ldap3::{self, SearchEntry};

pub use crate::{
	config::{AttributeConfig, Config, ConnectionConfig, GroupMode, InventoryConfig, Searches},
	directory::Directory,
	entry::{normalize, DirectoryEntry, SearchEntryExt},
	error::Error,
	group::derive_group_name,
	inventory::{GroupRecord, HostRecord, InventoryBuilder},
	ldap::LdapDirectory,
	snapshot::InventorySnapshot,
};
