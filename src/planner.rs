//! Issuing one search per base DN
use std::sync::Arc;

use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info};

use crate::{directory::Directory, entry::DirectoryEntry, error::Error};

/// The entries found below one base DN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeResult {
	/// The base DN searched
	pub base_dn: String,
	/// Entries returned by the search, possibly none
	pub entries: Vec<DirectoryEntry>,
}

/// Search below every base DN and return the results in the order of
/// `base_dns`.
///
/// Up to `concurrency` searches are in flight at once. The first failing search
/// ends the whole operation with its error, outstanding searches are
/// abandoned, and no results are returned.
pub async fn plan_and_execute<D>(
	directory: Arc<D>,
	base_dns: &[String],
	concurrency: usize,
) -> Result<Vec<ScopeResult>, Error>
where
	D: Directory + ?Sized + 'static,
{
	if concurrency <= 1 || base_dns.len() <= 1 {
		let mut results = Vec::with_capacity(base_dns.len());
		for base_dn in base_dns {
			results.push(search_scope(directory.as_ref(), base_dn).await?);
		}
		return Ok(results);
	}

	// More permits than searches are never needed.
	let permits = Arc::new(Semaphore::new(concurrency.min(base_dns.len())));
	let mut tasks = JoinSet::new();
	for (position, base_dn) in base_dns.iter().cloned().enumerate() {
		let directory = Arc::clone(&directory);
		let permits = Arc::clone(&permits);
		tasks.spawn(async move {
			let _permit = permits.acquire_owned().await;
			(position, search_scope(directory.as_ref(), &base_dn).await)
		});
	}

	let mut results: Vec<Option<ScopeResult>> = vec![None; base_dns.len()];
	while let Some(joined) = tasks.join_next().await {
		let (position, result) = match joined {
			Ok(finished) => finished,
			// Only panics end up here, tasks are never cancelled while joining.
			Err(err) => std::panic::resume_unwind(err.into_panic()),
		};
		match result {
			Ok(scope) => results[position] = Some(scope),
			Err(err) => {
				tasks.abort_all();
				return Err(err);
			}
		}
	}
	Ok(results.into_iter().flatten().collect())
}

/// Run the search for a single base DN
async fn search_scope<D>(directory: &D, base_dn: &str) -> Result<ScopeResult, Error>
where
	D: Directory + ?Sized,
{
	info!(base_dn = %base_dn, "Searching for computers");
	let entries = directory.search(base_dn).await?;
	if entries.is_empty() {
		info!(base_dn = %base_dn, "No computers found");
	} else {
		debug!(base_dn = %base_dn, count = entries.len(), "Search finished");
	}
	Ok(ScopeResult { base_dn: base_dn.to_owned(), entries })
}
