use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use hash::Ref;
use slog::{warn, Logger};

use crate::traits::{Blobstore, RemoteSource};

/// `importMany`: fetch remotely-owned records into `local` if missing.
///
/// Concurrency model: independent per-ref fetches overlap, capped so a
/// large import doesn't open unbounded concurrent connections.
const MAX_CONCURRENT_FETCHES: usize = 16;

/// Process-wide cache of refs already confirmed present, so repeated
/// `import_many` calls within one checkout don't redundantly re-check the
/// local store. Invalidated at the start of every checkout operation.
#[derive(Default)]
pub struct ImporterCache {
    known_present: Mutex<HashSet<Ref>>,
}

impl ImporterCache {
    pub fn new() -> Self {
        ImporterCache::default()
    }

    pub fn invalidate(&self) {
        self.known_present
            .lock()
            .expect("importer cache lock poisoned")
            .clear();
    }

    fn knows_present(&self, r: Ref) -> bool {
        self.known_present
            .lock()
            .expect("importer cache lock poisoned")
            .contains(&r)
    }

    fn mark_present(&self, r: Ref) {
        self.known_present
            .lock()
            .expect("importer cache lock poisoned")
            .insert(r);
    }
}

/// Import `ids` into `local` from `remote` if missing. Never fails the
/// whole batch on a single ref being genuinely absent remotely (the
/// "scope unknown yet" / new-component case) -- such misses are logged and
/// swallowed rather than propagated.
pub async fn import_many(
    ids: &[Ref],
    local: &dyn Blobstore,
    remote: &dyn RemoteSource,
    cache: Option<&ImporterCache>,
    logger: &Logger,
) -> Result<()> {
    let fetches = stream::iter(ids.iter().copied().map(|r| async move {
        if let Some(cache) = cache {
            if cache.knows_present(r) {
                return Ok(());
            }
        }
        if local.has(r).await? {
            if let Some(cache) = cache {
                cache.mark_present(r);
            }
            return Ok::<(), anyhow::Error>(());
        }
        match remote.fetch(r).await {
            Ok(Some(record)) => {
                local.put(record).await?;
                if let Some(cache) = cache {
                    cache.mark_present(r);
                }
            }
            Ok(None) => {
                warn!(logger, "object not found remotely, treating as new"; "ref" => %r);
            }
            Err(e) => {
                warn!(logger, "transient error importing object, swallowed"; "ref" => %r, "error" => %e);
            }
        }
        Ok(())
    }))
    .buffer_unordered(MAX_CONCURRENT_FETCHES);

    fetches
        .fold(Ok(()), |acc: Result<()>, item| async move {
            item?;
            acc
        })
        .await
}
