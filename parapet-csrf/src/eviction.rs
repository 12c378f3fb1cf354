//! FIFO eviction of surplus token pairs.
//!
//! A token is minted on essentially every request so forms can render
//! without a prior POST, but most tokens are never redeemed. Without a
//! bound the storage collection grows monotonically under any traffic that
//! does not validate tokens; this module trims it back to the configured
//! limit, oldest entries first.

use crate::error::CsrfResult;
use crate::storage::TokenStorage;
use tracing::{debug, trace};

/// Trim `storage` down to at most `limit` entries, removing the oldest
/// surviving keys first. A limit of zero or below disables enforcement.
/// Returns the number of evicted entries.
pub async fn enforce_limit(storage: &dyn TokenStorage, limit: i64) -> CsrfResult<usize> {
    if limit <= 0 {
        return Ok(0);
    }
    let limit = limit as usize;

    let mut evicted = 0;
    while storage.count().await? > limit {
        let Some(oldest) = storage.oldest_key().await? else {
            break;
        };
        storage.remove(&oldest).await?;
        evicted += 1;
        trace!(key = %oldest, "evicted oldest token pair");
    }

    if evicted > 0 {
        debug!(evicted, backend = storage.backend(), "storage limit enforced");
    }
    Ok(evicted)
}
