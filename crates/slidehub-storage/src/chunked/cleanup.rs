//! Expiry sweep for abandoned upload sessions.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;

use slidehub_core::result::AppResult;

use super::store::SessionStore;

/// Discards sessions that have been idle past their TTL, along with any
/// spool directory that no live session owns.
#[derive(Debug, Clone)]
pub struct SessionSweeper {
    store: SessionStore,
    ttl: Duration,
}

impl SessionSweeper {
    /// Create a sweeper with the given idle TTL.
    pub fn new(store: SessionStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Run one sweep. Returns the number of sessions and orphan spool
    /// directories removed.
    ///
    /// Sessions whose lock is held are in active use and are skipped.
    pub async fn sweep_expired(&self) -> AppResult<usize> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::days(3650));
        let cutoff = Utc::now() - ttl;
        let spool_cutoff = SystemTime::now().checked_sub(self.ttl).unwrap_or(UNIX_EPOCH);
        let mut removed = 0usize;

        for (session_id, slot) in self.store.slots() {
            let Ok(mut guard) = slot.try_lock() else {
                continue;
            };
            if guard.closed || guard.session.last_activity_at > cutoff {
                continue;
            }
            // The slot stays in the table, closed, until its spool is gone so
            // a late chunk for this id is refused instead of recreating it.
            guard.closed = true;
            let spool_removed = self.store.spool().remove_session(&session_id).await;
            self.store.remove(&session_id, &slot);
            drop(guard);

            match spool_removed {
                Ok(()) => {
                    tracing::info!(session_id = %session_id, "Expired idle upload session");
                    removed += 1;
                }
                Err(e) => tracing::error!(
                    session_id = %session_id,
                    error = %e,
                    "Expired session but its chunk spool could not be removed"
                ),
            }
        }

        // A directory with no session is only reclaimed once it is as old as
        // the TTL, so a session that is being created right now keeps its spool.
        for dir in self.store.spool().list_sessions().await? {
            if self.store.contains(&dir) {
                continue;
            }
            let modified = tokio::fs::metadata(self.store.spool().session_dir(&dir))
                .await
                .and_then(|m| m.modified())
                .ok();
            if modified.is_some_and(|t| t <= spool_cutoff) {
                match self.store.spool().remove_session(&dir).await {
                    Ok(()) => {
                        tracing::info!(session_id = %dir, "Removed orphan chunk spool");
                        removed += 1;
                    }
                    Err(e) => {
                        tracing::error!(session_id = %dir, error = %e, "Failed to remove orphan chunk spool")
                    }
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Session sweep complete");
        } else {
            tracing::debug!("Session sweep found nothing to remove");
        }
        Ok(removed)
    }
}
