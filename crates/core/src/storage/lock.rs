use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};

// Advisory locks are scoped to the Postgres session. The guard owns the
// transaction (and thus the pooled connection) that took the lock, so
// acquire and release always run on the same session no matter which
// connections the pool hands to other requests in the meantime. The
// xact-scoped variant also releases on its own when the transaction ends,
// so a dropped guard cannot strand the lock on a pooled connection.
const LOCK_NAMESPACE: u64 = 0x50524F_4D4F_4445; // "PROMODE" as hex-ish namespace.

// FNV-1a, spelled out so the key stays stable across processes and compiler
// versions (std's DefaultHasher gives no such guarantee).
fn lock_key_for_session(requested_by: &str) -> i64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in requested_by.as_bytes() {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (LOCK_NAMESPACE ^ h) as i64
}

/// Holds the per-session single-flight lock for one generation run.
pub struct SessionLock {
    tx: Transaction<'static, Postgres>,
    key: i64,
}

impl SessionLock {
    /// Ends the lock-holding transaction, which releases the advisory lock.
    pub async fn release(self) -> anyhow::Result<()> {
        let key = self.key;
        self.tx
            .rollback()
            .await
            .with_context(|| format!("failed to release advisory lock (key={key})"))
    }
}

/// `None` means a generation for this session is already in flight.
pub async fn try_acquire_session_lock(
    pool: &PgPool,
    requested_by: &str,
) -> anyhow::Result<Option<SessionLock>> {
    let key = lock_key_for_session(requested_by);
    let mut tx = pool.begin().await.context("begin lock transaction failed")?;

    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_xact_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;

    if acquired.0 {
        Ok(Some(SessionLock { tx, key }))
    } else {
        // Hand the connection back clean right away.
        let _ = tx.rollback().await;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_and_distinguishes_sessions() {
        assert_eq!(lock_key_for_session("alice"), lock_key_for_session("alice"));
        assert_ne!(lock_key_for_session("alice"), lock_key_for_session("bob"));
    }
}
