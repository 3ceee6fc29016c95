//! Schema steps for the `local_storage` database.
//!
//! # Invariants
//! - Steps are listed in ascending version order.
//! - After a successful run `PRAGMA user_version` equals `latest_version()`.

use crate::repo::storage_repo::{RepoError, RepoResult};
use log::info;
use rusqlite::Connection;

/// `(version, sql)` pairs applied in order.
const SCHEMA_STEPS: &[(u32, &str)] = &[(1, include_str!("0001_local_storage.sql"))];

/// Highest schema version this build can write.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |(version, _)| *version)
}

/// Brings the storage schema up to `latest_version()` in one transaction.
///
/// # Errors
/// - `SchemaTooNew` when the file was written by a newer build.
pub fn apply_migrations(conn: &mut Connection) -> RepoResult<()> {
    let found = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let supported = latest_version();
    if found > supported {
        return Err(RepoError::SchemaTooNew { found, supported });
    }

    let pending = SCHEMA_STEPS
        .iter()
        .filter(|(version, _)| *version > found)
        .collect::<Vec<_>>();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;
    info!("event=storage_migrate module=db status=ok from={found} to={supported}");
    Ok(())
}
