//! Database schema versioning
//!
//! Stamps the on-disk schema version on open and refuses databases whose
//! stamp this release does not understand.

use crate::error::{MemoryError, Result};
use rocksdb::DB;

/// Schema version stored in metadata
pub(crate) const SCHEMA_VERSION_KEY: &[u8] = b"_schema_version";
pub const CURRENT_VERSION: u32 = 1;

/// Key prefix for object records
pub(crate) const OBJECT_PREFIX: &str = "obj:";

/// Check and stamp the schema of an opened database.
///
/// Returns the version found, or `CURRENT_VERSION` for an unstamped
/// database. Unstamped databases are adopted as current; their records go
/// through the same decode path as any other, so undecodable ones are
/// skipped at load. Any stamp other than the current one is rejected rather
/// than risk misreading records.
pub fn migrate(db: &DB) -> Result<u32> {
    match read_version(db)? {
        None => {
            let has_records = db
                .prefix_iterator(OBJECT_PREFIX.as_bytes())
                .next()
                .transpose()?
                .is_some_and(|(key, _)| key.starts_with(OBJECT_PREFIX.as_bytes()));
            if has_records {
                log::warn!("Unstamped database with records, adopting schema v{}", CURRENT_VERSION);
            } else {
                log::debug!("Fresh database, stamping schema v{}", CURRENT_VERSION);
            }
            write_version(db, CURRENT_VERSION)?;
            Ok(CURRENT_VERSION)
        }
        Some(version) if version > CURRENT_VERSION => Err(MemoryError::migration(format!(
            "database schema v{} is newer than supported v{}",
            version, CURRENT_VERSION
        ))),
        Some(version) if version < CURRENT_VERSION => Err(MemoryError::migration(format!(
            "unknown database schema v{}",
            version
        ))),
        Some(version) => {
            log::debug!("Database schema v{} is current", version);
            Ok(version)
        }
    }
}

/// Read the stamped schema version, if any
pub fn read_version(db: &DB) -> Result<Option<u32>> {
    match db.get(SCHEMA_VERSION_KEY)? {
        Some(bytes) => {
            let bytes: [u8; 4] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| MemoryError::migration("invalid schema version format"))?;
            Ok(Some(u32::from_le_bytes(bytes)))
        }
        None => Ok(None),
    }
}

fn write_version(db: &DB, version: u32) -> Result<()> {
    db.put(SCHEMA_VERSION_KEY, version.to_le_bytes())?;
    db.flush()?;
    Ok(())
}
