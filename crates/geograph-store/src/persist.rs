//! On-disk layout of a store directory.
//!
//! ```text
//! <dir>/graph.snapshot   magic "GEOG" | u32 version | u64 len | bincode payload
//! <dir>/LOCK             present while a process holds the store open
//! ```

use crate::error::{Result, StoreError};
use crate::GraphData;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"GEOG";
const VERSION: u32 = 1;

pub(crate) const SNAPSHOT_FILE: &str = "graph.snapshot";
pub(crate) const LOCK_FILE: &str = "LOCK";

pub(crate) fn encode(data: &GraphData) -> Result<Vec<u8>> {
    let payload = bincode::serialize(data)?;

    let mut out = Vec::with_capacity(payload.len() + 16);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<GraphData> {
    if bytes.len() < 16 || &bytes[0..4] != MAGIC {
        return Err(StoreError::Corrupt("missing GEOG header".to_string()));
    }
    let version = u32::from_le_bytes(read_array(&bytes[4..8])?);
    if version != VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported snapshot version {version}"
        )));
    }
    let len = u64::from_le_bytes(read_array(&bytes[8..16])?) as usize;
    let payload = bytes[16..]
        .get(..len)
        .ok_or_else(|| StoreError::Corrupt("truncated payload".to_string()))?;
    bincode::deserialize(payload).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn read_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt("short header".to_string()))
}

pub(crate) fn read_snapshot(dir: &Path) -> Result<Option<GraphData>> {
    let path = dir.join(SNAPSHOT_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(&path)?;
    decode(&bytes).map(Some)
}

/// Replace the snapshot atomically: write a sibling file, sync it, rename.
pub(crate) fn write_snapshot(dir: &Path, data: &GraphData) -> Result<()> {
    let bytes = encode(data)?;
    let tmp = dir.join(format!("{SNAPSHOT_FILE}.tmp"));
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, dir.join(SNAPSHOT_FILE))?;
    Ok(())
}

/// Exclusive ownership of a store directory.
///
/// An advisory lock on `LOCK`, held for as long as the file stays open. The
/// OS drops it when the holder exits, so a crashed process leaves nothing
/// that blocks the next open.
#[derive(Debug)]
pub(crate) struct StoreLock {
    path: PathBuf,
    file: File,
}

impl StoreLock {
    pub(crate) fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let unavailable = |e: std::io::Error| StoreError::Unavailable {
            path: dir.to_path_buf(),
            reason: if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                "store is locked by another process".to_string()
            } else {
                e.to_string()
            },
        };
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(unavailable)?;
        file.try_lock_exclusive().map_err(unavailable)?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { path, file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release store lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_foreign_bytes() {
        let err = decode(b"AXPD\x01\0\0\0\0\0\0\0\0\0\0\0").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut bytes = encode(&GraphData::default()).unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(decode(&bytes), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn second_lock_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let first = StoreLock::acquire(dir.path()).unwrap();
        assert!(matches!(
            StoreLock::acquire(dir.path()),
            Err(StoreError::Unavailable { .. })
        ));
        drop(first);
        assert!(StoreLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn leftover_lock_file_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LOCK_FILE), "4242\n").unwrap();
        let lock = StoreLock::acquire(dir.path()).unwrap();
        let pid = fs::read_to_string(&lock.path).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());
    }
}
