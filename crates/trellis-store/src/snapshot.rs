//! JSON snapshot file for [`MemoryStore`](crate::MemoryStore).

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::memory::Tables;
use crate::store::StoreError;

/// Load tables from `path`. Returns `None` if the file does not exist.
pub(crate) fn load(path: &Path) -> Result<Option<Tables>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Write tables to `path` through a temporary sibling file and a rename.
pub(crate) fn save(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(tables)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), revision = tables.revision, "Saved store snapshot");
    Ok(())
}
