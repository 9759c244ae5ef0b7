//! `trellis seed` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use trellis_store::{MemoryStore, Store, seed_demo};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the seed command.
#[derive(Args)]
pub(crate) struct SeedArgs {
    /// Store snapshot file to create or fill.
    #[arg(short, long, env = "TRELLIS_STORE")]
    store: PathBuf,
}

impl SeedArgs {
    /// Execute the seed command.
    ///
    /// # Errors
    ///
    /// Returns an error if the store already holds a site or cannot be
    /// written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        tracing::info!(path = %self.store.display(), "Seeding demo site");
        let store = seed_store(&self.store)?;
        output.success(&format!(
            "Seeded demo site into {} ({} pages)",
            self.store.display(),
            store.pages()?.len()
        ));
        Ok(())
    }
}

/// Seed the snapshot at `path`, refusing to touch a store that has content.
fn seed_store(path: &Path) -> Result<MemoryStore, CliError> {
    let store = MemoryStore::open(path)?;
    if !store.is_empty() {
        return Err(CliError::Validation(format!(
            "{} already contains a site",
            path.display()
        )));
    }
    seed_demo(&store)?;
    tracing::debug!(path = %path.display(), "Demo site written");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_seed_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.json");

        seed_store(&path).unwrap();

        let reopened = MemoryStore::open(&path).unwrap();
        assert!(reopened.page_by_slug("home").unwrap().is_some());
        assert_eq!(reopened.pages().unwrap().len(), 3);
    }

    #[test]
    fn test_seed_refuses_existing_site() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.json");
        seed_store(&path).unwrap();

        let err = seed_store(&path).unwrap_err();

        assert!(err.to_string().contains("already contains a site"));
    }
}
