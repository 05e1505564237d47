use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::{Builder, TempDir};

use config::WordCountConfig;
use errors::*;
use util::DocumentFetcher;
use util::data_layer::AbstractionLayer;
use wordcount::CancellationToken;

/// `OperationResources` is everything a map or reduce operation needs from its environment.
pub struct OperationResources {
    pub data_abstraction_layer: Arc<dyn AbstractionLayer + Send + Sync>,
    pub document_fetcher: Arc<dyn DocumentFetcher + Send + Sync>,
    pub config: WordCountConfig,
    pub cancel: CancellationToken,
    pub scratch: ScratchRegistry,
}

/// `ScratchRegistry` records the scratch directories that are currently in use, so that a worker
/// exiting without unwinding can still remove them.
#[derive(Clone, Debug, Default)]
pub struct ScratchRegistry {
    directories: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScratchRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    fn directories(&self) -> MutexGuard<Vec<PathBuf>> {
        match self.directories.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn register(&self, path: &Path) {
        self.directories().push(path.to_path_buf());
    }

    fn release(&self, path: &Path) {
        self.directories().retain(|directory| directory != path);
    }

    #[cfg(test)]
    pub fn active(&self) -> Vec<PathBuf> {
        self.directories().clone()
    }

    /// Removes every registered directory and forgets it.
    pub fn remove_all(&self) {
        for directory in self.directories().drain(..) {
            match fs::remove_dir_all(&directory) {
                Ok(()) => info!("Removed scratch directory {:?}", directory),
                Err(err) => warn!("Unable to remove scratch directory {:?}: {}", directory, err),
            }
        }
    }
}

/// The scratch directory of one operation. It is removed when dropped.
pub struct ScratchDirectory {
    directory: TempDir,
    registry: ScratchRegistry,
}

impl ScratchDirectory {
    pub fn path(&self) -> &Path {
        self.directory.path()
    }
}

impl Drop for ScratchDirectory {
    fn drop(&mut self) {
        self.registry.release(self.directory.path());
    }
}

/// Creates the scratch directory of one operation under the configured scratch directory and
/// registers it with the resources' `ScratchRegistry`.
pub fn create_scratch_directory(
    resources: &OperationResources,
    prefix: &str,
) -> Result<ScratchDirectory> {
    let parent = &resources.config.scratch_directory;
    fs::create_dir_all(parent).chain_err(|| {
        ErrorKind::ScratchIOError(format!("unable to create scratch directory {:?}", parent))
    })?;

    let scratch = Builder::new().prefix(prefix).tempdir_in(parent).chain_err(|| {
        ErrorKind::ScratchIOError(format!("unable to create scratch directory in {:?}", parent))
    })?;
    debug!("Using scratch directory {:?}", scratch.path());
    resources.scratch.register(scratch.path());
    Ok(ScratchDirectory {
        directory: scratch,
        registry: resources.scratch.clone(),
    })
}

/// Removes a scratch file that is no longer needed. Failures are logged and otherwise ignored,
/// the scratch directory removal catches anything left behind.
pub fn remove_scratch_file(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!("Unable to remove scratch file {:?}: {}", path, err);
    }
}
