use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use config::WordCountConfig;
use operations::{OperationResources, ScratchRegistry};
use util::LocatorFetcher;
use util::data_layer::{AbstractionLayer, NFSAbstractionLayer};
use wordcount::CancellationToken;

/// A storage root and a scratch root, both removed when dropped, with resources wired to them.
pub struct TestEnvironment {
    pub store: TempDir,
    pub scratch: TempDir,
    pub resources: OperationResources,
}

impl TestEnvironment {
    pub fn new(partition_count: u64) -> Self {
        let store = TempDir::new().unwrap();
        let layer = Arc::new(NFSAbstractionLayer::new(store.path()));
        TestEnvironment::with_layer(store, layer, partition_count)
    }

    /// Uses a layer whose uploads always fail, downloads still work.
    pub fn with_failing_uploads(partition_count: u64) -> Self {
        let store = TempDir::new().unwrap();
        let layer = Arc::new(FailingUploadLayer {
            inner: NFSAbstractionLayer::new(store.path()),
        });
        TestEnvironment::with_layer(store, layer, partition_count)
    }

    fn with_layer(
        store: TempDir,
        layer: Arc<dyn AbstractionLayer + Send + Sync>,
        partition_count: u64,
    ) -> Self {
        let scratch = TempDir::new().unwrap();
        let mut config = WordCountConfig::default();
        config.partition_count = partition_count;
        config.scratch_directory = scratch.path().to_path_buf();

        let fetcher = LocatorFetcher::new(Arc::clone(&layer), config.fetch_timeout()).unwrap();
        TestEnvironment {
            store,
            scratch,
            resources: OperationResources {
                data_abstraction_layer: layer,
                document_fetcher: Arc::new(fetcher),
                config,
                cancel: CancellationToken::new(),
                scratch: ScratchRegistry::new(),
            },
        }
    }

    /// Stores an object directly in the storage root and returns its locator.
    pub fn put(&self, name: &str, content: &str) -> String {
        let path = self.store.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    pub fn read(&self, locator: &str) -> String {
        let mut content = String::new();
        self.resources
            .data_abstraction_layer
            .download_object(locator)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resources
            .data_abstraction_layer
            .object_exists(name)
            .unwrap()
    }

    pub fn scratch_is_empty(&self) -> bool {
        fs::read_dir(self.scratch.path()).unwrap().next().is_none()
    }
}

struct FailingUploadLayer {
    inner: NFSAbstractionLayer,
}

impl AbstractionLayer for FailingUploadLayer {
    fn upload_file(&self, _local_path: &Path, destination: &str) -> ::util::errors::Result<String> {
        Err(format!("upload of {} refused", destination).into())
    }

    fn download_object(&self, locator: &str) -> ::util::errors::Result<Box<dyn Read + Send>> {
        self.inner.download_object(locator)
    }

    fn object_exists(&self, locator: &str) -> ::util::errors::Result<bool> {
        self.inner.object_exists(locator)
    }
}
