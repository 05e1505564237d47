use std::io::Read;
use std::path::Path;

use errors::*;

/// `AbstractionLayer` is the object store used for input documents, intermediate partitions
/// and reduce output.
///
/// Objects are addressed by locator strings. A locator returned by `upload_file` can be passed
/// back to `download_object` on any worker sharing the same store.
pub trait AbstractionLayer {
    /// Stores the content of a local file under `destination` and returns the object's locator.
    ///
    /// The object becomes visible only once it is complete, a failed upload leaves nothing
    /// behind under `destination`.
    fn upload_file(&self, local_path: &Path, destination: &str) -> Result<String>;

    /// Opens a streaming reader over a stored object. Dropping the reader releases it.
    fn download_object(&self, locator: &str) -> Result<Box<dyn Read + Send>>;

    fn object_exists(&self, locator: &str) -> Result<bool>;
}
