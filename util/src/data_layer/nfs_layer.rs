use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use errors::*;

use data_layer::abstraction_layer::AbstractionLayer;

const FILE_SCHEME: &str = "file://";

/// An `AbstractionLayer` backed by a directory, usually a mounted network filesystem shared by
/// every worker.
///
/// Locators are absolute paths inside that directory. Paths outside it are read as being
/// relative to it, so `/input/a.txt` and `input/a.txt` both name `<root>/input/a.txt`.
pub struct NFSAbstractionLayer {
    nfs_path: PathBuf,
}

impl NFSAbstractionLayer {
    pub fn new(nfs_path: &Path) -> Self {
        NFSAbstractionLayer { nfs_path: PathBuf::from(nfs_path) }
    }

    fn absolute_path(&self, locator: &str) -> Result<PathBuf> {
        let path = Path::new(locator.trim_start_matches(FILE_SCHEME));
        if path
            .components()
            .any(|component| component == Component::ParentDir)
        {
            return Err(format!("Locator {} escapes the storage directory", locator).into());
        }

        if path.starts_with(&self.nfs_path) {
            return Ok(path.to_path_buf());
        }

        let relative_path = path.strip_prefix("/").unwrap_or(path);
        if relative_path.as_os_str().is_empty() {
            return Err(format!("Locator {} does not name an object", locator).into());
        }
        Ok(self.nfs_path.join(relative_path))
    }
}

impl AbstractionLayer for NFSAbstractionLayer {
    fn upload_file(&self, local_path: &Path, destination: &str) -> Result<String> {
        let destination_path = self.absolute_path(destination).chain_err(
            || "Unable to get destination path",
        )?;

        let file_name = match destination_path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return Err(format!("Destination {} has no file name", destination).into()),
        };
        if let Some(parent) = destination_path.parent() {
            fs::create_dir_all(parent).chain_err(|| {
                format!("Unable to create directory {:?}", parent)
            })?;
        }

        let partial_path =
            destination_path.with_file_name(format!(".{}.{}.partial", file_name, Uuid::new_v4()));
        debug!("Uploading {:?} to {:?}", local_path, destination_path);

        let result = fs::copy(local_path, &partial_path)
            .chain_err(|| format!("Unable to copy {:?} to {:?}", local_path, partial_path))
            .and_then(|_| {
                fs::rename(&partial_path, &destination_path).chain_err(|| {
                    format!("Unable to move upload into place at {:?}", destination_path)
                })
            });
        if result.is_err() {
            let _ = fs::remove_file(&partial_path);
        }
        result?;

        Ok(destination_path.to_string_lossy().into_owned())
    }

    fn download_object(&self, locator: &str) -> Result<Box<dyn Read + Send>> {
        let file_path = self.absolute_path(locator).chain_err(|| "Unable to get path")?;
        debug!("Opening file: {}", file_path.to_string_lossy());
        let file = File::open(&file_path).chain_err(|| {
            format!("unable to open file {:?}", file_path)
        })?;
        Ok(Box::new(file))
    }

    fn object_exists(&self, locator: &str) -> Result<bool> {
        let file_path = self.absolute_path(locator).chain_err(|| "Unable to get path")?;
        Ok(file_path.is_file())
    }
}
