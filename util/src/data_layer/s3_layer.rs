use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use bytes::Bytes;
use futures::stream;
use rusoto_core::{ByteStream, Region, RusotoError};
use rusoto_s3::{GetObjectRequest, HeadObjectError, HeadObjectRequest, PutObjectRequest, S3Client,
                S3};
use tokio::runtime::{Builder, Runtime};

use errors::*;
use data_layer::abstraction_layer::AbstractionLayer;

const S3_SCHEME: &str = "s3://";
const UPLOAD_CHUNK_BYTES: usize = 1024 * 1024;

/// An `AbstractionLayer` storing objects in a single S3 bucket.
///
/// Locators have the form `s3://<bucket>/<key>`. Bare keys are read as keys in the configured
/// bucket. Object bodies are streamed in both directions.
pub struct AmazonS3AbstractionLayer {
    client: S3Client,
    bucket: String,
    runtime: Runtime,
}

impl AmazonS3AbstractionLayer {
    /// Connects to `bucket`. Without an explicit region name the region is taken from the AWS
    /// environment variables.
    pub fn new(bucket: String, region_name: Option<&str>) -> Result<Self> {
        let region = match region_name {
            Some(name) => name.parse::<Region>().chain_err(|| {
                format!("Unknown AWS region '{}'", name)
            })?,
            None => Region::default(),
        };

        let runtime = Builder::new_multi_thread().enable_all().build().chain_err(
            || "Unable to start the S3 client runtime",
        )?;

        let client = {
            let _guard = runtime.enter();
            S3Client::new(region)
        };

        Ok(AmazonS3AbstractionLayer {
            client,
            bucket,
            runtime,
        })
    }

    fn object_key(&self, locator: &str) -> Result<String> {
        if locator.starts_with(S3_SCHEME) {
            let mut parts = locator[S3_SCHEME.len()..].splitn(2, '/');
            let bucket = parts.next().unwrap_or("");
            let key = parts.next().unwrap_or("");

            if bucket != self.bucket {
                return Err(
                    format!(
                        "Locator {} is not in bucket '{}'",
                        locator,
                        self.bucket
                    ).into(),
                );
            }
            if key.is_empty() {
                return Err(format!("Locator {} does not name an object", locator).into());
            }
            return Ok(key.to_owned());
        }

        let key = locator.trim_start_matches('/');
        if key.is_empty() {
            return Err(format!("Locator {} does not name an object", locator).into());
        }
        Ok(key.to_owned())
    }

    fn locator(&self, key: &str) -> String {
        format!("{}{}/{}", S3_SCHEME, self.bucket, key)
    }
}

/// Reads a local file as a sequence of chunks for a streaming upload body.
struct FileChunks {
    file: File,
}

impl Iterator for FileChunks {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<io::Result<Bytes>> {
        let mut chunk = vec![0; UPLOAD_CHUNK_BYTES];
        let mut filled = 0;
        while filled < chunk.len() {
            match self.file.read(&mut chunk[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Some(Err(err)),
            }
        }

        if filled == 0 {
            return None;
        }
        chunk.truncate(filled);
        Some(Ok(Bytes::from(chunk)))
    }
}

impl AbstractionLayer for AmazonS3AbstractionLayer {
    fn upload_file(&self, local_path: &Path, destination: &str) -> Result<String> {
        let key = self.object_key(destination)?;
        let file = File::open(local_path).chain_err(|| {
            format!("Unable to open {:?} for upload", local_path)
        })?;
        let size = file.metadata()
            .chain_err(|| format!("Unable to read metadata of {:?}", local_path))?
            .len();

        debug!("Uploading {:?} to {}", local_path, self.locator(&key));
        let body = ByteStream::new_with_size(stream::iter(FileChunks { file }), size as usize);
        let request = PutObjectRequest {
            bucket: self.bucket.clone(),
            key: key.clone(),
            body: Some(body),
            content_length: Some(size as i64),
            ..Default::default()
        };

        self.runtime
            .block_on(self.client.put_object(request))
            .chain_err(|| format!("Unable to upload object {}", key))?;
        Ok(self.locator(&key))
    }

    fn download_object(&self, locator: &str) -> Result<Box<dyn Read + Send>> {
        let key = self.object_key(locator)?;
        let request = GetObjectRequest {
            bucket: self.bucket.clone(),
            key: key.clone(),
            ..Default::default()
        };

        let response = self.runtime
            .block_on(self.client.get_object(request))
            .chain_err(|| format!("Unable to get object {}", locator))?;
        match response.body {
            Some(body) => Ok(Box::new(body.into_blocking_read())),
            None => Err(format!("Object {} has no body", locator).into()),
        }
    }

    fn object_exists(&self, locator: &str) -> Result<bool> {
        let key = self.object_key(locator)?;
        let request = HeadObjectRequest {
            bucket: self.bucket.clone(),
            key,
            ..Default::default()
        };

        match self.runtime.block_on(self.client.head_object(request)) {
            Ok(_) => Ok(true),
            Err(RusotoError::Service(HeadObjectError::NoSuchKey(_))) => Ok(false),
            Err(RusotoError::Unknown(ref response)) if response.status.as_u16() == 404 => {
                Ok(false)
            }
            Err(err) => Err(err).chain_err(|| {
                format!("Unable to retrieve metadata for object {}", locator)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> AmazonS3AbstractionLayer {
        AmazonS3AbstractionLayer::new("corpus".to_owned(), Some("us-east-1")).unwrap()
    }

    #[test]
    fn object_key_from_locator() {
        let layer = layer();

        assert_eq!("map/t-0.txt", layer.object_key("s3://corpus/map/t-0.txt").unwrap());
        assert_eq!("map/t-0.txt", layer.object_key("/map/t-0.txt").unwrap());
        assert_eq!("s3://corpus/reduce/1.txt", layer.locator("reduce/1.txt"));
    }

    #[test]
    fn object_key_rejects_other_buckets() {
        let layer = layer();

        assert!(layer.object_key("s3://elsewhere/doc.txt").is_err());
        assert!(layer.object_key("s3://corpus/").is_err());
        assert!(layer.object_key("/").is_err());
    }
}
