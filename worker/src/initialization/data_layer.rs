use std::path::Path;
use std::sync::Arc;

use clap::ArgMatches;

use errors::*;
use util::data_layer::{AbstractionLayer, NFSAbstractionLayer};
#[cfg(feature = "s3")]
use util::data_layer::AmazonS3AbstractionLayer;

const DEFAULT_NFS_DIRECTORY: &str = "/tmp/wordcount/storage/";

pub type AbstractionLayerArc = Arc<dyn AbstractionLayer + Send + Sync>;

pub fn get_data_abstraction_layer(matches: &ArgMatches) -> Result<AbstractionLayerArc> {
    if let Some(layer) = get_s3_abstraction_layer(matches)? {
        return Ok(layer);
    }

    let nfs_path = matches.value_of("nfs").unwrap_or(DEFAULT_NFS_DIRECTORY);
    info!("Storing objects in {}", nfs_path);
    Ok(Arc::new(NFSAbstractionLayer::new(Path::new(nfs_path))))
}

#[cfg(feature = "s3")]
fn get_s3_abstraction_layer(matches: &ArgMatches) -> Result<Option<AbstractionLayerArc>> {
    let bucket = match matches.value_of("s3-bucket") {
        Some(bucket) => bucket,
        None => return Ok(None),
    };

    info!("Storing objects in S3 bucket {}", bucket);
    let layer = AmazonS3AbstractionLayer::new(bucket.to_owned(), matches.value_of("s3-region"))
        .chain_err(|| "Unable to create S3 abstraction layer")?;
    Ok(Some(Arc::new(layer)))
}

#[cfg(not(feature = "s3"))]
fn get_s3_abstraction_layer(_matches: &ArgMatches) -> Result<Option<AbstractionLayerArc>> {
    Ok(None)
}
