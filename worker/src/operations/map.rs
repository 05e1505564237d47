use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use errors::*;
use operations::operation_handler::{create_scratch_directory, OperationResources};
use wordcount::{self, map_document, HashPartitioner, PartitionEmitter};

const MAP_SCRATCH_PREFIX: &str = "wordcount-map-";

/// The `MapResult` maps every partition index to the locator of its uploaded intermediate object.
///
/// It serialises as `{"partitions": {"0": "<locator>", ...}}`.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct MapResult {
    pub partitions: BTreeMap<u64, String>,
}

pub fn map_output_name(task_id: &str, partition: usize) -> String {
    format!("map/{}-{}.txt", task_id, partition)
}

/// Runs the word count map over one input document.
///
/// Every partition gets an object, including partitions that received no records. Objects
/// already uploaded when a later upload fails are left in place.
pub fn perform_map(
    resources: &OperationResources,
    task_id: &str,
    input_locator: &str,
) -> Result<MapResult> {
    info!(
        "Performing map operation. task_id={} input={} partitions={}",
        task_id,
        input_locator,
        resources.config.partition_count
    );

    let scratch = create_scratch_directory(resources, MAP_SCRATCH_PREFIX)?;
    let partition_files = map_to_scratch(resources, input_locator, scratch.path())?;

    let mut result = MapResult::default();
    for (partition, path) in partition_files.iter().enumerate() {
        resources.cancel.check()?;

        let destination = map_output_name(task_id, partition);
        let locator = resources
            .data_abstraction_layer
            .upload_file(path, &destination)
            .chain_err(|| ErrorKind::UploadError(destination.clone()))?;
        result.partitions.insert(partition as u64, locator);
    }

    info!("Map operation complete. task_id={}", task_id);
    Ok(result)
}

// Writes one scratch file per partition and returns their paths in partition order.
fn map_to_scratch(
    resources: &OperationResources,
    input_locator: &str,
    scratch_directory: &Path,
) -> Result<Vec<PathBuf>> {
    let partitioner = HashPartitioner::new(resources.config.partition_count)?;
    let document = resources
        .document_fetcher
        .fetch_document(input_locator)
        .chain_err(|| ErrorKind::FetchError(input_locator.to_owned()))?;

    let mut paths = Vec::new();
    let mut sinks = Vec::new();
    for partition in 0..resources.config.partition_count {
        let path = scratch_directory.join(format!("partition-{}.txt", partition));
        let file = File::create(&path).chain_err(|| {
            ErrorKind::ScratchIOError(format!("unable to create {:?}", path))
        })?;
        sinks.push(BufWriter::new(file));
        paths.push(path);
    }

    let mut emitter = PartitionEmitter::new(partitioner, sinks)?;
    let tokens = map_document(BufReader::new(document), &mut emitter, &resources.cancel)
        .map_err(|err| input_error(err, input_locator))?;
    info!(
        "Mapped {} tokens. records_per_partition={:?}",
        tokens,
        emitter.records_per_partition()
    );

    emitter.into_sinks()?;
    Ok(paths)
}

// A read failure part way through the document is still a failure to fetch it.
fn input_error(err: wordcount::Error, input_locator: &str) -> Error {
    let is_input_failure = match *err.kind() {
        wordcount::ErrorKind::InputError(_) => true,
        _ => false,
    };

    if is_input_failure {
        Error::with_chain(err, ErrorKind::FetchError(input_locator.to_owned()))
    } else {
        err.into()
    }
}
