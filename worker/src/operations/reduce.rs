use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use errors::*;
use operations::operation_handler::{create_scratch_directory, remove_scratch_file,
                                    OperationResources};
use wordcount::io::append_object;
use wordcount::{merge_sorted, ExternalSorter, MergeSummary};

const REDUCE_SCRATCH_PREFIX: &str = "wordcount-reduce-";

/// The `ReduceResult` holds the locator of the uploaded `key<TAB>count` object.
#[derive(Debug, PartialEq, Serialize)]
pub struct ReduceResult {
    pub output: String,
}

pub fn reduce_output_name(partition: u64) -> String {
    format!("reduce/{}.txt", partition)
}

/// Counts the words of one partition.
///
/// The intermediate objects are concatenated in the given order, sorted by full line and
/// collapsed into one record per key. Nothing is uploaded unless every stage succeeds.
pub fn perform_reduce(
    resources: &OperationResources,
    partition: u64,
    input_locators: &[String],
) -> Result<ReduceResult> {
    info!(
        "Performing reduce operation. partition={} inputs={}",
        partition,
        input_locators.len()
    );

    let scratch = create_scratch_directory(resources, REDUCE_SCRATCH_PREFIX)?;
    let output_path = reduce_to_scratch(resources, input_locators, scratch.path())?;
    resources.cancel.check()?;

    let destination = reduce_output_name(partition);
    let output = resources
        .data_abstraction_layer
        .upload_file(&output_path, &destination)
        .chain_err(|| ErrorKind::UploadError(destination.clone()))?;

    info!(
        "Reduce operation complete. partition={} output={}",
        partition,
        output
    );
    Ok(ReduceResult { output })
}

fn reduce_to_scratch(
    resources: &OperationResources,
    input_locators: &[String],
    scratch_directory: &Path,
) -> Result<PathBuf> {
    let concatenated = scratch_directory.join("concatenated.txt");
    let bytes = download_inputs(resources, input_locators, &concatenated)?;
    info!(
        "Downloaded {} bytes from {} intermediate objects",
        bytes,
        input_locators.len()
    );

    let sorted = scratch_directory.join("sorted.txt");
    let sorter = ExternalSorter::new(
        scratch_directory,
        resources.config.sort_options(),
        resources.cancel.clone(),
    );
    let sort_summary = sorter.sort_file(&concatenated, &sorted)?;
    remove_scratch_file(&concatenated);
    info!(
        "Sorted {} records. runs={} merge_passes={}",
        sort_summary.lines,
        sort_summary.runs,
        sort_summary.merge_passes
    );

    let output = scratch_directory.join("output.txt");
    let merge_summary = merge_to_file(resources, &sorted, &output)?;
    remove_scratch_file(&sorted);
    info!(
        "Merged {} records into {} keys",
        merge_summary.records_read,
        merge_summary.keys_written
    );

    Ok(output)
}

// Streams every input object into one local file, closing each download once it is copied.
fn download_inputs(
    resources: &OperationResources,
    input_locators: &[String],
    destination: &Path,
) -> Result<u64> {
    let file = File::create(destination).chain_err(|| {
        ErrorKind::ScratchIOError(format!("unable to create {:?}", destination))
    })?;
    let mut sink = BufWriter::new(file);

    let mut bytes = 0;
    for locator in input_locators {
        resources.cancel.check()?;

        let mut source = resources
            .data_abstraction_layer
            .download_object(locator)
            .chain_err(|| ErrorKind::DownloadError(locator.clone()))?;
        bytes += append_object(&mut source, &mut sink).chain_err(|| {
            ErrorKind::DownloadError(locator.clone())
        })?;
        debug!("Downloaded {}", locator);
    }

    sink.flush().chain_err(|| {
        ErrorKind::ScratchIOError(format!("unable to write {:?}", destination))
    })?;
    Ok(bytes)
}

fn merge_to_file(
    resources: &OperationResources,
    sorted: &Path,
    output: &Path,
) -> Result<MergeSummary> {
    let source = File::open(sorted).chain_err(|| {
        ErrorKind::ScratchIOError(format!("unable to open {:?}", sorted))
    })?;
    let file = File::create(output).chain_err(|| {
        ErrorKind::ScratchIOError(format!("unable to create {:?}", output))
    })?;

    let summary = merge_sorted(
        BufReader::new(source),
        &mut BufWriter::new(file),
        resources.config.accumulation,
        &resources.cancel,
    )?;
    Ok(summary)
}
