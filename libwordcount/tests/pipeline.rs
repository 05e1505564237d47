//! Runs the map, concatenate, sort and merge stages together over local files.

extern crate tempfile;
extern crate wordcount;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Read};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wordcount::io::append_object;
use wordcount::partition::partition;
use wordcount::*;

const DOCUMENTS: &[&str] = &[
    "the cat sat on the mat\nthe end",
    "a dog and a cat\n\n  sat   together ",
    "",
    "zebra\tthe\r\nthe",
];

fn map_documents(scratch: &Path, partition_count: u64) -> Vec<Vec<PathBuf>> {
    let mut outputs = vec![Vec::new(); partition_count as usize];

    for (task, document) in DOCUMENTS.iter().enumerate() {
        let paths: Vec<PathBuf> = (0..partition_count)
            .map(|p| scratch.join(format!("map-{}-{}.txt", task, p)))
            .collect();
        let sinks = paths
            .iter()
            .map(|path| BufWriter::new(File::create(path).unwrap()))
            .collect();

        let partitioner = HashPartitioner::new(partition_count).unwrap();
        let mut emitter = PartitionEmitter::new(partitioner, sinks).unwrap();
        map_document(
            Cursor::new(document.as_bytes()),
            &mut emitter,
            &CancellationToken::new(),
        ).unwrap();
        emitter.into_sinks().unwrap();

        for (p, path) in paths.into_iter().enumerate() {
            outputs[p].push(path);
        }
    }
    outputs
}

fn reduce_partition(scratch: &Path, id: usize, inputs: &[PathBuf], options: SortOptions) -> String {
    let concatenated = scratch.join(format!("concatenated-{}.txt", id));
    {
        let mut sink = BufWriter::new(File::create(&concatenated).unwrap());
        for input in inputs {
            append_object(&mut File::open(input).unwrap(), &mut sink).unwrap();
        }
    }

    let sorted = scratch.join(format!("sorted-{}.txt", id));
    ExternalSorter::new(scratch, options, CancellationToken::new())
        .sort_file(&concatenated, &sorted)
        .unwrap();

    let mut output = Vec::new();
    merge_sorted(
        BufReader::new(File::open(&sorted).unwrap()),
        &mut output,
        Accumulation::CountRecords,
        &CancellationToken::new(),
    ).unwrap();
    String::from_utf8(output).unwrap()
}

fn expected_counts() -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for document in DOCUMENTS {
        for token in document.split_whitespace() {
            *counts.entry(token.to_owned()).or_insert(0) += 1;
        }
    }
    counts
}

fn run_pipeline(partition_count: u64, options: SortOptions) {
    let scratch = TempDir::new().unwrap();
    let map_outputs = map_documents(scratch.path(), partition_count);

    let mut counts = BTreeMap::new();
    for (id, inputs) in map_outputs.iter().enumerate() {
        let output = reduce_partition(scratch.path(), id, inputs, options.clone());

        let mut previous: Option<String> = None;
        for line in output.lines() {
            let mut fields = line.splitn(2, '\t');
            let key = fields.next().unwrap().to_owned();
            let count: i64 = fields.next().unwrap().parse().unwrap();

            assert!(count > 0);
            assert_eq!(id as u64, partition(key.as_bytes(), partition_count).unwrap());
            if let Some(ref previous) = previous {
                assert!(previous.as_str() < key.as_str());
            }
            previous = Some(key.clone());
            assert!(counts.insert(key, count).is_none());
        }
    }

    assert_eq!(expected_counts(), counts);
}

#[test]
fn pipeline_counts_every_word() {
    run_pipeline(3, SortOptions::default());
}

#[test]
fn pipeline_with_spilling_sort() {
    run_pipeline(
        2,
        SortOptions {
            chunk_bytes: 32,
            merge_fan_in: 2,
        },
    );
}

#[test]
fn pipeline_single_partition() {
    run_pipeline(1, SortOptions::default());
}

#[test]
fn empty_partitions_reduce_to_empty_output() {
    let scratch = TempDir::new().unwrap();
    let map_outputs = map_documents(scratch.path(), 64);

    let empty: Vec<&Vec<PathBuf>> = map_outputs
        .iter()
        .filter(|inputs| inputs.iter().all(|path| fs::metadata(path).unwrap().len() == 0))
        .collect();
    assert!(!empty.is_empty());

    let output = reduce_partition(scratch.path(), 999, empty[0], SortOptions::default());
    assert_eq!("", output);

    let mut content = String::new();
    File::open(&empty[0][0])
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!("", content);
}
