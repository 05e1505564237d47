use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};

use cancel::CancellationToken;
use errors::*;
use intermediate::RECORD_TERMINATOR;
use io::read_line;

const DEFAULT_CHUNK_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_MERGE_FAN_IN: usize = 16;
const CANCELLATION_CHECK_INTERVAL: u64 = 4096;
// Approximate per-line bookkeeping cost of an in-memory chunk.
const LINE_OVERHEAD_BYTES: usize = 24;

/// `SortOptions` bounds the memory and open files used by `ExternalSorter`.
#[derive(Clone, Debug, PartialEq)]
pub struct SortOptions {
    /// Approximate number of bytes of lines held in memory before a sorted run is spilled.
    pub chunk_bytes: usize,
    /// Maximum number of runs merged at once.
    pub merge_fan_in: usize,
}

impl Default for SortOptions {
    fn default() -> Self {
        SortOptions {
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            merge_fan_in: DEFAULT_MERGE_FAN_IN,
        }
    }
}

/// Counters reported by `ExternalSorter::sort_file`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SortSummary {
    pub lines: u64,
    pub runs: usize,
    pub merge_passes: usize,
}

// A sorted run on local disk, removed when dropped.
struct RunFile {
    path: PathBuf,
}

impl Drop for RunFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            debug!("Unable to remove sort run {:?}: {}", self.path, err);
        }
    }
}

/// `ExternalSorter` sorts a line-oriented file by full-line byte order without loading it into
/// memory.
///
/// The input is cut into chunks of about `chunk_bytes`, each chunk is sorted in memory and
/// spilled as a run in `scratch_directory`, and the runs are merged `merge_fan_in` at a time
/// until one sorted output remains. Inputs that fit in one chunk are sorted in memory and written
/// straight to the output. Lines are compared without their terminator and every output line is
/// terminated.
pub struct ExternalSorter {
    scratch_directory: PathBuf,
    options: SortOptions,
    cancel: CancellationToken,
}

impl ExternalSorter {
    pub fn new(scratch_directory: &Path, options: SortOptions, cancel: CancellationToken) -> Self {
        ExternalSorter {
            scratch_directory: scratch_directory.to_path_buf(),
            options,
            cancel,
        }
    }

    pub fn sort_file(&self, input: &Path, output: &Path) -> Result<SortSummary> {
        if self.options.chunk_bytes == 0 || self.options.merge_fan_in < 2 {
            return Err(
                ErrorKind::SortError(format!("invalid sort options {:?}", self.options)).into(),
            );
        }

        let mut summary = SortSummary::default();
        let file = File::open(input).chain_err(|| {
            ErrorKind::SortError(format!("unable to open {:?}", input))
        })?;
        let mut source = BufReader::new(file);

        let mut runs: Vec<RunFile> = Vec::new();
        let mut chunk: Vec<Vec<u8>> = Vec::new();
        let mut chunk_bytes = 0;
        let mut line = Vec::new();

        loop {
            let more = read_line(&mut source, &mut line).chain_err(|| {
                ErrorKind::SortError(format!("unable to read {:?}", input))
            })?;
            if !more {
                break;
            }

            summary.lines += 1;
            if summary.lines % CANCELLATION_CHECK_INTERVAL == 0 {
                self.cancel.check()?;
            }

            chunk_bytes += line.len() + LINE_OVERHEAD_BYTES;
            chunk.push(mem::replace(&mut line, Vec::new()));

            if chunk_bytes >= self.options.chunk_bytes {
                let run = self.spill_run(&mut chunk, 0, runs.len())?;
                runs.push(run);
                chunk_bytes = 0;
            }
        }
        self.cancel.check()?;

        if runs.is_empty() {
            chunk.sort_unstable();
            write_lines(&chunk, output)?;
            return Ok(summary);
        }

        if !chunk.is_empty() {
            let run = self.spill_run(&mut chunk, 0, runs.len())?;
            runs.push(run);
        }
        summary.runs = runs.len();
        debug!(
            "Spilled {} sorted runs for {:?}, merging",
            summary.runs,
            input
        );

        let mut pass = 0;
        while runs.len() > self.options.merge_fan_in {
            pass += 1;
            let mut merged = Vec::new();
            let mut remaining = runs.into_iter();
            loop {
                let group: Vec<RunFile> = remaining
                    .by_ref()
                    .take(self.options.merge_fan_in)
                    .collect();
                if group.is_empty() {
                    break;
                }
                let path = self.run_path(pass, merged.len());
                self.merge_runs(&group, &path)?;
                merged.push(RunFile { path });
            }
            runs = merged;
        }

        self.merge_runs(&runs, output)?;
        summary.merge_passes = pass + 1;
        Ok(summary)
    }

    fn run_path(&self, pass: usize, index: usize) -> PathBuf {
        self.scratch_directory.join(format!("sort-run-{}-{}", pass, index))
    }

    fn spill_run(&self, chunk: &mut Vec<Vec<u8>>, pass: usize, index: usize) -> Result<RunFile> {
        chunk.sort_unstable();
        let run = RunFile { path: self.run_path(pass, index) };
        write_lines(chunk, &run.path)?;
        chunk.clear();
        Ok(run)
    }

    fn merge_runs(&self, runs: &[RunFile], output: &Path) -> Result<()> {
        let mut readers = Vec::with_capacity(runs.len());
        for run in runs {
            let file = File::open(&run.path).chain_err(|| {
                ErrorKind::SortError(format!("unable to open sort run {:?}", run.path))
            })?;
            readers.push(BufReader::new(file));
        }

        let mut heap = BinaryHeap::with_capacity(readers.len());
        for (index, reader) in readers.iter_mut().enumerate() {
            if let Some(line) = next_run_line(reader)? {
                heap.push(Reverse((line, index)));
            }
        }

        let file = File::create(output).chain_err(|| {
            ErrorKind::SortError(format!("unable to create {:?}", output))
        })?;
        let mut sink = BufWriter::new(file);
        let mut merged: u64 = 0;

        while let Some(Reverse((line, index))) = heap.pop() {
            write_line(&mut sink, &line, output)?;
            if let Some(next) = next_run_line(&mut readers[index])? {
                heap.push(Reverse((next, index)));
            }

            merged += 1;
            if merged % CANCELLATION_CHECK_INTERVAL == 0 {
                self.cancel.check()?;
            }
        }

        sink.flush().chain_err(|| {
            ErrorKind::SortError(format!("unable to flush {:?}", output))
        })
    }
}

fn next_run_line(reader: &mut BufReader<File>) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let more = read_line(reader, &mut line).chain_err(|| {
        ErrorKind::SortError("unable to read sort run".to_owned())
    })?;
    if !more {
        return Ok(None);
    }
    Ok(Some(line))
}

fn write_lines(lines: &[Vec<u8>], path: &Path) -> Result<()> {
    let file = File::create(path).chain_err(|| {
        ErrorKind::SortError(format!("unable to create {:?}", path))
    })?;
    let mut sink = BufWriter::new(file);
    for line in lines {
        write_line(&mut sink, line, path)?;
    }
    sink.flush().chain_err(|| {
        ErrorKind::SortError(format!("unable to flush {:?}", path))
    })
}

fn write_line<W: Write>(sink: &mut W, line: &[u8], path: &Path) -> Result<()> {
    sink.write_all(line)
        .and_then(|_| sink.write_all(&[RECORD_TERMINATOR]))
        .chain_err(|| ErrorKind::SortError(format!("unable to write {:?}", path)))
}
