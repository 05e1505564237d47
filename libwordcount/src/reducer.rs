use std::io::{BufRead, Write};
use std::mem;

use cancel::CancellationToken;
use errors::*;
use intermediate::{FinalRecord, IntermediateRecord};
use io::read_line;

const CANCELLATION_CHECK_INTERVAL: u64 = 4096;

/// `Accumulation` decides how a record whose key matches the current group is folded into the
/// group's count.
///
/// `CountRecords` adds one per matching record regardless of its value; the first record of a
/// group always contributes its parsed value. This equals summation only while every input
/// value is `1`, so feeding reduce output back into another reduce undercounts. `SumValues` adds
/// the parsed value of every record.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulation {
    CountRecords,
    SumValues,
}

impl Default for Accumulation {
    fn default() -> Self {
        Accumulation::CountRecords
    }
}

#[derive(Debug, PartialEq)]
enum GroupState {
    Empty,
    Accumulating { key: Vec<u8>, count: i64 },
}

/// `GroupAccumulator` is the group-by-key state machine run over a sorted record stream.
///
/// Feeding a record with a new key completes the previous group, `finish` completes the last
/// one. Groups whose count is not positive are never returned.
#[derive(Debug)]
pub struct GroupAccumulator {
    state: GroupState,
    accumulation: Accumulation,
}

impl GroupAccumulator {
    pub fn new(accumulation: Accumulation) -> Self {
        GroupAccumulator {
            state: GroupState::Empty,
            accumulation,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state == GroupState::Empty
    }

    /// Feeds one record, returning the previous group if this record started a new one.
    pub fn push(&mut self, record: &IntermediateRecord) -> Option<FinalRecord> {
        if let GroupState::Accumulating {
            ref key,
            ref mut count,
        } = self.state
        {
            if key.as_slice() == record.key {
                let increment = match self.accumulation {
                    Accumulation::CountRecords => 1,
                    Accumulation::SumValues => record.value,
                };
                *count = count.saturating_add(increment);
                return None;
            }
        }

        let next = GroupState::Accumulating {
            key: record.key.to_vec(),
            count: record.value,
        };
        GroupAccumulator::completed(mem::replace(&mut self.state, next))
    }

    /// Completes the last group and resets the accumulator.
    pub fn finish(&mut self) -> Option<FinalRecord> {
        GroupAccumulator::completed(mem::replace(&mut self.state, GroupState::Empty))
    }

    fn completed(state: GroupState) -> Option<FinalRecord> {
        match state {
            GroupState::Accumulating { key, count } if count > 0 => {
                Some(FinalRecord { key, count })
            }
            _ => None,
        }
    }
}

/// Counters reported by `merge_sorted`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MergeSummary {
    pub records_read: u64,
    pub keys_written: u64,
}

/// `merge_sorted` collapses a sorted intermediate stream into final `key<TAB>count` records.
///
/// A malformed line aborts the merge with `ErrorKind::ParseError`; nothing is skipped.
pub fn merge_sorted<R, W>(
    mut source: R,
    sink: &mut W,
    accumulation: Accumulation,
    cancel: &CancellationToken,
) -> Result<MergeSummary>
where
    R: BufRead,
    W: Write,
{
    let mut accumulator = GroupAccumulator::new(accumulation);
    let mut summary = MergeSummary::default();
    let mut line = Vec::new();

    loop {
        let more = read_line(&mut source, &mut line).chain_err(|| {
            ErrorKind::ScratchIOError("unable to read sorted intermediate records".to_owned())
        })?;
        if !more {
            break;
        }

        summary.records_read += 1;
        if summary.records_read % CANCELLATION_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }

        let record = IntermediateRecord::parse(&line)?;
        if let Some(group) = accumulator.push(&record) {
            write_group(sink, &group)?;
            summary.keys_written += 1;
        }
    }

    if let Some(group) = accumulator.finish() {
        write_group(sink, &group)?;
        summary.keys_written += 1;
    }
    cancel.check()?;

    sink.flush().chain_err(|| {
        ErrorKind::ScratchIOError("unable to flush reduce output".to_owned())
    })?;
    Ok(summary)
}

fn write_group<W: Write>(sink: &mut W, group: &FinalRecord) -> Result<()> {
    group.write_to(sink).chain_err(|| {
        ErrorKind::ScratchIOError("unable to write reduce output".to_owned())
    })
}
