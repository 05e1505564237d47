use std::io::Write;

use errors::*;
use intermediate::IntermediateRecord;
use partition::Partition;

/// The Emit trait specifies structs which can receive the key-value pairs produced by a map.
pub trait Emit {
    /// Takes a key-value pair and moves it somewhere else.
    ///
    /// Returns an empty `Result` used for error handling.
    fn emit(&mut self, key: &[u8], value: i64) -> Result<()>;
}

/// A struct implementing `Emit` which writes each pair as an intermediate record into the sink
/// of the partition its key hashes to.
///
/// Records are written in the order they are emitted, so each sink preserves first-seen order.
pub struct PartitionEmitter<P: Partition, W: Write> {
    partitioner: P,
    sinks: Vec<W>,
    records: Vec<u64>,
}

impl<P: Partition, W: Write> PartitionEmitter<P, W> {
    /// Constructs a new `PartitionEmitter`.
    ///
    /// # Arguments
    ///
    /// * `partitioner` - Decides which sink receives a key.
    /// * `sinks` - Exactly one sink per partition, indexed by partition.
    pub fn new(partitioner: P, sinks: Vec<W>) -> Result<Self> {
        if sinks.len() as u64 != partitioner.partition_count() {
            return Err(
                format!(
                    "Expected {} partition sinks, got {}",
                    partitioner.partition_count(),
                    sinks.len()
                ).into(),
            );
        }

        let records = vec![0; sinks.len()];
        Ok(PartitionEmitter {
            partitioner,
            sinks,
            records,
        })
    }

    /// Number of records written to each partition so far.
    pub fn records_per_partition(&self) -> &[u64] {
        &self.records
    }

    /// Flushes every sink and hands them back in partition order.
    pub fn into_sinks(mut self) -> Result<Vec<W>> {
        for (partition, sink) in self.sinks.iter_mut().enumerate() {
            sink.flush().chain_err(|| {
                ErrorKind::ScratchIOError(format!("unable to flush partition {}", partition))
            })?;
        }
        Ok(self.sinks)
    }
}

impl<P: Partition, W: Write> Emit for PartitionEmitter<P, W> {
    fn emit(&mut self, key: &[u8], value: i64) -> Result<()> {
        let partition = self.partitioner.partition(key) as usize;
        IntermediateRecord::new(key, value)
            .write_to(&mut self.sinks[partition])
            .chain_err(|| {
                ErrorKind::ScratchIOError(format!("unable to write to partition {}", partition))
            })?;
        self.records[partition] += 1;
        Ok(())
    }
}

/// A struct implementing `Emit` which collects the pairs into a `Vec`.
#[cfg(test)]
pub struct VecEmitter<'a> {
    sink: &'a mut Vec<(Vec<u8>, i64)>,
}

#[cfg(test)]
impl<'a> VecEmitter<'a> {
    pub fn new(sink: &'a mut Vec<(Vec<u8>, i64)>) -> Self {
        VecEmitter { sink }
    }
}

#[cfg(test)]
impl<'a> Emit for VecEmitter<'a> {
    fn emit(&mut self, key: &[u8], value: i64) -> Result<()> {
        self.sink.push((key.to_vec(), value));
        Ok(())
    }
}
