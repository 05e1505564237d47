use std::hash::Hasher;

use errors::*;

const FNV_OFFSET_BASIS_32: u32 = 0x811c_9dc5;
const FNV_PRIME_32: u32 = 0x0100_0193;

/// `Fnv1a32Hasher` is a 32-bit FNV-1a hasher.
///
/// Unlike `DefaultHasher` its output is the same in every process, on every machine and with every
/// Rust release.
pub struct Fnv1a32Hasher {
    state: u32,
}

impl Default for Fnv1a32Hasher {
    fn default() -> Self {
        Fnv1a32Hasher { state: FNV_OFFSET_BASIS_32 }
    }
}

impl Fnv1a32Hasher {
    pub fn finish_32(&self) -> u32 {
        self.state
    }
}

impl Hasher for Fnv1a32Hasher {
    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.state ^= u32::from(*byte);
            self.state = self.state.wrapping_mul(FNV_PRIME_32);
        }
    }

    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hasher = Fnv1a32Hasher::default();
    hasher.write(bytes);
    hasher.finish_32()
}

/// `partition` returns the partition index in `[0, partition_count)` for a raw key.
pub fn partition(key: &[u8], partition_count: u64) -> Result<u64> {
    if partition_count == 0 {
        return Err(ErrorKind::InvalidPartitionCount(partition_count).into());
    }
    Ok(u64::from(fnv1a_32(key)) % partition_count)
}

/// The `Partition` trait decides which reduce partition receives a key emitted by a map.
pub trait Partition {
    fn partition(&self, key: &[u8]) -> u64;

    fn partition_count(&self) -> u64;
}

/// `HashPartitioner` implements `Partition` using FNV-1a modulo the partition count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HashPartitioner {
    partition_count: u64,
}

impl HashPartitioner {
    pub fn new(partition_count: u64) -> Result<Self> {
        if partition_count == 0 {
            return Err(ErrorKind::InvalidPartitionCount(partition_count).into());
        }
        Ok(HashPartitioner { partition_count })
    }
}

impl Partition for HashPartitioner {
    fn partition(&self, key: &[u8]) -> u64 {
        u64::from(fnv1a_32(key)) % self.partition_count
    }

    fn partition_count(&self) -> u64 {
        self.partition_count
    }
}
