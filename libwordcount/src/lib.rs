#![recursion_limit = "1024"]

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
extern crate serde;
#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate tempfile;

pub mod errors {
    error_chain! {
        foreign_links {
            Io(::std::io::Error);
        }

        errors {
            InputError(detail: String) {
                description("input document stream failure")
                display("input document stream failure: {}", detail)
            }
            ScratchIOError(detail: String) {
                description("local scratch file failure")
                display("local scratch file failure: {}", detail)
            }
            SortError(detail: String) {
                description("sorting intermediate records failed")
                display("sorting intermediate records failed: {}", detail)
            }
            ParseError(line: String) {
                description("malformed intermediate record")
                display("malformed intermediate record: {:?}", line)
            }
            Cancelled {
                description("operation cancelled")
                display("operation cancelled")
            }
            InvalidPartitionCount(count: u64) {
                description("invalid partition count")
                display("invalid partition count {}, must be at least 1", count)
            }
        }
    }
}

pub mod cancel;
pub mod emitter;
pub mod intermediate;
pub mod io;
pub mod mapper;
pub mod partition;
pub mod reducer;
pub mod sort;

pub use cancel::CancellationToken;
pub use emitter::{Emit, PartitionEmitter};
pub use errors::*;
pub use intermediate::{IntermediateRecord, FinalRecord};
pub use mapper::map_document;
pub use partition::{HashPartitioner, Partition};
pub use reducer::{merge_sorted, Accumulation, GroupAccumulator, MergeSummary};
pub use sort::{ExternalSorter, SortOptions, SortSummary};
