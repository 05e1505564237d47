extern crate env_logger;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
extern crate reqwest;
extern crate uuid;

#[cfg(feature = "s3")]
extern crate bytes;
#[cfg(feature = "s3")]
extern crate futures;
#[cfg(feature = "s3")]
extern crate rusoto_core;
#[cfg(feature = "s3")]
extern crate rusoto_s3;
#[cfg(feature = "s3")]
extern crate tokio;

#[cfg(test)]
extern crate tempfile;

pub mod errors {
    error_chain! {
        foreign_links {
            Io(::std::io::Error);
        }
    }
}

pub mod data_layer;
pub mod fetch;
pub mod logging;

pub use fetch::{DocumentFetcher, LocatorFetcher};
pub use logging::init_logger;
pub use logging::output_error;
