#[macro_use]
extern crate clap;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate signal_hook;
extern crate tempfile;
extern crate util;
extern crate wordcount;

mod errors {
    error_chain! {
        links {
            WordCount(::wordcount::Error, ::wordcount::ErrorKind);
            Util(::util::errors::Error, ::util::errors::ErrorKind);
        }

        foreign_links {
            Io(::std::io::Error);
            Json(::serde_json::Error);
        }

        errors {
            FetchError(locator: String) {
                description("unable to fetch input document")
                display("unable to fetch input document {}", locator)
            }
            DownloadError(locator: String) {
                description("unable to download intermediate object")
                display("unable to download intermediate object {}", locator)
            }
            UploadError(destination: String) {
                description("unable to upload object")
                display("unable to upload object {}", destination)
            }
            ScratchIOError(detail: String) {
                description("local scratch file failure")
                display("local scratch file failure: {}", detail)
            }
            ConfigError(detail: String) {
                description("invalid configuration")
                display("invalid configuration: {}", detail)
            }
        }
    }
}

mod config;
mod initialization;
mod operations;
mod parser;

use clap::ArgMatches;

use errors::*;
use initialization::WorkerResources;
use operations::{perform_map, perform_reduce};
use util::output_error;

fn main() {
    let matches = parser::parse_command_line();

    if let Err(err) = run(&matches) {
        output_error(&err.chain_err(|| "Worker operation failed."));
        ::std::process::exit(1);
    }
}

// Logs go to stderr, stdout carries only the JSON result of the operation.
fn run(matches: &ArgMatches) -> Result<()> {
    util::init_logger().chain_err(|| "Failed to initialise logging.")?;

    let resources = WorkerResources::new(matches).chain_err(|| "Failed to initialise worker.")?;

    let output = match matches.subcommand() {
        ("map", Some(sub)) => {
            let task_id = sub.value_of("task-id").chain_err(|| "Task id must be specified")?;
            let input = sub.value_of("input").chain_err(|| "Input must be specified")?;

            let result = perform_map(&resources.operation_resources, task_id, input)?;
            serde_json::to_string(&result)?
        }
        ("reduce", Some(sub)) => {
            let partition = value_t!(sub, "partition", u64).chain_err(|| {
                ErrorKind::ConfigError("partition must be a non-negative integer".to_owned())
            })?;
            let inputs: Vec<String> = match sub.values_of("input") {
                Some(values) => values.map(|value| value.to_owned()).collect(),
                None => Vec::new(),
            };

            let result = perform_reduce(&resources.operation_resources, partition, &inputs)?;
            serde_json::to_string(&result)?
        }
        _ => return Err("unknown command".into()),
    };

    println!("{}", output);
    Ok(())
}
