use std::sync::Arc;

use clap::ArgMatches;

use config::WordCountConfig;
use errors::*;
use initialization::{get_data_abstraction_layer, register_cancellation_signals};
use operations::{OperationResources, ScratchRegistry};
use util::LocatorFetcher;
use wordcount::CancellationToken;

pub struct WorkerResources {
    pub operation_resources: OperationResources,
}

impl WorkerResources {
    pub fn new(matches: &ArgMatches) -> Result<Self> {
        let config = WordCountConfig::from_matches(matches).chain_err(
            || "Error loading configuration.",
        )?;
        debug!("Configuration: {:?}", config);

        let data_abstraction_layer = get_data_abstraction_layer(matches).chain_err(
            || "Error creating data abstraction layer.",
        )?;

        let document_fetcher =
            LocatorFetcher::new(Arc::clone(&data_abstraction_layer), config.fetch_timeout())
                .chain_err(|| "Error creating document fetcher.")?;

        let cancel = CancellationToken::new();
        let scratch = ScratchRegistry::new();
        register_cancellation_signals(&cancel, &scratch, config.cancel_grace()).chain_err(
            || "Error registering signal handlers.",
        )?;

        Ok(WorkerResources {
            operation_resources: OperationResources {
                data_abstraction_layer,
                document_fetcher: Arc::new(document_fetcher),
                config,
                cancel,
                scratch,
            },
        })
    }
}
