use env_logger::Builder;
use error_chain::ChainedError;
use errors::*;
use std::env;

// Default logging level is info, except for the HTTP and AWS client stacks which log every
// connection at that level.
const DEFAULT_LOG_CONFIG: &str = "info,hyper=warn,reqwest=warn,rusoto_core=warn";

/// Installs the global logger. Log lines go to stderr so stdout only carries command output.
pub fn init_logger() -> Result<()> {
    let mut builder = Builder::new();
    match env::var("RUST_LOG") {
        Ok(log_config) => builder.parse_filters(&log_config),
        Err(_) => builder.parse_filters(DEFAULT_LOG_CONFIG),
    };

    builder.try_init().chain_err(|| "Failed to build env_logger")?;
    Ok(())
}

pub fn output_error<E: ChainedError>(err: &E) {
    error!("{}", err);

    for e in err.iter().skip(1) {
        error!("caused by: {}", e);
    }

    if let Some(backtrace) = err.backtrace() {
        error!("backtrace: {:?}", backtrace);
    }
}
