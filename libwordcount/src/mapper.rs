use std::io::BufRead;

use cancel::CancellationToken;
use emitter::Emit;
use errors::*;
use io::Tokens;

const MAP_VALUE: i64 = 1;
const CANCELLATION_CHECK_INTERVAL: u64 = 4096;

/// `map_document` performs the word count map over a document stream.
///
/// Every whitespace-separated token is emitted with the value `1`. No deduplication or
/// pre-aggregation happens here, repeated tokens produce repeated records.
///
/// # Arguments
///
/// * `source` - The input document. It is read incrementally and never buffered in full.
/// * `emitter` - A struct implementing the `Emit` trait which receives every `(token, 1)` pair.
/// * `cancel` - Checked periodically, the map stops with `ErrorKind::Cancelled` once it is set.
///
/// # Outputs
///
/// The number of tokens emitted. A failure to read `source` is reported as
/// `ErrorKind::InputError`.
pub fn map_document<R, E>(source: R, emitter: &mut E, cancel: &CancellationToken) -> Result<u64>
where
    R: BufRead,
    E: Emit,
{
    let mut emitted: u64 = 0;

    for token in Tokens::new(source) {
        let token = token.chain_err(|| {
            ErrorKind::InputError("error reading input document".to_owned())
        })?;
        emitter.emit(&token, MAP_VALUE)?;

        emitted += 1;
        if emitted % CANCELLATION_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }
    }
    cancel.check()?;

    debug!("Emitted {} tokens", emitted);
    Ok(emitted)
}
