use std::process;
use std::thread;
use std::time::Duration;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use errors::*;
use operations::ScratchRegistry;
use wordcount::CancellationToken;

/// Cancels `cancel` on SIGINT or SIGTERM.
///
/// The running operation notices at its next check, removes its scratch files and fails with
/// `Cancelled`. An operation blocked on I/O never reaches a check, so if the worker is still
/// running `grace` after the first signal, or a second signal arrives, the registered scratch
/// directories are removed and the process exits with `128 + signal`.
pub fn register_cancellation_signals(
    cancel: &CancellationToken,
    scratch: &ScratchRegistry,
    grace: Duration,
) -> Result<()> {
    let mut signals =
        Signals::new(&[SIGINT, SIGTERM]).chain_err(|| "Unable to register signal handlers")?;
    let cancel = cancel.clone();
    let scratch = scratch.clone();

    thread::Builder::new()
        .name("signals".to_owned())
        .spawn(move || {
            for signal in signals.forever() {
                if cancel.is_cancelled() {
                    warn!("Received signal {} again, exiting", signal);
                    abort(&scratch, signal);
                }

                warn!("Received signal {}, cancelling operation", signal);
                cancel.cancel();
                start_grace_timer(&scratch, signal, grace);
            }
        })
        .chain_err(|| "Unable to start signal handling thread")?;
    Ok(())
}

fn start_grace_timer(scratch: &ScratchRegistry, signal: i32, grace: Duration) {
    let timer_scratch = scratch.clone();
    let started = thread::Builder::new()
        .name("cancel-grace".to_owned())
        .spawn(move || {
            thread::sleep(grace);
            warn!("Operation still running {:?} after cancellation, exiting", grace);
            abort(&timer_scratch, signal);
        });

    if let Err(err) = started {
        error!("Unable to start cancellation timer: {}", err);
        abort(scratch, signal);
    }
}

fn abort(scratch: &ScratchRegistry, signal: i32) -> ! {
    scratch.remove_all();
    process::exit(128 + signal);
}
