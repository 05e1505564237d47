use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use errors::*;

/// `CancellationToken` is shared between an operation and whoever may want to abort it.
///
/// Cloning the token shares the underlying flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `ErrorKind::Cancelled` once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ErrorKind::Cancelled.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());

        clone.cancel();

        assert!(token.is_cancelled());
        match *token.check().unwrap_err().kind() {
            ErrorKind::Cancelled => {}
            ref kind => panic!("unexpected error kind {:?}", kind),
        }
    }
}
