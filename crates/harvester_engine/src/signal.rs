use tokio_util::sync::CancellationToken;

/// Level-triggered stop request shared between a running session and
/// whoever may want to end it. Once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; safe to call from any thread.
    pub fn signal_stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}
