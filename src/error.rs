use thiserror::Error;

/// Error hierarchy for the monitor runtime (§7 of the design).
///
/// Every variant maps to exactly one propagation rule in the tick loop:
/// `Config`/`Network`/`ProbePredicate`/cancellation become a PENDING or DOWN
/// beat; `TransientSupervisor` is logged and the runtime reschedules itself;
/// `Notifier` is logged and never aborts; `Repository` aborts the tick.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    ProbePredicate(String),

    #[error("timeout by AbortSignal ({0}s)")]
    Cancelled(f64),

    #[error("transient supervisor error: {0}")]
    TransientSupervisor(String),

    #[error("notifier error: {0}")]
    Notifier(String),

    #[error("repository error: {0}")]
    Repository(String),
}

impl CoreError {
    /// The message to carry into a beat's `msg` field (step 5 of §4.2).
    pub fn beat_message(&self) -> String {
        self.to_string()
    }

    pub fn is_repository(&self) -> bool {
        matches!(self, CoreError::Repository(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
