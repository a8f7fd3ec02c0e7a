//! Lifecycle states of one request/response exchange.

/// Progress of the single response write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteState {
    /// Nothing committed yet.
    #[default]
    Idle,
    /// A deferred write (file stream) is in flight; plain writes are refused.
    Busy,
    /// The response has been written. Terminal.
    Closed,
}

/// Whether the remaining pipeline steps should run.
///
/// Halting is sticky: once set, every later step is skipped. The route
/// handler still runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineControl {
    #[default]
    Continue,
    Halted,
}
