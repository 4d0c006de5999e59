//! The error kinds the core can raise.
//!
//! The teacher runtime reports failure as plain `std::io::Error` since its
//! errors are all OS-facing. A tick-driven game core has no OS calls of its
//! own; its failures are domain-shaped (a bad tick rate, a switch nobody
//! registered, a callback that blew up), so this crate gives them names
//! instead of forcing everything through `io::Error`.

use thiserror::Error;

/// Errors raised by the timing service, switch controller, accelerometer
/// processor, or configuration loader.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A component was configured with an invalid or contradictory value
    /// (bad tick rate, a handler registered for a switch that was never
    /// declared, a negative dwell).
    #[error("misconfigured: {0}")]
    Misconfigured(String),

    /// `process_switch` was called for a switch name with no entry in the
    /// switch table. Callers that want this to be fatal instead of logged
    /// and dropped (the default policy, see `SwitchController`) should
    /// check `SwitchController::is_registered` before calling.
    #[error("unknown switch: {0}")]
    UnknownSwitch(String),

    /// A registered callback panicked or returned an error. Carries the
    /// panic payload's message when one could be extracted.
    #[error("callback failed: {0}")]
    CallbackFailure(String),

    /// The serial transport failed to read, write, or identify.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The YAML configuration document failed to parse or deserialize.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}

/// A `Result` alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
