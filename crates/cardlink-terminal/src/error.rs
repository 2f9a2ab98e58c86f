//! Error types for the terminal pipeline.

use cardlink_hardware::HardwareError;
use cardlink_modem::ModemError;

/// Result type alias for terminal operations.
pub type Result<T> = std::result::Result<T, TerminalError>;

/// Errors raised by the boot sequence and the long-running units.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("Modem error: {0}")]
    Modem(#[from] ModemError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// Invalid card data, path or configuration.
    #[error(transparent)]
    Core(#[from] cardlink_core::Error),

    /// The response payload was not the expected JSON document.
    #[error("Invalid response payload: {0}")]
    Response(#[from] serde_json::Error),

    /// The card event channel has no receiver (or no sender) left.
    #[error("Card event channel closed")]
    ChannelClosed,
}
