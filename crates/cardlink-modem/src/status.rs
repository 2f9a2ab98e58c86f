//! Packet-data session status classification.
//!
//! The modem reports its connection state as free text, typically
//! `STATE: IP INITIAL` or similar. [`ConnectivityStatus::classify`] turns
//! that text into a closed set of states so the connectivity machine never
//! dispatches on raw strings.
//!
//! # States and Recovery Actions
//!
//! | Modem text       | State                   | Action                     |
//! |------------------|-------------------------|----------------------------|
//! | `IP START`       | `SessionStart`          | activate session, fetch IP |
//! | `IP INITIAL`     | `SessionInitial`        | activate session, fetch IP |
//! | `IP CONFIG`      | `SessionConfiguring`    | wait                       |
//! | `IP GPRSACT`     | `SessionActive`         | fetch IP                   |
//! | `IP STATUS`      | `SessionStatus`         | fetch IP                   |
//! | `TCP CONNECTING` | `ConnectionNegotiating` | wait                       |
//! | `CONNECT OK`     | `ConnectionEstablished` | disconnect, fetch IP       |
//! | `TCP CLOSING`    | `ConnectionClosing`     | fetch IP                   |
//! | `TCP CLOSED`     | `ConnectionClosed`      | fetch IP                   |
//! | `PDP DEACT`      | `SessionDeactivated`    | none (unresolved)          |
//! | anything else    | `Unrecognized`          | fetch IP                   |
//!
//! # Examples
//!
//! ```
//! use cardlink_modem::status::{ConnectivityStatus, RecoveryAction};
//!
//! let status = ConnectivityStatus::classify("STATE: IP INITIAL");
//! assert_eq!(status, ConnectivityStatus::SessionInitial);
//! assert_eq!(status.recovery_action(), RecoveryAction::ActivateSession);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified packet-data session state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityStatus {
    /// Session stack started, context not yet activated.
    SessionStart,

    /// Initial state after power-up or shutdown.
    SessionInitial,

    /// Context activation in progress.
    SessionConfiguring,

    /// Context activated.
    SessionActive,

    /// Local IP address obtained.
    SessionStatus,

    /// Transport connection being set up.
    ConnectionNegotiating,

    /// Transport connection open.
    ConnectionEstablished,

    /// Transport connection closing.
    ConnectionClosing,

    /// Transport connection closed, session reusable.
    ConnectionClosed,

    /// Context deactivated by the network.
    SessionDeactivated,

    /// Text that matched none of the known states.
    Unrecognized(String),
}

/// What the connectivity machine does for a classified state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Activate the session, then fetch the IP address on success.
    ActivateSession,

    /// Fetch the IP address.
    FetchIp,

    /// Tear down the connection, then fetch the IP address on success.
    DisconnectThenFetchIp,

    /// Transient state, nothing to do until the next poll.
    Wait,

    /// Recognized state without a defined recovery.
    Unresolved,
}

/// Status tokens in matching priority order.
static STATUS_TOKENS: [(&str, ConnectivityStatus); 10] = [
    ("ip start", ConnectivityStatus::SessionStart),
    ("ip initial", ConnectivityStatus::SessionInitial),
    ("ip config", ConnectivityStatus::SessionConfiguring),
    ("ip gprsact", ConnectivityStatus::SessionActive),
    ("ip status", ConnectivityStatus::SessionStatus),
    ("tcp connecting", ConnectivityStatus::ConnectionNegotiating),
    ("connect ok", ConnectivityStatus::ConnectionEstablished),
    ("tcp closing", ConnectivityStatus::ConnectionClosing),
    ("tcp closed", ConnectivityStatus::ConnectionClosed),
    ("pdp deact", ConnectivityStatus::SessionDeactivated),
];

impl ConnectivityStatus {
    /// Classify a raw status report.
    ///
    /// Matching is case-insensitive. An optional `STATE:` prefix is stripped
    /// and an exact token match is tried first; otherwise the first token
    /// (in table order) contained anywhere in the text wins. Text matching no
    /// token becomes [`Unrecognized`](Self::Unrecognized) carrying the trimmed
    /// report text.
    pub fn classify(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        let body = lowered
            .strip_prefix("state:")
            .map(str::trim)
            .unwrap_or(&lowered);

        if let Some((_, status)) = STATUS_TOKENS.iter().find(|(token, _)| body == *token) {
            return status.clone();
        }

        STATUS_TOKENS
            .iter()
            .find(|(token, _)| lowered.contains(token))
            .map(|(_, status)| status.clone())
            .unwrap_or_else(|| Self::Unrecognized(raw.trim().to_string()))
    }

    /// Recovery action associated with this state.
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::SessionStart | Self::SessionInitial => RecoveryAction::ActivateSession,
            Self::SessionConfiguring | Self::ConnectionNegotiating => RecoveryAction::Wait,
            Self::SessionActive | Self::SessionStatus => RecoveryAction::FetchIp,
            Self::ConnectionEstablished => RecoveryAction::DisconnectThenFetchIp,
            Self::ConnectionClosing | Self::ConnectionClosed => RecoveryAction::FetchIp,
            Self::SessionDeactivated => RecoveryAction::Unresolved,
            Self::Unrecognized(_) => RecoveryAction::FetchIp,
        }
    }

    /// Whether the state is a known one.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionStart => write!(f, "SessionStart"),
            Self::SessionInitial => write!(f, "SessionInitial"),
            Self::SessionConfiguring => write!(f, "SessionConfiguring"),
            Self::SessionActive => write!(f, "SessionActive"),
            Self::SessionStatus => write!(f, "SessionStatus"),
            Self::ConnectionNegotiating => write!(f, "ConnectionNegotiating"),
            Self::ConnectionEstablished => write!(f, "ConnectionEstablished"),
            Self::ConnectionClosing => write!(f, "ConnectionClosing"),
            Self::ConnectionClosed => write!(f, "ConnectionClosed"),
            Self::SessionDeactivated => write!(f, "SessionDeactivated"),
            Self::Unrecognized(text) => write!(f, "Unrecognized({text})"),
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ActivateSession => "activate-session",
            Self::FetchIp => "fetch-ip",
            Self::DisconnectThenFetchIp => "disconnect-then-fetch-ip",
            Self::Wait => "wait",
            Self::Unresolved => "unresolved",
        };
        f.write_str(name)
    }
}
