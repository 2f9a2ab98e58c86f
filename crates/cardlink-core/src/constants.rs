//! Core constants for the card terminal.
//!
//! This module centralizes the fixed geometry of the card-reader frame, the
//! sizing of the card-event channel, the modem probing policy and the default
//! operator to access point table used when no configuration overrides it.
//!
//! # Card Frame Layout
//!
//! The proximity reader emits fixed 12-character frames:
//!
//! ```text
//! offset: 0 1 2 3 4 5 6 7 8 9 10 11
//!         X X X X A B C D E F 1  2
//!                 └────┬────┘
//!               card identifier (6 chars)
//! ```
//!
//! Bytes outside the identifier belong to the reader protocol and are ignored.
//!
//! # Usage
//!
//! ```
//! use cardlink_core::constants::*;
//!
//! assert_eq!(CARD_FRAME_LEN, 12);
//! assert_eq!(CARD_ID_OFFSET + CARD_ID_LEN, 10);
//! assert_eq!(DEFAULT_APN_TABLE.len(), 8);
//! ```

// ============================================================================
// Card Reader Frame
// ============================================================================

/// Number of characters in one card-reader frame.
pub const CARD_FRAME_LEN: usize = 12;

/// Offset of the card identifier inside a frame.
pub const CARD_ID_OFFSET: usize = 4;

/// Length of the card identifier in bytes (ASCII).
pub const CARD_ID_LEN: usize = 6;

// ============================================================================
// Card Event Channel
// ============================================================================

/// Maximum number of pending card events between producer and consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10;

/// How long the consumer waits for a card event before draining stray reader
/// input (milliseconds).
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 100;

/// Bounded wait for one reader read call (milliseconds).
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 500;

// ============================================================================
// Modem
// ============================================================================

/// Number of independent liveness probes issued at boot.
pub const DEFAULT_PROBE_ATTEMPTS: u8 = 8;

/// Upper bound for a single AT operation (milliseconds).
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;

/// Period of the connectivity poll timer (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Number of connectivity cycle reports kept for inspection.
pub const MAX_CYCLE_HISTORY: usize = 32;

// ============================================================================
// HTTP
// ============================================================================

/// Maximum wire length of a request path, terminator included.
pub const MAX_PATH_LEN: usize = 64;

/// Default validation server host.
pub const DEFAULT_HTTP_URL: &str = "cardlink.example.com";

/// Default request path prefix; the card identifier is appended to it.
pub const DEFAULT_BASE_PATH: &str = "/cards/";

// ============================================================================
// Operator / APN
// ============================================================================

/// Default ordered operator-substring to APN table.
///
/// Order matters: the first entry whose operator substring occurs in the
/// lowercased operator name wins.
pub const DEFAULT_APN_TABLE: [(&str, &str); 8] = [
    ("airtel", "airtelgprs.com"),
    ("cellone", "bsnlnet"),
    ("idea", "internet"),
    ("aircel", "aircelgprs.pr"),
    ("tata docomo", "TATA.DOCOMO.INTERNET"),
    ("t24", "TATA.DOCOMO.INTERNET"),
    ("reliance", "rcomnet"),
    ("vodafone", "www"),
];

// ============================================================================
// Logging
// ============================================================================

/// Log level used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";
