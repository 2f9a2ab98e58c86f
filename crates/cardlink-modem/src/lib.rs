//! Cellular modem layer for the cardlink terminal.
//!
//! This crate owns everything the terminal does through the GPRS modem:
//!
//! - [`ModemClient`]: the AT-operation interface, one method per command
//! - [`ConnectivityStatus`]: closed classification of the modem's status text
//! - [`ModemSession`] and [`SharedSession`]: the single shared session record
//! - [`ApnReconciler`]: operator-to-APN resolution and boot-time reconciliation
//! - [`ConnectivityMachine`]: the periodic poll-classify-act loop
//! - [`MockModem`]: in-memory modem for tests and simulation
//!
//! # Locking
//!
//! Two locks are involved. The modem channel ([`SharedModem`]) is held for
//! one logical operation and serializes AT commands between units. The
//! session record ([`SharedSession`]) is only ever held for short synchronous
//! updates, never across a modem command.
//!
//! [`ModemClient`]: traits::ModemClient
//! [`ConnectivityStatus`]: status::ConnectivityStatus
//! [`ModemSession`]: session::ModemSession
//! [`SharedSession`]: session::SharedSession
//! [`ApnReconciler`]: apn::ApnReconciler
//! [`ConnectivityMachine`]: connectivity::ConnectivityMachine
//! [`MockModem`]: mock::MockModem
//! [`SharedModem`]: devices::SharedModem

pub mod apn;
pub mod connectivity;
pub mod devices;
pub mod error;
pub mod mock;
pub mod session;
pub mod status;
pub mod traits;

pub use apn::{ApnReconciler, ApnReconciliation, ApnResolution, OperatorApnTable};
pub use connectivity::{ConnectivityMachine, CycleReport, StepOutcome};
pub use devices::{AnyModem, SharedModem, acquire_modem, lock_wait};
pub use error::{ModemError, Result};
pub use session::{ModemSession, SharedSession};
pub use status::{ConnectivityStatus, RecoveryAction};
pub use traits::{ModemClient, ModemOp, with_timeout};
