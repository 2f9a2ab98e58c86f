//! Card validation terminal.
//!
//! Wires the modem layer and the local peripherals into the running
//! terminal: a card-read producer feeding a bounded channel, a single HTTP
//! consumer validating each card with the server, and the connectivity
//! machine keeping the packet-data session usable. [`boot`] starts all of
//! it and returns a [`TerminalHandle`].

pub mod boot;
pub mod consumer;
pub mod error;
pub mod producer;

pub use boot::{BootReport, TerminalDevices, TerminalHandle, boot, probe_modem, read_operator};
pub use consumer::{ConsumerSettings, ExchangeOutcome, HttpConsumer, ValidationResponse};
pub use error::{Result, TerminalError};
pub use producer::{CardEvent, CardProducer};
