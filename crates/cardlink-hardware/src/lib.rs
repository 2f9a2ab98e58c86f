//! Card reader and display abstractions for the cardlink terminal.
//!
//! This crate provides trait-based abstractions for the two local
//! peripherals: the serial card reader and the two-line display. Mock
//! implementations stand in for the real drivers during development,
//! testing and simulation.
//!
//! # Design
//!
//! - **Async-first**: all I/O uses native `async fn` in traits (Rust 1.90 +
//!   Edition 2024 RPITIT).
//! - **Thread-safe**: all traits require `Send + Sync` for use with Tokio.
//! - **Bounded waits**: reads take an explicit timeout and device locks are
//!   acquired with one.
//!
//! # Reading a Card
//!
//! ```no_run
//! use cardlink_hardware::frame::FrameAccumulator;
//! use cardlink_hardware::traits::CardReaderDevice;
//! use std::time::Duration;
//!
//! async fn read_card<R: CardReaderDevice>(reader: &mut R) -> cardlink_hardware::Result<String> {
//!     let mut acc = FrameAccumulator::new();
//!     let mut buf = [0u8; 12];
//!     loop {
//!         let want = acc.remaining();
//!         let n = reader.read_bytes(&mut buf[..want], Duration::from_millis(500)).await?;
//!         if let Some(id) = acc.push(&buf[..n]) {
//!             return Ok(id?.to_string());
//!         }
//!     }
//! }
//! ```

pub mod devices;
pub mod error;
pub mod frame;
pub mod mock;
pub mod traits;
pub mod types;

pub use devices::{AnyCardReader, AnyDisplay, SharedDevice, SharedDisplay, SharedReader};
pub use error::{HardwareError, Result};
pub use frame::FrameAccumulator;
pub use traits::{CardReaderDevice, DisplayDevice};
pub use types::DeviceInfo;
