//! Device trait definitions for the card reader and the display.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.
//!
//! **NOTE**: These traits are NOT object-safe because `async fn` methods return
//! `impl Future`. Tasks hold the enum wrappers from [`crate::devices`] instead.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::DeviceInfo;
use std::time::Duration;

/// Byte-stream card reader.
///
/// The reader exposes raw bytes only; framing is done by
/// [`FrameAccumulator`](crate::frame::FrameAccumulator).
///
/// # Examples
///
/// ```no_run
/// use cardlink_hardware::traits::CardReaderDevice;
/// use cardlink_hardware::Result;
/// use std::time::Duration;
///
/// async fn next_bytes<R: CardReaderDevice>(reader: &mut R) -> Result<Vec<u8>> {
///     let mut buf = [0u8; 12];
///     let n = reader.read_bytes(&mut buf, Duration::from_millis(500)).await?;
///     Ok(buf[..n].to_vec())
/// }
/// ```
pub trait CardReaderDevice: Send + Sync {
    /// Wait for input and copy up to `buf.len()` received bytes into `buf`.
    ///
    /// Suspends until at least one byte is available; bytes that do not fit
    /// stay pending for the next read.
    ///
    /// # Errors
    ///
    /// - `HardwareError::Timeout` if nothing arrives within `timeout`
    /// - `HardwareError::Disconnected` if the reader is gone
    async fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Discard every received byte not yet read, including input still
    /// waiting in the receive buffer, returning how many.
    async fn flush_input(&mut self) -> Result<usize>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;
}

/// Two-line character display.
pub trait DisplayDevice: Send + Sync {
    /// Replace the display content with two lines.
    async fn show(&mut self, top: &str, bottom: &str) -> Result<()>;

    /// Blank the display.
    async fn clear(&mut self) -> Result<()>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;
}
