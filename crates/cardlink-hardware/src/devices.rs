//! Enum wrappers for device dispatch and shared device locks.
//!
//! Native `async fn` in traits (RPITIT) is not object-safe, so tasks cannot
//! hold `Box<dyn CardReaderDevice>`. The enums here give concrete type
//! dispatch instead.
//!
//! Each device is also guarded by its own lock ([`SharedDevice`]) acquired for
//! one logical operation at a time, with a bounded wait.
//!
//! # Examples
//!
//! ```
//! use cardlink_hardware::devices::{AnyCardReader, SharedDevice};
//! use cardlink_hardware::mock::MockCardReader;
//! use cardlink_hardware::traits::CardReaderDevice;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> cardlink_hardware::Result<()> {
//!     let (reader, _handle) = MockCardReader::new();
//!     let shared = SharedDevice::new("card reader", AnyCardReader::Mock(reader));
//!
//!     let mut guard = shared.acquire(Duration::from_millis(100)).await?;
//!     guard.flush_input().await?;
//!     Ok(())
//! }
//! ```

use crate::error::{HardwareError, Result};
use crate::mock::{MockCardReader, MockDisplay};
use crate::traits::{CardReaderDevice, DisplayDevice};
use crate::types::DeviceInfo;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Enum wrapper for card reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCardReader {
    /// Mock reader for development and testing.
    Mock(MockCardReader),
}

impl CardReaderDevice for AnyCardReader {
    async fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        match self {
            Self::Mock(device) => device.read_bytes(buf, timeout).await,
        }
    }

    async fn flush_input(&mut self) -> Result<usize> {
        match self {
            Self::Mock(device) => device.flush_input().await,
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.get_info().await,
        }
    }
}

/// Enum wrapper for display dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDisplay {
    /// Mock display for development and testing.
    Mock(MockDisplay),
}

impl DisplayDevice for AnyDisplay {
    async fn show(&mut self, top: &str, bottom: &str) -> Result<()> {
        match self {
            Self::Mock(device) => device.show(top, bottom).await,
        }
    }

    async fn clear(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.clear().await,
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.get_info().await,
        }
    }
}

/// A device behind its own lock, cheap to clone.
#[derive(Debug)]
pub struct SharedDevice<D> {
    name: &'static str,
    inner: Arc<Mutex<D>>,
}

impl<D> SharedDevice<D> {
    pub fn new(name: &'static str, device: D) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(device)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Lock the device, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Busy` if the lock is not released in time.
    pub async fn acquire(&self, timeout: Duration) -> Result<MutexGuard<'_, D>> {
        tokio::time::timeout(timeout, self.inner.lock())
            .await
            .map_err(|_| HardwareError::busy(self.name, timeout.as_millis() as u64))
    }
}

impl<D> Clone for SharedDevice<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Shared card-scan hardware.
pub type SharedReader<R = AnyCardReader> = SharedDevice<R>;

/// Shared display.
pub type SharedDisplay<D = AnyDisplay> = SharedDevice<D>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_any_card_reader_forwards() {
        let (reader, handle) = MockCardReader::new();
        let mut any = AnyCardReader::Mock(reader);
        handle.feed(b"abc".to_vec()).await.unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(any.read_bytes(&mut buf, Duration::from_millis(50)).await.unwrap(), 2);
        assert_eq!(any.flush_input().await.unwrap(), 1);
        assert_eq!(any.get_info().await.unwrap().model, "MockCardReader");
    }

    #[tokio::test]
    async fn test_any_display_forwards() {
        let (display, handle) = MockDisplay::new();
        let mut any = AnyDisplay::Mock(display);

        any.show("CARD 1A2643", "OK").await.unwrap();
        assert_eq!(handle.current().unwrap().top, "CARD 1A2643");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_device_busy() {
        let (display, _handle) = MockDisplay::new();
        let shared = SharedDevice::new("display", AnyDisplay::Mock(display));
        let other = shared.clone();

        let _held = shared.acquire(Duration::from_millis(10)).await.unwrap();
        let result = other.acquire(Duration::from_millis(20)).await;
        assert!(matches!(
            result,
            Err(HardwareError::Busy {
                duration_ms: 20,
                ..
            })
        ));
    }
}
