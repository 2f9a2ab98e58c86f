//! Mock card reader implementation for testing and development.
//!
//! The reader is fed raw byte chunks through a [`MockCardReaderHandle`], the
//! way a UART would deliver them. Chunks queue in order, like bytes waiting in
//! a receive FIFO. A flush discards the whole FIFO: bytes already picked up
//! by a read and every chunk still queued.

use crate::error::{HardwareError, Result};
use crate::traits::CardReaderDevice;
use crate::types::DeviceInfo;
use cardlink_core::CardId;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;

/// Protocol prefix bytes placed before the identifier by [`frame_for`].
pub const FRAME_PREFIX: &str = "0F00";

/// Protocol suffix bytes placed after the identifier by [`frame_for`].
pub const FRAME_SUFFIX: &str = "\r\n";

/// Build the 12-byte reader frame carrying `card`.
pub fn frame_for(card: &CardId) -> Vec<u8> {
    format!("{FRAME_PREFIX}{card}{FRAME_SUFFIX}").into_bytes()
}

/// Mock card reader for testing and development.
///
/// # Examples
///
/// ```
/// use cardlink_hardware::mock::MockCardReader;
/// use cardlink_hardware::traits::CardReaderDevice;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> cardlink_hardware::Result<()> {
///     let (mut reader, handle) = MockCardReader::new();
///     handle.feed(b"XXXXABCDEF12".to_vec()).await?;
///
///     let mut buf = [0u8; 12];
///     let n = reader.read_bytes(&mut buf, Duration::from_millis(100)).await?;
///     assert_eq!(&buf[..n], b"XXXXABCDEF12");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockCardReader {
    /// Channel receiver for incoming chunks
    chunk_rx: mpsc::Receiver<Vec<u8>>,

    /// Received bytes not yet read
    pending: VecDeque<u8>,

    name: String,
}

impl MockCardReader {
    /// Create a new mock reader with the default name.
    pub fn new() -> (Self, MockCardReaderHandle) {
        Self::with_name("Mock Card Reader".to_string())
    }

    pub fn with_name(name: String) -> (Self, MockCardReaderHandle) {
        let (chunk_tx, chunk_rx) = mpsc::channel(64);

        let reader = Self {
            chunk_rx,
            pending: VecDeque::new(),
            name,
        };

        (reader, MockCardReaderHandle { chunk_tx })
    }

    /// Number of received bytes not yet read.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Default for MockCardReader {
    fn default() -> Self {
        Self::new().0
    }
}

impl CardReaderDevice for MockCardReader {
    async fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.pending.is_empty() {
            match tokio::time::timeout(timeout, self.chunk_rx.recv()).await {
                Ok(Some(chunk)) => self.pending.extend(chunk),
                Ok(None) => return Err(HardwareError::disconnected(self.name.clone())),
                Err(_) => return Err(HardwareError::timeout(timeout.as_millis() as u64)),
            }
        }

        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn flush_input(&mut self) -> Result<usize> {
        let mut flushed = self.pending.len();
        self.pending.clear();
        while let Ok(chunk) = self.chunk_rx.try_recv() {
            flushed += chunk.len();
        }
        Ok(flushed)
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "MockCardReader").with_firmware_version("1.0.0"))
    }
}

/// Handle for feeding bytes into a mock card reader.
#[derive(Debug, Clone)]
pub struct MockCardReaderHandle {
    chunk_tx: mpsc::Sender<Vec<u8>>,
}

impl MockCardReaderHandle {
    /// Chunks fed but not yet picked up by a read or a flush.
    pub fn queued(&self) -> usize {
        self.chunk_tx.max_capacity() - self.chunk_tx.capacity()
    }

    /// Deliver a chunk of raw bytes to the reader.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Disconnected` if the reader was dropped.
    pub async fn feed(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
        self.chunk_tx
            .send(bytes.into())
            .await
            .map_err(|_| HardwareError::disconnected("mock card reader dropped"))
    }

    /// Deliver a complete frame carrying `card`.
    pub async fn present_card(&self, card: &CardId) -> Result<()> {
        self.feed(frame_for(card)).await
    }
}
