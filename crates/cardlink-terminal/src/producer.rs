//! Card-read producer.
//!
//! Reads raw bytes from the card reader until a 12-byte frame is complete,
//! extracts the card identifier, drops residual input and publishes a
//! [`CardEvent`] to the bounded channel feeding the HTTP consumer.
//!
//! The card-scan lock is held for one frame at a time. Waiting for the first
//! byte is a real suspension on the reader with a bounded timeout, so the
//! lock is released between read windows.
//!
//! # Backpressure
//!
//! When the channel is full the producer logs a warning and waits for space.
//! Events are never dropped. This wait has no time bound: it is the only
//! unbounded suspension in the pipeline, and it ends as soon as the consumer
//! takes an event or goes away.

use crate::error::{Result, TerminalError};
use cardlink_core::CardId;
use cardlink_core::constants::CARD_FRAME_LEN;
use cardlink_hardware::{
    AnyCardReader, CardReaderDevice, FrameAccumulator, HardwareError, SharedReader,
};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, trace, warn};

/// One card scan, passed by value to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardEvent {
    pub card: CardId,
    pub read_at: DateTime<Utc>,
}

impl CardEvent {
    pub fn new(card: CardId) -> Self {
        Self {
            card,
            read_at: Utc::now(),
        }
    }
}

/// Turns reader bytes into card events.
pub struct CardProducer<R = AnyCardReader> {
    reader: SharedReader<R>,
    events: mpsc::Sender<CardEvent>,
    read_timeout: Duration,
}

impl<R: CardReaderDevice> CardProducer<R> {
    pub fn new(
        reader: SharedReader<R>,
        events: mpsc::Sender<CardEvent>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            reader,
            events,
            read_timeout,
        }
    }

    /// Read one frame under the card-scan lock.
    ///
    /// Returns `Ok(None)` if no byte arrived within the read timeout, or if a
    /// partial frame stalled and was discarded.
    ///
    /// # Errors
    ///
    /// - `TerminalError::Core` if the frame carried an invalid identifier
    /// - `TerminalError::Hardware` if the reader failed or its lock was busy
    pub async fn read_frame(&self) -> Result<Option<CardId>> {
        let mut reader = self.reader.acquire(self.read_timeout).await?;
        let mut frame = FrameAccumulator::new();
        let mut buf = [0u8; CARD_FRAME_LEN];

        loop {
            let want = frame.remaining();
            match reader.read_bytes(&mut buf[..want], self.read_timeout).await {
                Ok(n) => {
                    if let Some(result) = frame.push(&buf[..n]) {
                        let flushed = reader.flush_input().await?;
                        if flushed > 0 {
                            trace!(flushed, "Dropped residual reader input");
                        }
                        return Ok(Some(result?));
                    }
                }
                Err(e) if e.is_timeout() => {
                    if !frame.is_empty() {
                        warn!(received = frame.len(), "Incomplete card frame discarded");
                    }
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Publish an event, waiting for space if the channel is full.
    ///
    /// # Errors
    ///
    /// Returns `TerminalError::ChannelClosed` if the consumer is gone.
    pub async fn publish(&self, event: CardEvent) -> Result<()> {
        match self.events.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                warn!(card = %event.card, "Card event channel full, waiting for consumer");
                self.events
                    .send(event)
                    .await
                    .map_err(|_| TerminalError::ChannelClosed)
            }
            Err(TrySendError::Closed(_)) => Err(TerminalError::ChannelClosed),
        }
    }

    /// Read and publish cards until the reader disconnects or the consumer
    /// goes away.
    pub async fn run(self) -> Result<()> {
        info!("Card producer started");

        loop {
            match self.read_frame().await {
                Ok(Some(card)) => {
                    info!(card = %card, "Card read");
                    match self.publish(CardEvent::new(card)).await {
                        Ok(()) => {}
                        Err(TerminalError::ChannelClosed) => {
                            info!("Card event channel closed, producer stopping");
                            return Ok(());
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(None) => {}
                Err(TerminalError::Core(e)) => warn!(error = %e, "Invalid card frame discarded"),
                Err(TerminalError::Hardware(e @ HardwareError::Busy { .. })) => {
                    debug!(error = %e, "Card reader busy");
                }
                Err(e) => {
                    error!(error = %e, "Card reader failed, producer stopping");
                    return Err(e);
                }
            }
        }
    }
}
