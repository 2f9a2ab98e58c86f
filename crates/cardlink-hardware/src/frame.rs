//! Card frame accumulation.
//!
//! The reader emits fixed 12-byte frames. The card identifier is the 6 bytes
//! at offset 4; the remaining bytes belong to the reader protocol and are
//! ignored here.

use cardlink_core::constants::CARD_FRAME_LEN;
use cardlink_core::{CardId, Result};

/// Collects reader bytes until a complete frame is available.
#[derive(Debug, Clone, Default)]
pub struct FrameAccumulator {
    buf: [u8; CARD_FRAME_LEN],
    len: usize,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes collected towards the current frame.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes still missing from the current frame.
    pub fn remaining(&self) -> usize {
        CARD_FRAME_LEN - self.len
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Append bytes, returning the card identifier once the frame is full.
    ///
    /// Bytes beyond the end of the frame are residual input and are dropped.
    /// The accumulator is empty again after a frame completes, whether or not
    /// the identifier was valid.
    pub fn push(&mut self, bytes: &[u8]) -> Option<Result<CardId>> {
        let take = self.remaining().min(bytes.len());
        self.buf[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;

        if self.len < CARD_FRAME_LEN {
            return None;
        }

        self.reset();
        Some(CardId::from_frame(&self.buf))
    }
}
