//! Mock two-line display that records what it was asked to show.

use crate::error::{HardwareError, Result};
use crate::traits::DisplayDevice;
use crate::types::DeviceInfo;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One screenful of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub top: String,
    pub bottom: String,
}

#[derive(Debug, Default)]
struct DisplayState {
    current: Option<Screen>,
    shown: Vec<Screen>,
    clears: usize,
    fail_writes: bool,
}

fn lock(state: &Mutex<DisplayState>) -> MutexGuard<'_, DisplayState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock display for testing and development.
#[derive(Debug)]
pub struct MockDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl MockDisplay {
    pub fn new() -> (Self, MockDisplayHandle) {
        let state = Arc::new(Mutex::new(DisplayState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockDisplayHandle { state },
        )
    }
}

impl Default for MockDisplay {
    fn default() -> Self {
        Self::new().0
    }
}

impl DisplayDevice for MockDisplay {
    async fn show(&mut self, top: &str, bottom: &str) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(HardwareError::communication("display write failed"));
        }

        let screen = Screen {
            top: top.to_string(),
            bottom: bottom.to_string(),
        };
        state.shown.push(screen.clone());
        state.current = Some(screen);
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(HardwareError::communication("display clear failed"));
        }
        state.current = None;
        state.clears += 1;
        Ok(())
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new("Mock Display", "MockDisplay"))
    }
}

/// Handle for inspecting a mock display.
#[derive(Debug, Clone)]
pub struct MockDisplayHandle {
    state: Arc<Mutex<DisplayState>>,
}

impl MockDisplayHandle {
    /// What the display currently shows, `None` when blank.
    pub fn current(&self) -> Option<Screen> {
        lock(&self.state).current.clone()
    }

    /// Every screen shown so far, oldest first.
    pub fn shown(&self) -> Vec<Screen> {
        lock(&self.state).shown.clone()
    }

    /// How many times the display was blanked.
    pub fn clear_count(&self) -> usize {
        lock(&self.state).clears
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }
}
