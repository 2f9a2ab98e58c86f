//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware.

pub mod display;
pub mod reader;

pub use display::{MockDisplay, MockDisplayHandle, Screen};
pub use reader::{MockCardReader, MockCardReaderHandle, frame_for};
