//! Mock device implementations for testing and development.
//!
//! This module provides a simulated sensor that can be scripted
//! programmatically without requiring physical hardware.

pub mod sensor;

// Re-export commonly used types
pub use sensor::{MockSensor, MockSensorHandle, SensorCall, SensorVerb};
