//! Shared fixtures for the capture integration tests.
//!
//! Every test gets its own temporary directory for the template artifact, a
//! scripted [`MockSensor`] and a [`RecordingSink`]. Session timings are the
//! production defaults; tests run under tokio's paused clock so the delays
//! cost nothing.

#![allow(dead_code)]

use printpi_capture::{CaptureTimings, RecordingSink, SessionContext, TemplateTransport};
use printpi_core::constants::{DEFAULT_CHUNK_SIZE, TRANSFER_COMPLETE_MARKER};
use printpi_hardware::mock::{MockSensor, MockSensorHandle};
use printpi_hardware::ErrorCatalog;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct Harness {
    pub sensor: MockSensor,
    pub script: MockSensorHandle,
    pub sink: RecordingSink,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let (sensor, script) = MockSensor::new();
        Self {
            sensor,
            script,
            sink: RecordingSink::new(),
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn template_path(&self) -> PathBuf {
        self.dir.path().join("tpl.bin")
    }

    pub fn context(&self) -> SessionContext {
        self.context_with_catalog(ErrorCatalog::builtin())
    }

    pub fn context_with_catalog(&self, catalog: ErrorCatalog) -> SessionContext {
        SessionContext::new(
            CaptureTimings::default(),
            catalog,
            TemplateTransport::new(self.template_path(), DEFAULT_CHUNK_SIZE),
        )
    }

    /// Split the harness so the sensor can move into a spawned session task.
    pub fn into_parts(self) -> Parts {
        let context = self.context();
        Parts {
            sensor: self.sensor,
            script: self.script,
            sink: self.sink,
            context,
            dir: self.dir,
        }
    }

    /// Make the mock write `template` when the last step is accepted.
    pub fn produce_template(&self, template: &[u8]) {
        self.script
            .produce_template(self.template_path(), template.to_vec());
    }
}

pub struct Parts {
    pub sensor: MockSensor,
    pub script: MockSensorHandle,
    pub sink: RecordingSink,
    pub context: SessionContext,
    pub dir: TempDir,
}

/// Deterministic template bytes.
pub fn template_fixture(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Payloads decoded as (lossy) UTF-8.
pub fn text_payloads(payloads: &[Vec<u8>]) -> Vec<String> {
    payloads
        .iter()
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .collect()
}

/// Assert that `payloads` ends with `template` split into `chunk_size`
/// chunks followed by the completion marker.
pub fn assert_template_stream(payloads: &[Vec<u8>], template: &[u8], chunk_size: usize) {
    let chunks = template.len().div_ceil(chunk_size);
    assert!(
        payloads.len() > chunks,
        "expected {} chunks plus marker, got {} payloads",
        chunks,
        payloads.len()
    );

    let (_, tail) = payloads.split_at(payloads.len() - chunks - 1);
    let (data, marker) = tail.split_at(chunks);

    for chunk in &data[..chunks - 1] {
        assert_eq!(chunk.len(), chunk_size);
    }
    assert_eq!(data.concat(), template);
    assert_eq!(marker[0], TRANSFER_COMPLETE_MARKER.as_bytes());
}
