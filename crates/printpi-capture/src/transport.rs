//! Template artifact transfer.
//!
//! After a successful enrollment the driver leaves the template at a fixed
//! path. [`TemplateTransport`] reads it, pushes it through the sink in chunks
//! that fit the notification payload, sends [`TRANSFER_COMPLETE_MARKER`] and
//! removes the file.

use crate::error::TransportError;
use crate::sink::ResultSink;
use printpi_core::config::TransportConfig;
use printpi_core::constants::{MAX_CHUNK_SIZE, TRANSFER_COMPLETE_MARKER};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One slice of the template, numbered from zero in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateChunk {
    pub sequence: usize,
    pub bytes: Vec<u8>,
}

/// What a completed transfer sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSummary {
    pub bytes: usize,
    pub chunks: usize,
}

/// Split `data` into chunks of at most `chunk_size` bytes.
///
/// Only the last chunk may be shorter. Empty input yields no chunks.
///
/// # Examples
///
/// ```
/// use printpi_capture::transport::chunk_template;
///
/// let chunks = chunk_template(&[0u8; 40], 15).unwrap();
/// let sizes: Vec<usize> = chunks.iter().map(|c| c.bytes.len()).collect();
/// assert_eq!(sizes, vec![15, 15, 10]);
/// ```
pub fn chunk_template(data: &[u8], chunk_size: usize) -> Result<Vec<TemplateChunk>, TransportError> {
    if chunk_size == 0 {
        return Err(TransportError::InvalidChunkSize);
    }

    Ok(data
        .chunks(chunk_size)
        .enumerate()
        .map(|(sequence, bytes)| TemplateChunk {
            sequence,
            bytes: bytes.to_vec(),
        })
        .collect())
}

/// Reads, streams and cleans up the template artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTransport {
    path: PathBuf,
    chunk_size: usize,
    delete_after_transfer: bool,
}

impl TemplateTransport {
    /// Chunk sizes are clamped to `1..=MAX_CHUNK_SIZE`, so no chunk is ever
    /// as long as the completion marker.
    pub fn new(path: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            path: path.into(),
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
            delete_after_transfer: true,
        }
    }

    pub fn with_delete_after_transfer(mut self, delete: bool) -> Self {
        self.delete_after_transfer = delete;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Configured chunk size, lowered to the sink's payload limit if it has one.
    pub fn effective_chunk_size<S: ResultSink + ?Sized>(&self, sink: &S) -> usize {
        match sink.max_payload() {
            Some(limit) => self.chunk_size.min(limit).max(1),
            None => self.chunk_size,
        }
    }

    /// Remove an artifact left behind by an earlier enrollment.
    ///
    /// Returns whether a file was removed.
    pub async fn discard_stale(&self) -> Result<bool, TransportError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Removed stale template");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TransportError::io(&self.path, e)),
        }
    }

    /// Read the artifact.
    ///
    /// # Errors
    /// `Missing` if there is no file, `Empty` if it has no content.
    pub async fn load(&self) -> Result<Vec<u8>, TransportError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TransportError::Missing {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(TransportError::io(&self.path, e)),
        };

        if data.is_empty() {
            return Err(TransportError::Empty {
                path: self.path.clone(),
            });
        }

        Ok(data)
    }

    /// Push every chunk and then the completion marker to `sink`.
    ///
    /// Nothing is pushed if the artifact cannot be loaded. A failed deletion
    /// after the transfer is logged and does not fail the transfer.
    pub async fn stream<S: ResultSink + ?Sized>(
        &self,
        sink: &S,
    ) -> Result<TransferSummary, TransportError> {
        let data = self.load().await?;
        let chunk_size = self.effective_chunk_size(sink);
        let chunks = chunk_template(&data, chunk_size)?;

        let summary = TransferSummary {
            bytes: data.len(),
            chunks: chunks.len(),
        };

        for chunk in chunks {
            sink.push(chunk.bytes);
        }
        sink.push_text(TRANSFER_COMPLETE_MARKER);

        tracing::info!(
            bytes = summary.bytes,
            chunks = summary.chunks,
            chunk_size,
            "Template transferred"
        );

        if self.delete_after_transfer {
            if let Err(e) = tokio::fs::remove_file(&self.path).await {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to delete template after transfer"
                );
            }
        }

        Ok(summary)
    }
}

impl From<&TransportConfig> for TemplateTransport {
    fn from(config: &TransportConfig) -> Self {
        Self::new(config.template_path.clone(), config.chunk_size)
            .with_delete_after_transfer(config.delete_after_transfer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use proptest::prelude::*;

    fn fixture(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    #[test]
    fn test_chunk_sizes() {
        let chunks = chunk_template(&fixture(45), 15).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.bytes.len() == 15));
        assert_eq!(chunks[2].sequence, 2);
    }

    #[test]
    fn test_chunk_empty_input() {
        assert!(chunk_template(&[], 15).unwrap().is_empty());
    }

    #[test]
    fn test_chunk_size_zero_rejected() {
        assert!(matches!(
            chunk_template(&[1, 2, 3], 0),
            Err(TransportError::InvalidChunkSize)
        ));
    }

    #[test]
    fn test_new_clamps_chunk_size() {
        assert_eq!(TemplateTransport::new("t", 0).chunk_size(), 1);
        assert_eq!(TemplateTransport::new("t", 64).chunk_size(), MAX_CHUNK_SIZE);
        assert_eq!(TemplateTransport::new("t", 16).chunk_size(), MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_effective_chunk_size_respects_sink_limit() {
        let transport = TemplateTransport::new("t", 15);
        assert_eq!(transport.effective_chunk_size(&RecordingSink::new()), 15);
        assert_eq!(
            transport.effective_chunk_size(&RecordingSink::new().with_max_payload(20)),
            15
        );
        assert_eq!(
            transport.effective_chunk_size(&RecordingSink::new().with_max_payload(12)),
            12
        );
        assert_eq!(
            transport.effective_chunk_size(&RecordingSink::new().with_max_payload(0)),
            1
        );
    }

    #[tokio::test]
    async fn test_stream_chunks_then_marker_then_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tpl.bin");
        let data = fixture(498);
        std::fs::write(&path, &data).unwrap();

        let sink = RecordingSink::new();
        let summary = TemplateTransport::new(&path, 15).stream(&sink).await.unwrap();

        assert_eq!(summary, TransferSummary { bytes: 498, chunks: 34 });
        let payloads = sink.payloads();
        assert_eq!(payloads.len(), 35);
        assert_eq!(payloads.last().unwrap(), TRANSFER_COMPLETE_MARKER.as_bytes());
        assert_eq!(payloads[..34].concat(), data);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_template_ending_in_marker_text_sends_one_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tpl.bin");
        let mut data = fixture(16);
        data.extend_from_slice(TRANSFER_COMPLETE_MARKER.as_bytes());
        std::fs::write(&path, &data).unwrap();

        let sink = RecordingSink::new();
        TemplateTransport::new(&path, 16).stream(&sink).await.unwrap();

        let payloads = sink.payloads();
        let markers = payloads
            .iter()
            .filter(|p| p.as_slice() == TRANSFER_COMPLETE_MARKER.as_bytes())
            .count();
        assert_eq!(markers, 1);
        assert_eq!(payloads.last().unwrap(), TRANSFER_COMPLETE_MARKER.as_bytes());
        assert!(
            payloads[..payloads.len() - 1]
                .iter()
                .all(|p| p.len() < TRANSFER_COMPLETE_MARKER.len())
        );
        assert_eq!(payloads[..payloads.len() - 1].concat(), data);
    }

    #[tokio::test]
    async fn test_stream_keeps_file_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tpl.bin");
        std::fs::write(&path, fixture(20)).unwrap();

        let transport = TemplateTransport::new(&path, 15).with_delete_after_transfer(false);
        transport.stream(&RecordingSink::new()).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_missing_template_pushes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::new();
        let transport = TemplateTransport::new(dir.path().join("absent.bin"), 15);

        let err = transport.stream(&sink).await.unwrap_err();

        assert!(matches!(err, TransportError::Missing { .. }));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_empty_template_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tpl.bin");
        std::fs::write(&path, b"").unwrap();

        let err = TemplateTransport::new(&path, 15).load().await.unwrap_err();
        assert!(matches!(err, TransportError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_discard_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tpl.bin");
        let transport = TemplateTransport::new(&path, 15);

        assert!(!transport.discard_stale().await.unwrap());

        std::fs::write(&path, b"old user").unwrap();
        assert!(transport.discard_stale().await.unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_from_config() {
        let config = TransportConfig {
            template_path: PathBuf::from("/var/lib/printpi/tpl.bin"),
            chunk_size: 12,
            delete_after_transfer: false,
        };
        let transport = TemplateTransport::from(&config);
        assert_eq!(transport.path(), Path::new("/var/lib/printpi/tpl.bin"));
        assert_eq!(transport.chunk_size(), 12);
        assert!(!transport.delete_after_transfer);
    }

    proptest! {
        #[test]
        fn prop_chunks_reconstruct_template(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            chunk_size in 1usize..=MAX_CHUNK_SIZE,
        ) {
            let chunks = chunk_template(&data, chunk_size).unwrap();

            let rebuilt: Vec<u8> = chunks.iter().flat_map(|c| c.bytes.iter().copied()).collect();
            prop_assert_eq!(rebuilt, data.clone());

            for (index, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.sequence, index);
                prop_assert!(!chunk.bytes.is_empty());
                prop_assert!(chunk.bytes.len() <= chunk_size);
            }
            prop_assert_eq!(chunks.len(), data.len().div_ceil(chunk_size));
        }
    }
}
