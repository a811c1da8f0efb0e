//! Encoder seam
//!
//! An encoder consumes a live capture stream and hands back compressed
//! segments at its own cadence. The recorder only cares about the order of
//! those segments and the final "stopped" signal.

use crate::capture::SharedStream;
use crate::recorder::events::SessionEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Encoder errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncoderError {
    #[error("container format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("encoder failed to start: {0}")]
    StartFailed(String),

    #[error("encoder failed: {0}")]
    Failed(String),
}

/// Output container produced by the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    #[default]
    Webm,
    Mp4,
}

impl ContainerFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Webm => "webm",
            ContainerFormat::Mp4 => "mp4",
        }
    }

    /// Get the MIME type of the assembled file
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContainerFormat::Webm => "video/webm",
            ContainerFormat::Mp4 => "video/mp4",
        }
    }
}

/// Where an encoder delivers its output.
///
/// Every call is queued onto the recorder's event loop, so an encoder may
/// call these from any thread or from inside `Encoder::stop`.
#[derive(Debug, Clone)]
pub struct EncoderSink {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EncoderSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, tx }
    }

    /// Deliver one encoded segment
    pub fn chunk(&self, data: Vec<u8>) {
        let _ = self.tx.send(SessionEvent::Chunk {
            generation: self.generation,
            data,
        });
    }

    /// Signal that no further segments will follow
    pub fn stopped(&self) {
        let _ = self.tx.send(SessionEvent::EncoderStopped {
            generation: self.generation,
        });
    }

    /// Report an unrecoverable encoder error
    pub fn failed(&self, error: EncoderError) {
        let _ = self.tx.send(SessionEvent::EncoderFailed {
            generation: self.generation,
            error,
        });
    }
}

/// A live-stream encoder
pub trait Encoder: Send {
    /// Begin encoding `stream`. Segments and the final stop notification
    /// go to `sink`.
    fn start(&mut self, stream: SharedStream, sink: EncoderSink) -> Result<(), EncoderError>;

    /// Ask the encoder to finalize. `EncoderSink::stopped` must be called
    /// after the last segment, possibly later.
    fn stop(&mut self);
}

/// Creates one encoder per recording
pub trait EncoderFactory: Send + Sync {
    fn create(&self, format: ContainerFormat) -> Result<Box<dyn Encoder>, EncoderError>;
}
