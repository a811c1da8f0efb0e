//! Capture trait definitions
//!
//! Platform-agnostic seams for the screen capture facility. The recorder
//! only ever talks to a capture source through these traits.

use crate::recorder::events::SessionEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Why a capture request was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("screen capture unsupported: {0}")]
    Unsupported(String),

    #[error("no capturable surface was selected")]
    NoSurface,

    #[error("{0}")]
    Other(String),
}

/// What the recorder asks the capture provider for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Video is always required
    pub video: bool,

    /// Audio is best effort; providers may grant a video-only stream
    pub audio: bool,
}

impl CaptureRequest {
    pub fn new(audio: bool) -> Self {
        Self { video: true, audio }
    }
}

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Information about one track of a granted stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub kind: TrackKind,

    /// Human-readable label (e.g. the captured window's title)
    pub label: String,

    /// False once the track has been stopped
    pub live: bool,
}

/// A live capture stream handed out by a [`CaptureProvider`]
pub trait MediaStream: Send + Sync + fmt::Debug {
    /// Stable identifier, used as the preview source during recording
    fn id(&self) -> &str;

    /// Current tracks of the stream
    fn tracks(&self) -> Vec<TrackInfo>;

    /// Stop every track. Must be idempotent.
    fn stop_all_tracks(&self);

    /// True while at least one track is live
    fn is_live(&self) -> bool {
        self.tracks().iter().any(|t| t.live)
    }
}

/// Streams are shared between the session, the encoder and the preview
pub type SharedStream = Arc<dyn MediaStream>;

/// Result of probing the platform for a working capture facility
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// The capture API surface exists and can be called
    Available,
    /// The capture API surface is known to be missing or broken
    Unavailable(String),
    /// The provider cannot tell; callers fall back to heuristics
    Unknown,
}

/// Lets a provider report that a granted stream ended on its own
/// (e.g. the user pressed the platform's "stop sharing" button).
#[derive(Debug, Clone)]
pub struct StreamEndNotifier {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl StreamEndNotifier {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, tx }
    }

    /// Report that the stream stopped delivering media
    pub fn ended(&self) {
        let _ = self.tx.send(SessionEvent::StreamEnded {
            generation: self.generation,
        });
    }
}

/// Platform facility that yields a screen stream after user consent
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Attempt the capture API surface without prompting the user
    fn probe(&self) -> Probe {
        Probe::Unknown
    }

    /// Ask for a capture stream. Resolves once the user answered the
    /// permission prompt; may never resolve if the prompt is left open.
    async fn request_capture(
        &self,
        request: CaptureRequest,
        ended: StreamEndNotifier,
    ) -> Result<SharedStream, CaptureError>;
}
