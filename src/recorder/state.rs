//! Recording state management
//!
//! Defines the session phases, the recorder configuration and the artifact
//! a finished recording produces.

use crate::capture::Support;
use crate::encoder::ContainerFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Current phase of the recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No session has been started yet
    #[default]
    Idle,
    /// Waiting for the capture provider (permission prompt)
    Acquiring,
    /// Stream held, pre-roll countdown running
    Countdown,
    /// Encoder running
    Recording,
    /// Stop requested, waiting for the encoder's final segments
    Finalizing,
    /// Artifact available
    Stopped,
    /// Acquisition or countdown failed; controls are back to idle
    Aborted,
}

impl Phase {
    /// Phases in which the session exclusively holds a capture stream
    pub fn holds_stream(&self) -> bool {
        matches!(self, Phase::Countdown | Phase::Recording)
    }
}

/// Configuration for recording sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// First countdown value; 0 skips the countdown
    pub countdown_from: u8,

    /// Time between countdown ticks in milliseconds
    pub tick_interval_ms: u64,

    /// Whether to ask for tab/system audio alongside video
    pub capture_audio: bool,

    /// Prefix of the downloaded file name
    pub file_prefix: String,

    /// Container the encoder produces
    pub format: ContainerFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_from: 3,
            tick_interval_ms: 1000,
            capture_audio: true,
            file_prefix: "screen-recording".to_string(),
            format: ContainerFormat::Webm,
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// The finished recording. Immutable once assembled.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub id: Uuid,
    pub format: ContainerFormat,
    pub created_at: DateTime<Utc>,
    bytes: Arc<[u8]>,
}

impl Artifact {
    /// Concatenate segments in arrival order
    pub fn assemble(chunks: &[Vec<u8>], format: ContainerFormat) -> Self {
        Self {
            id: Uuid::new_v4(),
            format,
            created_at: Utc::now(),
            bytes: Arc::from(chunks.concat()),
        }
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// In-memory reference used as the preview source after stopping
    pub fn object_url(&self) -> String {
        format!("blob:screen-recorder/{}", self.id)
    }
}

/// Point-in-time view of the recorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub support: Support,

    /// Id of the active (or last) session
    pub session_id: Option<Uuid>,

    /// Segments received by the active session
    pub chunk_count: usize,

    /// Whether a capture stream is currently held
    pub stream_open: bool,

    /// Size of the artifact, if one exists
    pub artifact_len: Option<usize>,
}
