//! Recorder events
//!
//! `UiUpdate` is what the UI layer observes. `SessionEvent` and `Intent`
//! are the two queues feeding the recorder loop.

use super::state::{Phase, SessionSnapshot};
use crate::capture::{CaptureError, SharedStream};
use crate::download::DownloadReceipt;
use crate::encoder::EncoderError;
use crate::utils::error::{ErrorResponse, RecorderResult};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// What the preview element should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PreviewSource {
    /// Live capture stream
    Stream { stream_id: String },
    /// Finished recording, played back with controls
    Artifact { url: String, controls: bool },
}

/// A message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// Blocking notices need to be acknowledged (an alert)
    pub blocking: bool,
    pub error: ErrorResponse,
}

/// State changes pushed to the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum UiUpdate {
    PhaseChanged(Phase),
    StartEnabled(bool),
    StartLabel(String),
    StopEnabled(bool),
    /// Show the countdown overlay with the current count
    Countdown(u8),
    CountdownHidden,
    DownloadEnabled(bool),
    Preview(PreviewSource),
    Notice(Notice),
}

/// Callbacks from collaborators, tagged with the session generation they
/// were issued for.
#[derive(Debug)]
pub enum SessionEvent {
    Acquired {
        generation: u64,
        result: Result<SharedStream, CaptureError>,
    },
    Tick {
        generation: u64,
        count: u8,
    },
    CountdownElapsed {
        generation: u64,
    },
    Chunk {
        generation: u64,
        data: Vec<u8>,
    },
    EncoderStopped {
        generation: u64,
    },
    EncoderFailed {
        generation: u64,
        error: EncoderError,
    },
    StreamEnded {
        generation: u64,
    },
}

impl SessionEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SessionEvent::Acquired { generation, .. }
            | SessionEvent::Tick { generation, .. }
            | SessionEvent::CountdownElapsed { generation }
            | SessionEvent::Chunk { generation, .. }
            | SessionEvent::EncoderStopped { generation }
            | SessionEvent::EncoderFailed { generation, .. }
            | SessionEvent::StreamEnded { generation } => *generation,
        }
    }
}

/// User intents forwarded by the UI layer
#[derive(Debug)]
pub enum Intent {
    Start,
    Stop,
    Download {
        reply: oneshot::Sender<RecorderResult<Option<DownloadReceipt>>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}
