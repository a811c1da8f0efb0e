//! Error types and handling
//!
//! Common error types used across the recorder, and the shape errors take
//! when they are surfaced to the UI as notices.

use crate::capture::CaptureError;
use crate::download::DownloadError;
use crate::encoder::EncoderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recorder-wide error type
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Screen recording is not supported: {0}")]
    CapabilityUnsupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Could not acquire a capture stream: {0}")]
    AcquisitionFailed(String),

    #[error("Recording aborted: {0}")]
    MidSessionAbort(String),

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Recorder is no longer running")]
    Closed,
}

impl From<CaptureError> for RecorderError {
    fn from(error: CaptureError) -> Self {
        match error {
            CaptureError::PermissionDenied(msg) => RecorderError::PermissionDenied(msg),
            CaptureError::Unsupported(msg) => RecorderError::CapabilityUnsupported(msg),
            other => RecorderError::AcquisitionFailed(other.to_string()),
        }
    }
}

impl From<EncoderError> for RecorderError {
    fn from(error: EncoderError) -> Self {
        RecorderError::MidSessionAbort(error.to_string())
    }
}

/// Error response for the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&RecorderError> for ErrorResponse {
    fn from(error: &RecorderError) -> Self {
        let code = match error {
            RecorderError::CapabilityUnsupported(_) => "CAPABILITY_UNSUPPORTED",
            RecorderError::PermissionDenied(_) => "PERMISSION_DENIED",
            RecorderError::AcquisitionFailed(_) => "ACQUISITION_FAILED",
            RecorderError::MidSessionAbort(_) => "MID_SESSION_ABORT",
            RecorderError::Download(_) => "DOWNLOAD_ERROR",
            RecorderError::Closed => "RECORDER_CLOSED",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<RecorderError> for ErrorResponse {
    fn from(error: RecorderError) -> Self {
        ErrorResponse::from(&error)
    }
}

/// Result type alias using RecorderError
pub type RecorderResult<T> = Result<T, RecorderError>;
