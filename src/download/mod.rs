//! Download surface
//!
//! Turns a finished artifact into a named file offer and hands it to
//! whatever saves files for the user. A directory-backed surface is
//! provided for hosts that can write to disk directly.

use crate::encoder::ContainerFormat;
use crate::recorder::state::Artifact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Download-related errors
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download rejected: {0}")]
    Rejected(String),
}

/// Build the offered file name, e.g. `screen-recording-1718000000000.webm`
pub fn file_name(prefix: &str, created_at: DateTime<Utc>, format: ContainerFormat) -> String {
    format!(
        "{}-{}.{}",
        prefix,
        created_at.timestamp_millis(),
        format.extension()
    )
}

/// A named file ready to be saved
#[derive(Debug, Clone)]
pub struct DownloadOffer {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl DownloadOffer {
    pub fn for_artifact(artifact: &Artifact, prefix: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            file_name: file_name(prefix, created_at, artifact.format),
            mime_type: artifact.format.mime_type().to_string(),
            bytes: artifact.bytes(),
        }
    }
}

/// What the surface did with an offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReceipt {
    pub file_name: String,

    /// Reference the user can follow to the saved file
    pub href: String,

    /// Number of bytes saved
    pub size: usize,
}

/// One-shot save action for a download offer
pub trait DownloadSurface: Send + Sync {
    fn save(&self, offer: &DownloadOffer) -> Result<DownloadReceipt, DownloadError>;
}

/// Saves offers as files inside a directory
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DownloadSurface for DirectoryDownloads {
    fn save(&self, offer: &DownloadOffer) -> Result<DownloadReceipt, DownloadError> {
        if offer.file_name.contains(['/', '\\']) {
            return Err(DownloadError::Rejected(format!(
                "file name must not contain path separators: {}",
                offer.file_name
            )));
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&offer.file_name);
        fs::write(&path, &offer.bytes)?;

        tracing::debug!("Saved {} bytes to {:?}", offer.bytes.len(), path);

        Ok(DownloadReceipt {
            file_name: offer.file_name.clone(),
            href: format!(
                "file://{}/{}",
                self.dir.display(),
                urlencoding::encode(&offer.file_name)
            ),
            size: offer.bytes.len(),
        })
    }
}
