//! Voice note download into a transient local file
//!
//! Each voice event owns exactly one [`TransientAudio`]. The file is created
//! before any byte is downloaded so cleanup always has a target, and it is
//! removed when the pipeline calls [`TransientAudio::cleanup`] or, failing
//! that, when the guard is dropped.

use crate::event::{AttachmentRef, Sender};
use crate::platform::AttachmentSource;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Attachment download returned status {0}")]
    Status(u16),
    #[error("Voice note is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
}

/// Uniquely named `.ogg` file scoped to one voice event
#[derive(Debug)]
pub struct TransientAudio {
    path: PathBuf,
    cleaned: bool,
}

impl TransientAudio {
    /// Create an empty, uniquely named file in `dir`
    pub fn allocate(dir: &Path) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("voice_")
            .suffix(".ogg")
            .tempfile_in(dir)?;

        // Deletion is handled by cleanup(), not by tempfile
        let path = file.into_temp_path().keep().map_err(|e| e.error)?;
        debug!("Allocated transient audio file {:?}", path);

        Ok(Self {
            path,
            cleaned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file. Safe to call more than once.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            debug!("Transient audio {:?} already cleaned up", self.path);
            return;
        }
        self.cleaned = true;
        cleanup_file(&self.path);
    }
}

impl Drop for TransientAudio {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Remove a temporary audio file, logging the outcome.
///
/// Returns whether a file was actually deleted. Never fails.
pub fn cleanup_file(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Deleted temporary file: {:?}", path);
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Temporary file {:?} already gone", path);
            false
        }
        Err(e) => {
            error!("Failed to delete file {:?}: {}", path, e);
            false
        }
    }
}

/// Download a voice attachment into `audio`
pub async fn fetch<S: AttachmentSource + ?Sized>(
    source: &S,
    sender: &Sender,
    attachment: &AttachmentRef,
    audio: &TransientAudio,
    max_bytes: Option<u64>,
) -> Result<u64, FetchError> {
    if let Some(limit) = max_bytes {
        if attachment.size > limit {
            return Err(FetchError::TooLarge {
                size: attachment.size,
                limit,
            });
        }
    }

    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(audio.path())
        .await?;

    // Declared sizes are not authoritative, the source enforces the limit while streaming
    let written = source.download(attachment, &mut file, max_bytes).await?;

    info!("Downloaded voice note from {}", sender.display_name);
    Ok(written)
}
