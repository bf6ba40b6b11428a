//! Voice note inspection before upload
//!
//! Discord voice messages are Opus in an Ogg container. Probing is only used
//! for logging; Groq decodes the audio itself.

use ogg::reading::{OggReadError, PacketReader};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Opus granule positions always count 48 kHz samples
const OPUS_GRANULE_RATE: f64 = 48_000.0;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Ogg error: {0}")]
    Ogg(#[from] OggReadError),
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("No packets in stream")]
    Empty,
}

/// What the Ogg container says about a voice note
#[derive(Debug, Clone, PartialEq)]
pub struct OggInfo {
    pub packets: usize,
    /// Present when the first packet is an `OpusHead`
    pub duration_secs: Option<f64>,
}

/// Audio processor for format operations
pub struct AudioProcessor;

impl AudioProcessor {
    /// Get MIME type for audio file
    pub fn get_mime_type(path: &Path) -> &'static str {
        match path.extension().and_then(|e| e.to_str()) {
            Some("ogg") | Some("oga") | Some("opus") => "audio/ogg",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("wav") => "audio/wav",
            Some("flac") => "audio/flac",
            Some("webm") => "audio/webm",
            _ => "audio/ogg",
        }
    }

    /// Walk the Ogg pages of a file and estimate its Opus duration
    pub fn probe_ogg(path: &Path) -> Result<OggInfo, ProcessorError> {
        if !path.exists() {
            return Err(ProcessorError::NotFound(path.to_path_buf()));
        }

        let mut reader = PacketReader::new(BufReader::new(File::open(path)?));
        let mut packets = 0usize;
        let mut pre_skip: Option<u64> = None;
        let mut last_granule = 0u64;

        while let Some(packet) = reader.read_packet()? {
            if packets == 0 {
                pre_skip = opus_pre_skip(&packet.data);
            }
            packets += 1;
            last_granule = last_granule.max(packet.absgp_page());
        }

        if packets == 0 {
            return Err(ProcessorError::Empty);
        }

        let duration_secs =
            pre_skip.map(|skip| last_granule.saturating_sub(skip) as f64 / OPUS_GRANULE_RATE);

        Ok(OggInfo {
            packets,
            duration_secs,
        })
    }
}

/// Pre-skip from an `OpusHead` identification header (RFC 7845 §5.1)
fn opus_pre_skip(header: &[u8]) -> Option<u64> {
    if header.len() < 19 || &header[..8] != b"OpusHead" {
        return None;
    }
    Some(u16::from_le_bytes([header[10], header[11]]) as u64)
}
