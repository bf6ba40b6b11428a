//! Voice relay pipeline
//!
//! authorize -> fetch -> transcribe -> reply -> cleanup, once per event.
//! Every step returns a `Result`; the outcome is turned into a chat message
//! in exactly one place ([`VoiceRelay::respond`]) so internal errors never
//! reach the user.

use crate::audio::AudioProcessor;
use crate::auth::is_authorized;
use crate::commands::start::GREETING;
use crate::config::Config;
use crate::event::{AttachmentRef, EventKind, IncomingEvent, Sender};
use crate::fetcher::{fetch, FetchError, TransientAudio};
use crate::platform::{AttachmentSource, Replier};
use crate::transcriber::{read_request, SpeechToText, TranscribeError, TranscriptionResult};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Fixed replies
pub mod messages {
    pub const NO_SPEECH: &str = "⚠️ Could not hear any speech.";
    pub const FAILURE: &str = "❌ An error occurred during transcription.";
}

/// Discord rejects messages longer than this many characters
pub const MESSAGE_LIMIT: usize = 2000;

const FENCE_OPEN: &str = "```\n";
const FENCE_CLOSE: &str = "\n```";

/// Three backticks broken up by zero-width spaces, so they cannot close the fence
const ESCAPED_FENCE: &str = "`\u{200B}`\u{200B}`";

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Could not create temporary file: {0}")]
    Allocate(#[source] io::Error),
    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Transcription failed: {0}")]
    Transcribe(#[from] TranscribeError),
}

/// How an event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Greeted,
    Unauthorized,
    Transcribed,
    NoSpeech,
    Failed,
}

/// The bot's request/response core, shared read-only by all events
pub struct VoiceRelay<T, A> {
    owner: Option<String>,
    temp_dir: PathBuf,
    max_voice_bytes: Option<u64>,
    transcriber: T,
    source: A,
}

impl<T: SpeechToText, A: AttachmentSource> VoiceRelay<T, A> {
    pub fn new(config: &Config, transcriber: T, source: A) -> Self {
        Self {
            owner: config.allowed_user_id.clone(),
            temp_dir: config.temp_audio_dir.clone(),
            max_voice_bytes: config.max_voice_bytes,
            transcriber,
            source,
        }
    }

    /// Handle one inbound event, replying through `replier`
    pub async fn dispatch<R: Replier + ?Sized>(&self, event: &IncomingEvent, replier: &R) -> Outcome {
        match &event.kind {
            EventKind::Start => self.handle_start(event, replier).await,
            EventKind::Voice(attachment) => self.handle_voice(event, attachment, replier).await,
            EventKind::Other => Outcome::Ignored,
        }
    }

    async fn handle_start<R: Replier + ?Sized>(&self, event: &IncomingEvent, replier: &R) -> Outcome {
        if !self.authorized(&event.sender) {
            return Outcome::Ignored;
        }

        if let Err(e) = replier.reply(GREETING).await {
            error!("Failed to send greeting: {}", e);
        }
        Outcome::Greeted
    }

    async fn handle_voice<R: Replier + ?Sized>(
        &self,
        event: &IncomingEvent,
        attachment: &AttachmentRef,
        replier: &R,
    ) -> Outcome {
        if !self.authorized(&event.sender) {
            warn!("Unauthorized access attempt from User ID: {}", event.sender.id);
            return Outcome::Unauthorized;
        }

        if let Err(e) = replier.send_typing().await {
            debug!("Typing indicator failed: {}", e);
        }

        let mut audio = match TransientAudio::allocate(&self.temp_dir) {
            Ok(audio) => audio,
            Err(e) => return self.respond(replier, Err(RelayError::Allocate(e))).await,
        };

        let result = self.fetch_and_transcribe(&event.sender, attachment, &audio).await;
        let outcome = self.respond(replier, result).await;

        audio.cleanup();
        outcome
    }

    async fn fetch_and_transcribe(
        &self,
        sender: &Sender,
        attachment: &AttachmentRef,
        audio: &TransientAudio,
    ) -> Result<TranscriptionResult, RelayError> {
        let bytes = fetch(&self.source, sender, attachment, audio, self.max_voice_bytes).await?;

        // Container walk is blocking file IO
        let path = audio.path().to_path_buf();
        match tokio::task::spawn_blocking(move || AudioProcessor::probe_ogg(&path)).await {
            Ok(Ok(info)) => debug!(
                "Voice note: {} bytes, {} packets, {:?}s",
                bytes, info.packets, info.duration_secs
            ),
            Ok(Err(e)) => warn!("Could not inspect voice note container: {}", e),
            Err(e) => warn!("Could not inspect voice note container: {}", e),
        }

        let request = read_request(audio.path()).await?;
        let result = self.transcriber.transcribe(request).await?;
        info!("Transcribed voice note from {}", sender.display_name);
        Ok(result)
    }

    /// Turn a pipeline result into chat messages and send them
    async fn respond<R: Replier + ?Sized>(
        &self,
        replier: &R,
        result: Result<TranscriptionResult, RelayError>,
    ) -> Outcome {
        let (outcome, replies) = match result {
            Ok(result) if result.has_speech() => (Outcome::Transcribed, format_transcript(&result.text)),
            Ok(_) => (Outcome::NoSpeech, vec![messages::NO_SPEECH.to_string()]),
            Err(e) => {
                error!("Error processing voice: {}", e);
                (Outcome::Failed, vec![messages::FAILURE.to_string()])
            }
        };

        for reply in &replies {
            if let Err(e) = replier.reply(reply).await {
                error!("Failed to send reply: {}", e);
                break;
            }
        }
        outcome
    }

    fn authorized(&self, sender: &Sender) -> bool {
        is_authorized(sender.id, self.owner.as_deref())
    }
}

/// Wrap a transcript in fenced code blocks, one per message
pub fn format_transcript(text: &str) -> Vec<String> {
    let budget = MESSAGE_LIMIT - FENCE_OPEN.len() - FENCE_CLOSE.len();

    let escaped = text.replace("```", ESCAPED_FENCE);

    split_text(&escaped, budget)
        .into_iter()
        .map(|chunk| format!("{FENCE_OPEN}{chunk}{FENCE_CLOSE}"))
        .collect()
}

/// Split into pieces of at most `max_chars` characters, preferring whitespace
fn split_text(text: &str, max_chars: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while let Some((limit, _)) = rest.char_indices().nth(max_chars) {
        let cut = rest[..limit]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        chunks.push(&rest[..cut]);
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest);
    }
    chunks
}
