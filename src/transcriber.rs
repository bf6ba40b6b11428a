//! Speech-to-text via the Groq Whisper API
//!
//! Handles the multipart upload of a voice note and extraction of the text

use crate::audio::AudioProcessor;
use crate::config::models;
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One transcription call: the audio plus fixed decoding parameters
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Vec<u8>,
    pub file_name: String,
    pub mime_type: &'static str,
    pub model: &'static str,
    pub response_format: &'static str,
    /// `None` lets Whisper detect the language
    pub language: Option<String>,
    pub temperature: f32,
}

impl TranscriptionRequest {
    /// Greedy decoding with the turbo model and language auto-detection
    pub fn for_voice_note(audio: Vec<u8>, file_name: String, mime_type: &'static str) -> Self {
        Self {
            audio,
            file_name,
            mime_type,
            model: models::WHISPER_LARGE_V3_TURBO,
            response_format: "json",
            language: None,
            temperature: 0.0,
        }
    }
}

/// Read a downloaded voice note fully into a request
pub async fn read_request(path: &Path) -> Result<TranscriptionRequest, TranscribeError> {
    let audio = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("voice.ogg")
        .to_string();

    Ok(TranscriptionRequest::for_voice_note(
        audio,
        file_name,
        AudioProcessor::get_mime_type(path),
    ))
}

/// Text returned by the model
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
}

impl TranscriptionResult {
    /// Empty or whitespace-only text means no speech was detected
    pub fn has_speech(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Anything that can turn a voice note into text
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResult, TranscribeError>;
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Groq API client for transcription
pub struct GroqTranscriber {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GroqTranscriber {
    pub fn new(
        api_key: String,
        base_url: String,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl SpeechToText for GroqTranscriber {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResult, TranscribeError> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let size = request.audio.len();

        let part = multipart::Part::bytes(request.audio)
            .file_name(request.file_name)
            .mime_str(request.mime_type)?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", request.model)
            .text("response_format", request.response_format)
            .text("temperature", request.temperature.to_string());
        if let Some(language) = request.language {
            form = form.text("language", language);
        }

        debug!("Sending {} bytes to {} ({})", size, url, request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!("Transcription failed: {} - {}", status, message);
            return Err(TranscribeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
