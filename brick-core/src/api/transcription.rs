//! Audio transcription upload with bounded retry
//!
//! A recording that was just stopped is sometimes not yet complete when the
//! upload starts, and the server rejects it in whatever way it sees fit: an
//! error status, or a 200 without a transcript. Every failure is therefore
//! retried a fixed number of times with a fixed pause, re-reading the file
//! each time.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::types::AudioTranscription;

use super::body::MultipartBody;
use super::client::{ApiCallOptions, ApiClient};
use super::retry::RetryPolicy;

pub const TRANSCRIBE_ENDPOINT: &str = "/audio/transcribe";
pub const TRANSCRIPTION_MAX_ATTEMPTS: u32 = 5;
pub const TRANSCRIPTION_RETRY_DELAY: Duration = Duration::from_millis(400);

pub const RECORDING_FIELD: &str = "file";
pub const RECORDING_FILE_NAME: &str = "recording.m4a";
pub const RECORDING_MIME: &str = "audio/m4a";

/// Shown in place of a transcript when every attempt failed
pub const TRANSCRIPTION_FALLBACK: &str = "Could not recognize your speech. Please try again!";

impl RetryPolicy {
    /// Five attempts, 400 ms apart, whatever the failure
    pub fn transcription() -> Self {
        RetryPolicy::fixed(TRANSCRIPTION_MAX_ATTEMPTS, TRANSCRIPTION_RETRY_DELAY)
    }

    /// [`RetryPolicy::transcription`] that gives up on permanent failures such as a 401
    pub fn transcription_transient_only() -> Self {
        Self::transcription().retry_if(Error::is_transient)
    }
}

impl ApiClient {
    /// Upload a recording file and return the trimmed transcript
    pub async fn transcribe_recording(&self, path: &Path) -> Result<String> {
        let body = MultipartBody::new().file(
            RECORDING_FIELD,
            path,
            RECORDING_FILE_NAME,
            RECORDING_MIME,
        );
        self.transcribe_with(body, &RetryPolicy::transcription())
            .await
    }

    /// Upload in-memory audio and return the trimmed transcript
    pub async fn transcribe_bytes(&self, audio: Vec<u8>) -> Result<String> {
        let body = MultipartBody::new().bytes(
            RECORDING_FIELD,
            audio,
            RECORDING_FILE_NAME,
            RECORDING_MIME,
        );
        self.transcribe_with(body, &RetryPolicy::transcription())
            .await
    }

    /// Like [`ApiClient::transcribe_recording`], but never fails: yields
    /// [`TRANSCRIPTION_FALLBACK`] once the retries are spent.
    pub async fn transcribe_or_fallback(&self, path: &Path) -> String {
        match self.transcribe_recording(path).await {
            Ok(text) => text,
            Err(e) => {
                error!("Transcription failed: {}", e);
                TRANSCRIPTION_FALLBACK.to_string()
            }
        }
    }

    /// Run the upload under an explicit retry policy
    pub async fn transcribe_with(&self, body: MultipartBody, policy: &RetryPolicy) -> Result<String> {
        let transcription: AudioTranscription = policy
            .run(move |attempt| {
                debug!("Transcription attempt {}", attempt);
                let options = ApiCallOptions::post().multipart(body.clone());
                self.call(TRANSCRIBE_ENDPOINT, options)
            })
            .await?;

        Ok(transcription.transcript.trim().to_string())
    }
}
