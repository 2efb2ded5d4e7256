//! HTTP layer for the Brick server
//!
//! One dispatcher issues every request; streaming chat and the
//! retry-wrapped transcription upload sit beside it.
mod body;
mod client;
mod endpoints;
mod retry;
mod stream;
mod transcription;

pub use body::{
    CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, FileSource, MultipartBody, MultipartPart, RequestBody,
    encode_form,
};
pub use client::{
    ApiCallOptions, ApiClient, HttpMethod, ResponseBody, classify_response, resolve_headers,
};
pub use endpoints::{encode_path, with_query};
pub use retry::{Backoff, RetryPolicy};
pub use stream::{CHAT_ENDPOINT, TextStream, Utf8ChunkDecoder, collect_text};
pub use transcription::{
    RECORDING_FIELD, RECORDING_FILE_NAME, RECORDING_MIME, TRANSCRIBE_ENDPOINT,
    TRANSCRIPTION_FALLBACK, TRANSCRIPTION_MAX_ATTEMPTS, TRANSCRIPTION_RETRY_DELAY,
};
