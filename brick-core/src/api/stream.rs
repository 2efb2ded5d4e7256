//! Streaming chat client
//!
//! The chat endpoint answers with a plain byte stream. Each transport chunk is
//! decoded to text and handed on as soon as it arrives; chunk boundaries are
//! whatever the transport delivers and carry no meaning.

use std::pin::Pin;

use futures::{Stream, StreamExt, TryStreamExt, future};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::types::ChatMessage;

use super::body::CONTENT_TYPE_JSON;
use super::client::ApiClient;

pub const CHAT_ENDPOINT: &str = "/text/chat";

/// Decoded text chunks in arrival order
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
}

/// Incremental UTF-8 decoder.
///
/// A multi-byte character split across two chunks is held back until the
/// rest of it arrives. Invalid bytes decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            // incomplete sequence at the end, wait for more bytes
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Bytes still waiting for the rest of a character
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl ApiClient {
    /// Open the chat stream for a conversation.
    ///
    /// The stored token is attached whenever there is one. A non-2xx status
    /// fails here, before any chunk is read.
    pub async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        let body = serde_json::to_string(&ChatRequest { messages })?;

        let mut request = self
            .http()
            .post(self.url_for(CHAT_ENDPOINT))
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .body(body);

        if let Some(token) = self.session().token().await {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        debug!("Opening chat stream with {} messages", messages.len());

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            error!("Chat stream rejected: {}", status);
            return Err(Error::Http {
                status,
                body: String::new(),
            });
        }

        let mut decoder = Utf8ChunkDecoder::new();
        let stream = response
            .bytes_stream()
            .map(move |chunk| {
                chunk
                    .map(|bytes| decoder.decode(&bytes))
                    .map_err(Error::from)
            })
            .try_filter(|text| future::ready(!text.is_empty()));

        Ok(Box::pin(stream))
    }

    /// Send a conversation and invoke `on_chunk` once per received chunk.
    ///
    /// The next chunk is only read after the callback returns. If the
    /// connection drops mid-stream the error is returned; chunks already
    /// delivered stay delivered.
    pub async fn stream_chat<F>(&self, messages: &[ChatMessage], mut on_chunk: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        let mut stream = self.chat_stream(messages).await?;
        let mut chunks = 0usize;

        while let Some(chunk) = stream.next().await {
            let text = chunk?;
            on_chunk(&text);
            chunks += 1;
        }

        debug!("Chat stream finished after {} chunks", chunks);
        Ok(())
    }
}

/// Concatenate a stream into one string
pub async fn collect_text(stream: TextStream) -> Result<String> {
    stream
        .try_fold(String::new(), |mut acc, chunk| {
            acc.push_str(&chunk);
            future::ready(Ok(acc))
        })
        .await
}
