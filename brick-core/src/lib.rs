//! Brick Core - client engine for the Brick language-learning app
//!
//! Talks to the Brick server: a single request dispatcher with bearer-token
//! auth, streaming chat, and a retry-wrapped speech transcription upload.
//! The same engine backs the `brick` CLI and the C ABI used by the mobile
//! front-end.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod ffi;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

// Export FFI functions at crate root for cbindgen code generation
pub use ffi::*;

pub use api::{ApiCallOptions, ApiClient, HttpMethod, RequestBody, ResponseBody, RetryPolicy};
pub use config::ClientConfig;
pub use credentials::{AuthSession, CredentialStore, MemoryCredentialStore, SqliteCredentialStore};
pub use storage::Storage;
