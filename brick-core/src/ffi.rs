//! FFI layer for the mobile front-end
//!
//! Provides C-compatible functions over an opaque handle. Every string
//! returned to the caller is heap-allocated here and must be released with
//! [`brick_free_string`].

// FFI functions necessarily work with raw pointers - this is expected behavior
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::{debug, error};

use crate::api::{ApiCallOptions, ApiClient, HttpMethod, TRANSCRIPTION_FALLBACK};
use crate::config::ClientConfig;
use crate::credentials::{AuthSession, SqliteCredentialStore};
use crate::error::{Error, Result};
use crate::storage::{SETTING_API_BASE_URL, Storage};
use crate::types::ChatMessage;

/// Opaque handle to the Brick engine
pub struct BrickHandle {
    runtime: Runtime,
    storage: Arc<Storage>,
    client: ApiClient,
    last_error: Mutex<Option<String>>,
}

/// Called once per decoded chat chunk; `chunk` is only valid during the call
pub type ChunkCallback = extern "C" fn(chunk: *const c_char, context: *mut c_void);

fn set_last_error(handle: &BrickHandle, message: impl Into<String>) {
    *handle.last_error.lock() = Some(message.into());
}

fn clear_last_error(handle: &BrickHandle) {
    *handle.last_error.lock() = None;
}

/// Record the outcome of a call, keeping the error message for the caller
fn track<T>(handle: &BrickHandle, context: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => {
            clear_last_error(handle);
            Some(value)
        }
        Err(e) => {
            let message = format!("{context}: {e}");
            error!("{message}");
            set_last_error(handle, message);
            None
        }
    }
}

fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn into_c_string(text: String) -> *mut c_char {
    match CString::new(text) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn to_json_c_string<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => into_c_string(json),
        Err(_) => ptr::null_mut(),
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("brick")
        .join("brick.db")
}

/// Explicit argument, then the saved setting, then the environment
fn resolve_config(storage: &Storage, base_url: Option<&str>) -> Result<ClientConfig> {
    if let Some(url) = base_url {
        return ClientConfig::new(url);
    }
    if let Some(saved) = storage.get_setting(SETTING_API_BASE_URL)? {
        return ClientConfig::new(&saved);
    }
    ClientConfig::from_env()
}

fn open_handle(db_path: &Path, base_url: Option<&str>) -> Result<BrickHandle> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let runtime = Runtime::new()?;
    let storage = Arc::new(Storage::open(db_path)?);
    let config = resolve_config(&storage, base_url)?;
    let session = AuthSession::new(Arc::new(SqliteCredentialStore::new(storage.clone())));
    let client = ApiClient::new(config, session)?;

    Ok(BrickHandle {
        runtime,
        storage,
        client,
        last_error: Mutex::new(None),
    })
}

// ============ Lifecycle ============

/// Initialize the Brick engine
/// Returns an opaque handle, or null on failure
/// `db_path` and `base_url` may be null to use the defaults
#[unsafe(no_mangle)]
pub extern "C" fn brick_init(db_path: *const c_char, base_url: *const c_char) -> *mut BrickHandle {
    let db_path = if db_path.is_null() {
        default_db_path()
    } else {
        match str_arg(db_path) {
            Some(path) => PathBuf::from(path),
            None => return ptr::null_mut(),
        }
    };
    let base_url = if base_url.is_null() {
        None
    } else {
        match str_arg(base_url) {
            Some(url) => Some(url),
            None => return ptr::null_mut(),
        }
    };

    match open_handle(&db_path, base_url) {
        Ok(handle) => {
            debug!("Brick engine initialized at {}", db_path.display());
            Box::into_raw(Box::new(handle))
        }
        Err(e) => {
            error!("Failed to initialize Brick engine: {}", e);
            ptr::null_mut()
        }
    }
}

/// Destroy the engine and free resources
#[unsafe(no_mangle)]
pub extern "C" fn brick_destroy(handle: *mut BrickHandle) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle));
        }
        debug!("Brick engine destroyed");
    }
}

/// Point the engine at another server and remember it for the next launch
/// Returns true on success
#[unsafe(no_mangle)]
pub extern "C" fn brick_set_base_url(handle: *mut BrickHandle, base_url: *const c_char) -> bool {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return false;
    };
    let Some(url) = str_arg(base_url) else {
        set_last_error(handle, "Invalid base URL string");
        return false;
    };

    let result = handle.client.set_base_url(url).and_then(|()| {
        handle
            .storage
            .set_setting(SETTING_API_BASE_URL, &handle.client.base_url())
    });
    track(handle, "Failed to set base URL", result).is_some()
}

// ============ Auth ============

/// Log in with username and password; the token is persisted
/// Returns true on success
#[unsafe(no_mangle)]
pub extern "C" fn brick_login(
    handle: *mut BrickHandle,
    username: *const c_char,
    password: *const c_char,
) -> bool {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return false;
    };
    let (Some(username), Some(password)) = (str_arg(username), str_arg(password)) else {
        set_last_error(handle, "Username and password are required");
        return false;
    };

    let result = handle
        .runtime
        .block_on(handle.client.login(username, password));
    track(handle, "Login failed", result).is_some()
}

/// Forget the stored token
#[unsafe(no_mangle)]
pub extern "C" fn brick_logout(handle: *mut BrickHandle) {
    if let Some(handle) = unsafe { handle.as_ref() } {
        handle.runtime.block_on(handle.client.logout());
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn brick_is_logged_in(handle: *mut BrickHandle) -> bool {
    match unsafe { handle.as_ref() } {
        Some(handle) => handle
            .runtime
            .block_on(handle.client.session().is_logged_in()),
        None => false,
    }
}

// ============ Requests ============

/// Issue a request through the dispatcher
/// `method` is "GET", "POST", "PUT", "PATCH" or "DELETE" (null means GET)
/// `body_json` may be null for no body
/// Returns the response body as JSON text: `null` for an empty body, a JSON
/// string for non-JSON text (caller must free with brick_free_string)
/// Returns null on failure
#[unsafe(no_mangle)]
pub extern "C" fn brick_api_call(
    handle: *mut BrickHandle,
    endpoint: *const c_char,
    method: *const c_char,
    body_json: *const c_char,
    requires_auth: bool,
) -> *mut c_char {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return ptr::null_mut();
    };
    let Some(endpoint) = str_arg(endpoint) else {
        set_last_error(handle, "Invalid endpoint string");
        return ptr::null_mut();
    };

    let options = (|| -> Result<ApiCallOptions> {
        let method = match str_arg(method) {
            Some(m) => m.parse::<HttpMethod>()?,
            None => HttpMethod::Get,
        };
        let mut options = ApiCallOptions::default().with_method(method);
        if let Some(body) = str_arg(body_json) {
            let value: serde_json::Value = serde_json::from_str(body)?;
            options = options.json(&value)?;
        }
        if !requires_auth {
            options = options.without_auth();
        }
        Ok(options)
    })();

    let result = options.and_then(|options| {
        handle
            .runtime
            .block_on(handle.client.send(endpoint, options))
    });

    match track(handle, &format!("API call {endpoint} failed"), result) {
        Some(body) => to_json_c_string(&body.into_value()),
        None => ptr::null_mut(),
    }
}

/// Score an answer against the target sentence
/// Returns `{"correct":..,"score":..,"threshold":..}` JSON (caller must free
/// with brick_free_string), or null on failure
#[unsafe(no_mangle)]
pub extern "C" fn brick_compare_sentences(
    handle: *mut BrickHandle,
    answer: *const c_char,
    target: *const c_char,
) -> *mut c_char {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return ptr::null_mut();
    };
    let (Some(answer), Some(target)) = (str_arg(answer), str_arg(target)) else {
        set_last_error(handle, "Answer and target are required");
        return ptr::null_mut();
    };

    let result = handle
        .runtime
        .block_on(handle.client.compare_sentences(answer, target));
    match track(handle, "Sentence comparison failed", result) {
        Some(response) => to_json_c_string(&response),
        None => ptr::null_mut(),
    }
}

/// Transcribe a recording file, retrying while the file settles
/// Always returns a string (caller must free with brick_free_string): the
/// transcript, or the fallback message once every attempt failed. The
/// failure itself is available from brick_get_last_error.
#[unsafe(no_mangle)]
pub extern "C" fn brick_transcribe_recording(
    handle: *mut BrickHandle,
    path: *const c_char,
) -> *mut c_char {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return into_c_string(TRANSCRIPTION_FALLBACK.to_string());
    };
    let result = match str_arg(path) {
        Some(path) => handle
            .runtime
            .block_on(handle.client.transcribe_recording(Path::new(path))),
        None => Err(Error::Config("Invalid recording path".to_string())),
    };

    let text = track(handle, "Transcription failed", result)
        .unwrap_or_else(|| TRANSCRIPTION_FALLBACK.to_string());
    into_c_string(text)
}

/// Stream a chat reply
/// `messages_json` is a JSON array of `{"role":..,"content":..}`
/// `callback` runs on the calling thread once per chunk, in order; the next
/// chunk is read after it returns
/// Returns true when the stream completed
#[unsafe(no_mangle)]
pub extern "C" fn brick_stream_chat(
    handle: *mut BrickHandle,
    messages_json: *const c_char,
    callback: ChunkCallback,
    context: *mut c_void,
) -> bool {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return false;
    };

    let result = str_arg(messages_json)
        .ok_or_else(|| Error::Config("Invalid messages string".to_string()))
        .and_then(|json| Ok(serde_json::from_str::<Vec<ChatMessage>>(json)?))
        .and_then(|messages| {
            handle
                .runtime
                .block_on(handle.client.stream_chat(&messages, |chunk| {
                    // interior NULs cannot cross the C boundary
                    if let Ok(cstr) = CString::new(chunk.replace('\0', "")) {
                        callback(cstr.as_ptr(), context);
                    }
                }))
        });

    track(handle, "Chat stream failed", result).is_some()
}

// ============ Errors & memory ============

/// Get the last error message (caller must free with brick_free_string)
/// Returns null if there was no error
#[unsafe(no_mangle)]
pub extern "C" fn brick_get_last_error(handle: *mut BrickHandle) -> *mut c_char {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return ptr::null_mut();
    };
    let message = handle.last_error.lock().clone();
    match message {
        Some(text) => into_c_string(text),
        None => ptr::null_mut(),
    }
}

/// Free a string returned by any brick_* function
#[unsafe(no_mangle)]
pub extern "C" fn brick_free_string(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}
