//! Request body variants
//!
//! The caller picks the encoding explicitly; the dispatcher derives the
//! content type from the variant instead of inspecting the payload.

use std::path::PathBuf;

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Body of one API request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON text
    Json(Value),
    /// Serialized as `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// Sent as `multipart/form-data`; the transport chooses the boundary
    Multipart(MultipartBody),
}

impl RequestBody {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Content type implied by the encoding. Multipart has none: the
    /// boundary is only known to the transport.
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            Self::Json(_) => Some(CONTENT_TYPE_JSON),
            Self::Form(_) => Some(CONTENT_TYPE_FORM),
            Self::Multipart(_) => None,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

/// Encode pairs the way a browser encodes a form submission
pub fn encode_form(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Where a file part's bytes come from
#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    Bytes(Vec<u8>),
    /// Read when the request is sent, so every retry sees the current file
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        source: FileSource,
    },
}

/// Ordered multipart payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartBody {
    parts: Vec<MultipartPart>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
    ) -> Self {
        self.parts.push(MultipartPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            source: FileSource::Path(path.into()),
        });
        self
    }

    pub fn bytes(
        mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
    ) -> Self {
        self.parts.push(MultipartPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            source: FileSource::Bytes(bytes),
        });
        self
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    /// Materialize the transport form, reading file parts from disk
    pub async fn to_form(&self) -> Result<Form> {
        let mut form = Form::new();

        for part in &self.parts {
            form = match part {
                MultipartPart::Text { name, value } => form.text(name.clone(), value.clone()),
                MultipartPart::File {
                    name,
                    file_name,
                    mime,
                    source,
                } => {
                    let bytes = match source {
                        FileSource::Bytes(bytes) => bytes.clone(),
                        FileSource::Path(path) => tokio::fs::read(path).await?,
                    };
                    let file_part = Part::bytes(bytes)
                        .file_name(file_name.clone())
                        .mime_str(mime)
                        .map_err(|e| Error::InvalidHeader(format!("MIME type {mime:?}: {e}")))?;
                    form.part(name.clone(), file_part)
                }
            };
        }

        Ok(form)
    }
}
