//! Request and response shapes exchanged with the Brick server

use serde::{Deserialize, Serialize};

/// Server-side identifier
pub type BrickId = i64;
pub type CollectionId = i64;

/// A learning unit: native text, target-language text and target-language audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brick {
    pub id: BrickId,
    #[serde(default)]
    pub creator_id: Option<i64>,
    pub target_text: String,
    pub native_text: String,
    #[serde(default)]
    pub is_public: bool,
    /// File name of the recording, resolved with `brick_audio_url`
    #[serde(alias = "target_audio_uri")]
    pub target_audio_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Changes applied by `PATCH /bricks/{id}`; absent fields stay untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrickUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_ids: Option<Vec<CollectionId>>,
}

/// One step of the guided learn flow through a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrickLearnResponse {
    pub brick: Option<Brick>,
    pub total_bricks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub brick_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCollection {
    pub name: String,
    pub group_name: String,
}

/// Paging and filtering for `GET /collections`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub group_name: Option<String>,
}

impl CollectionQuery {
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(group) = &self.group_name {
            pairs.push(("group_name", group.clone()));
        }
        pairs
    }
}

/// Score of a spoken or typed answer against the target sentence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentenceCompareResponse {
    pub correct: bool,
    /// Similarity in 0.0..=1.0
    pub score: f64,
    #[serde(default)]
    pub threshold: f64,
}

impl SentenceCompareResponse {
    /// Score as a rounded percentage
    pub fn percent(&self) -> u32 {
        (self.score.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTranscription {
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
}

/// OAuth2 password-grant response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoContextSearchResult {
    pub ytb_video_id: String,
    pub text: String,
    /// Seconds from the start of the video
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrickContextSearchResult {
    pub native_text: String,
    pub target_text: String,
    pub target_audio_uri: String,
    pub cefr_level: Option<CefrLevel>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
