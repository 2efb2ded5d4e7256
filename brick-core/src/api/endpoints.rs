//! Typed wrappers for the server endpoints the app uses

use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::error::Result;
use crate::types::{
    Brick, BrickContextSearchResult, BrickId, BrickLearnResponse, BrickUpdate, Collection,
    CollectionId, CollectionQuery, NewCollection, SentenceCompareResponse, StatusResponse, Token,
    VideoContextSearchResult,
};

use super::client::{ApiCallOptions, ApiClient, ResponseBody};

/// Append `?k=v&...` to a path; no-op for an empty list
pub fn with_query<K, V>(path: &str, pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if pairs.is_empty() {
        return path.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
        .finish();
    format!("{path}?{query}")
}

/// Percent-encode a relative path one segment at a time; `/` separators are kept
///
/// Audio URIs are server-side relative paths (`audio/12.mp3`), not opaque names.
pub fn encode_path(path: &str) -> String {
    let mut url = match Url::parse("http://segment.invalid/") {
        Ok(url) => url,
        Err(_) => return path.to_string(),
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().extend(path.trim_start_matches('/').split('/'));
    }
    url.path().trim_start_matches('/').to_string()
}

impl ApiClient {
    /// Exchange credentials for a token and store it in the session
    pub async fn login(&self, username: &str, password: &str) -> Result<Token> {
        let options = ApiCallOptions::post()
            .form([
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
                ("scope", ""),
            ])
            .without_auth();

        let token: Token = self.call("/auth/login", options).await?;
        self.session().login(&token.access_token).await;
        info!("Logged in as {}", username);
        Ok(token)
    }

    pub async fn logout(&self) {
        self.session().logout().await;
        info!("Logged out");
    }

    pub async fn list_collections(&self, query: &CollectionQuery) -> Result<Vec<Collection>> {
        let endpoint = with_query("/collections", &query.pairs());
        let collections: Option<Vec<Collection>> =
            self.call(&endpoint, ApiCallOptions::get()).await?;
        Ok(collections.unwrap_or_default())
    }

    pub async fn create_collection(&self, collection: &NewCollection) -> Result<Collection> {
        self.call("/collections", ApiCallOptions::post().json(collection)?)
            .await
    }

    /// Random brick, optionally restricted to some collections
    pub async fn random_brick(&self, collection_ids: &[CollectionId]) -> Result<Brick> {
        let pairs: Vec<(&str, String)> = collection_ids
            .iter()
            .map(|id| ("collection_ids", id.to_string()))
            .collect();
        let endpoint = with_query("/bricks/random", &pairs);
        self.call(&endpoint, ApiCallOptions::get()).await
    }

    pub async fn get_brick(&self, id: BrickId) -> Result<Brick> {
        self.call(&format!("/bricks/{id}"), ApiCallOptions::get())
            .await
    }

    /// Returns the updated brick when the server echoes it.
    ///
    /// A `{"message": ...}` status reply or an empty body yields `None`;
    /// anything else must decode as a brick.
    pub async fn update_brick(&self, id: BrickId, update: &BrickUpdate) -> Result<Option<Brick>> {
        let body = self
            .send(&format!("/bricks/{id}"), ApiCallOptions::patch().json(update)?)
            .await?;
        match body {
            ResponseBody::Empty => Ok(None),
            ResponseBody::Json(ref value)
                if value.get("message").is_some() && value.get("id").is_none() =>
            {
                debug!("Brick {} updated: {}", id, value["message"]);
                Ok(None)
            }
            other => other.into_typed().map(Some),
        }
    }

    /// Brick at 1-based `brick_order` within a collection
    pub async fn learn_brick(
        &self,
        collection_id: CollectionId,
        brick_order: u32,
    ) -> Result<BrickLearnResponse> {
        let endpoint = with_query(
            &format!("/bricks/learn/{collection_id}"),
            &[("brick_order", brick_order.to_string())],
        );
        self.call(&endpoint, ApiCallOptions::get()).await
    }

    /// Flag a brick whose audio file is broken
    pub async fn report_brick_audio(&self, audio_uri: &str) -> Result<StatusResponse> {
        debug!("Reporting broken audio {}", audio_uri);
        self.call(
            &format!("/bricks/report/{}", encode_path(audio_uri)),
            ApiCallOptions::post(),
        )
        .await
    }

    /// Score an answer against the target sentence
    pub async fn compare_sentences(
        &self,
        answer: &str,
        target: &str,
    ) -> Result<SentenceCompareResponse> {
        let options = ApiCallOptions::post().json(&json!({
            "sentence1": answer,
            "sentence2": target,
        }))?;
        self.call("/text/comparisons", options).await
    }

    pub async fn search_videos(&self, query: &str) -> Result<Vec<VideoContextSearchResult>> {
        let options = ApiCallOptions::post().json(&json!({ "query": query }))?;
        let results: Option<Vec<VideoContextSearchResult>> =
            self.call("/context-search/videos", options).await?;
        Ok(results.unwrap_or_default())
    }

    pub async fn search_bricks(&self, query: &str) -> Result<Vec<BrickContextSearchResult>> {
        let options = ApiCallOptions::post().json(&json!({ "query": query }))?;
        let results: Option<Vec<BrickContextSearchResult>> =
            self.call("/context-search/bricks", options).await?;
        Ok(results.unwrap_or_default())
    }

    /// Playable URL of a brick's audio file
    pub fn brick_audio_url(&self, file_name: &str) -> String {
        self.url_for(&format!("/bricks/audio/{}", encode_path(file_name)))
    }
}
