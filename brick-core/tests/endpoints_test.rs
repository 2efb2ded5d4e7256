//! Integration tests for the typed endpoint wrappers

mod common;

use std::sync::Arc;

use brick::{
    ApiClient, AuthSession, BrickUpdate, ClientConfig, CollectionQuery, Error, NewCollection,
    SqliteCredentialStore, Storage,
};
use serde_json::{Value, json};
use tempfile::TempDir;

use common::{client, client_with_token, recorder, serve};

const BRICK_JSON: &str = r#"{
    "id": 12,
    "creator_id": 3,
    "target_text": "good morning",
    "native_text": "chào buổi sáng",
    "is_public": true,
    "target_audio_url": "12.mp3",
    "created_at": "2024-05-01T10:00:00"
}"#;

#[tokio::test]
async fn test_login_persists_token_for_later_calls() {
    let (app, log) = recorder(200, r#"{"access_token":"fresh","token_type":"bearer"}"#);
    let base = serve(app).await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("brick.db");

    let session = || {
        let storage = Arc::new(Storage::open(&db_path).unwrap());
        AuthSession::new(Arc::new(SqliteCredentialStore::new(storage)))
    };
    let api = ApiClient::new(ClientConfig::new(&base).unwrap(), session()).unwrap();
    assert!(!api.session().is_logged_in().await);

    let token = api.login("learner", "secret").await.unwrap();
    assert_eq!(token.access_token, "fresh");

    // a second client over the same database sees the token
    let reopened = ApiClient::new(ClientConfig::new(&base).unwrap(), session()).unwrap();
    assert!(reopened.session().is_logged_in().await);
    let _ = reopened.get_brick(1).await;

    {
        let requests = log.lock();
        assert_eq!(requests[0].uri, "/auth/login");
        assert_eq!(
            requests[0].body_text(),
            "grant_type=password&username=learner&password=secret&scope="
        );
        assert_eq!(requests[0].header("authorization"), None);
        assert_eq!(requests[1].header("authorization"), Some("Bearer fresh"));
    }

    reopened.logout().await;
    assert!(!api.session().is_logged_in().await);
}

#[tokio::test]
async fn test_failed_login_keeps_session_empty() {
    let (app, _log) = recorder(401, r#"{"detail":"Incorrect username or password"}"#);
    let base = serve(app).await;
    let api = client(&base);

    let err = api.login("learner", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!api.session().is_logged_in().await);
}

#[tokio::test]
async fn test_list_collections_query() {
    let (app, log) = recorder(
        200,
        r#"[{"id":1,"name":"Greetings","group_name":"Daily","brick_count":8}]"#,
    );
    let base = serve(app).await;
    let api = client_with_token(&base, "tok");

    let collections = api
        .list_collections(&CollectionQuery::default().page(1).limit(10).group("Daily life"))
        .await
        .unwrap();

    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].name, "Greetings");
    assert_eq!(collections[0].brick_count, 8);
    assert_eq!(
        log.lock()[0].uri,
        "/collections?page=1&limit=10&group_name=Daily+life"
    );
}

#[tokio::test]
async fn test_create_collection_sends_json() {
    let (app, log) = recorder(200, r#"{"id":4,"name":"Food","group_name":"Daily"}"#);
    let base = serve(app).await;
    let api = client(&base);

    let created = api
        .create_collection(&NewCollection {
            name: "Food".to_string(),
            group_name: "Daily".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(created.id, 4);
    let requests = log.lock();
    assert_eq!(requests[0].method, "POST");
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent, json!({"name": "Food", "group_name": "Daily"}));
}

#[tokio::test]
async fn test_random_brick_repeats_collection_ids() {
    let (app, log) = recorder(200, BRICK_JSON);
    let base = serve(app).await;
    let api = client(&base);

    let brick = api.random_brick(&[3, 5]).await.unwrap();
    assert_eq!(brick.id, 12);
    assert_eq!(brick.created_at.as_deref(), Some("2024-05-01T10:00:00"));

    api.random_brick(&[]).await.unwrap();

    let requests = log.lock();
    assert_eq!(requests[0].uri, "/bricks/random?collection_ids=3&collection_ids=5");
    assert_eq!(requests[1].uri, "/bricks/random");
}

#[tokio::test]
async fn test_update_brick_tolerates_status_reply() {
    let (app, log) = recorder(200, r#"{"message":"Brick updated"}"#);
    let base = serve(app).await;
    let api = client(&base);

    let update = BrickUpdate {
        native_text: Some("xin chào".to_string()),
        ..Default::default()
    };
    let updated = api.update_brick(12, &update).await.unwrap();

    assert!(updated.is_none());
    let requests = log.lock();
    assert_eq!(requests[0].method, "PATCH");
    assert_eq!(requests[0].uri, "/bricks/12");
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent, json!({"native_text": "xin chào"}));
}

#[tokio::test]
async fn test_update_brick_decodes_echoed_brick() {
    let (app, _log) = recorder(200, BRICK_JSON);
    let base = serve(app).await;
    let api = client(&base);

    let updated = api
        .update_brick(12, &BrickUpdate::default())
        .await
        .unwrap();
    assert_eq!(updated.map(|b| b.id), Some(12));
}

#[tokio::test]
async fn test_update_brick_malformed_reply_is_an_error() {
    let (app, _log) = recorder(200, r#"{"id":"twelve","target_text":1}"#);
    let base = serve(app).await;
    let api = client(&base);

    let err = api
        .update_brick(12, &BrickUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[tokio::test]
async fn test_learn_brick_order() {
    let body = format!(r#"{{"brick":{BRICK_JSON},"total_bricks":30}}"#);
    let (app, log) = recorder(200, &body);
    let base = serve(app).await;
    let api = client(&base);

    let step = api.learn_brick(7, 3).await.unwrap();

    assert_eq!(step.total_bricks, 30);
    assert_eq!(step.brick.map(|b| b.id), Some(12));
    assert_eq!(log.lock()[0].uri, "/bricks/learn/7?brick_order=3");
}

#[tokio::test]
async fn test_report_brick_audio() {
    let (app, log) = recorder(200, r#"{"message":"Reported"}"#);
    let base = serve(app).await;
    let api = client(&base);

    let status = api.report_brick_audio("12.mp3").await.unwrap();

    assert_eq!(status.message, "Reported");
    assert_eq!(log.lock()[0].uri, "/bricks/report/12.mp3");
}

#[tokio::test]
async fn test_report_brick_audio_keeps_nested_path() {
    let (app, log) = recorder(200, r#"{"message":"Reported"}"#);
    let base = serve(app).await;
    let api = client(&base);

    api.report_brick_audio("audio/2024/12 b.mp3").await.unwrap();

    assert_eq!(log.lock()[0].uri, "/bricks/report/audio/2024/12%20b.mp3");
}

#[tokio::test]
async fn test_compare_sentences() {
    let (app, log) = recorder(200, r#"{"correct":true,"score":0.92,"threshold":0.8}"#);
    let base = serve(app).await;
    let api = client(&base);

    let result = api
        .compare_sentences("good mornin", "good morning")
        .await
        .unwrap();

    assert!(result.correct);
    assert_eq!(result.percent(), 92);
    let sent: Value = serde_json::from_slice(&log.lock()[0].body).unwrap();
    assert_eq!(
        sent,
        json!({"sentence1": "good mornin", "sentence2": "good morning"})
    );
}

#[tokio::test]
async fn test_search_with_empty_body_is_empty_list() {
    let (app, _log) = recorder(200, "");
    let base = serve(app).await;
    let api = client(&base);

    assert!(api.search_videos("hello").await.unwrap().is_empty());
    assert!(api.search_bricks("hello").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_videos() {
    let (app, log) = recorder(
        200,
        r#"[{"ytb_video_id":"abc","text":"hello there","start":12.5,"duration":2.0}]"#,
    );
    let base = serve(app).await;
    let api = client(&base);

    let results = api.search_videos("hello").await.unwrap();

    assert_eq!(results[0].ytb_video_id, "abc");
    assert_eq!(results[0].start, 12.5);
    assert_eq!(log.lock()[0].uri, "/context-search/videos");
}
