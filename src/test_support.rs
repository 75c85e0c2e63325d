use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::datasource::repository::NewContent;
use crate::datasource::{ContentRepository, MemoryStore, UserRepository};
use crate::mailer::{Email, MailError, Mailer};
use crate::models::{Content, ContentKind, MediaAsset, Role, User};
use crate::services::accounts::hash_password;
use crate::state::AppState;

pub const PASSWORD: &str = "correct horse";

/// Keeps every sent message so tests can read the codes back.
#[derive(Debug, Default, Clone)]
pub struct RecordingMailer(Arc<Mutex<Vec<Email>>>);

impl RecordingMailer {
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        let sent = self.0.lock().unwrap();
        let html = &sent.iter().rev().find(|m| m.to == to)?.html;
        let start = html.find("<strong>")? + "<strong>".len();
        let end = html[start..].find("</strong>")? + start;
        Some(html[start..end].to_owned())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.0.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub store: MemoryStore,
    pub mailer: RecordingMailer,
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::default();
        let mut state = AppState::with_store(
            AppConfig::local("test-secret"),
            reqwest::Client::new(),
            Arc::new(store.clone()),
        )
        .unwrap();
        state.mailer = Arc::new(mailer.clone());
        let router = crate::router(state.clone());
        Self {
            store,
            mailer,
            state,
            router,
        }
    }

    /// A verified account and a bearer token for it.
    pub async fn user(&self, role: Role) -> (User, String) {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let user = self
            .store
            .insert_user(&User {
                id,
                email: format!("{id}@example.com"),
                name: "Tester".to_owned(),
                password_hash: hash_password(PASSWORD).unwrap(),
                role,
                email_verified_at: Some(now),
                two_factor_enabled: false,
                created_at: now,
            })
            .await
            .unwrap();
        let token = self.state.sessions.issue(&user, now).unwrap();
        (user, token)
    }

    pub async fn content(
        &self,
        kind: ContentKind,
        parent_id: Option<Uuid>,
        description: &str,
    ) -> Content {
        self.store
            .insert_content(&NewContent {
                id: Uuid::new_v4(),
                kind,
                parent_id,
                category_id: None,
                name: format!("{kind} name"),
                description: description.to_owned(),
                media_url: "https://img.example.com/cover.jpg".to_owned(),
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    /// Series, season and a playable published episode.
    pub async fn published_episode(&self, now: DateTime<Utc>) -> (Content, Content) {
        let series = self.content(ContentKind::Series, None, "A show").await;
        let season = self
            .content(ContentKind::Season, Some(series.id), "First season")
            .await;
        let episode = self
            .content(ContentKind::Episode, Some(season.id), "Pilot")
            .await;
        let asset = MediaAsset {
            asset_id: "asset".to_owned(),
            playback_id: "playback".to_owned(),
            duration_seconds: Some(60.0),
        };
        self.store
            .set_media_asset(episode.id, &asset, now)
            .await
            .unwrap();
        let episode = self
            .store
            .set_published(episode.id, Some(now), now)
            .await
            .unwrap()
            .unwrap();
        (series, episode)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH};
    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::datasource::{SubscriptionRepository, TokenRepository};
    use crate::models::{OneTimeToken, Subscription, SubscriptionStatus, TokenPurpose};

    async fn subscribe(app: &TestApp, user_id: Uuid, period_end: DateTime<Utc>) {
        app.store
            .upsert_subscription(&Subscription {
                id: Uuid::new_v4(),
                user_id,
                status: SubscriptionStatus::Active,
                tier: "standard".to_owned(),
                current_period_end: period_end,
                cancel_at_period_end: false,
                canceled_at: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let (status, body) = app.json(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["message"], "ok");
    }

    #[tokio::test]
    async fn test_expired_verification_code() {
        let app = TestApp::new();
        app.store
            .replace_token(&OneTimeToken {
                id: Uuid::new_v4(),
                purpose: TokenPurpose::Verification,
                email: "late@example.com".to_owned(),
                code: "424242".to_owned(),
                expires_at: Utc::now() - Duration::minutes(1),
            })
            .await
            .unwrap();
        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/verify",
                None,
                Some(json!({"email": "late@example.com", "code": "424242"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Token has expired"}));
    }

    #[tokio::test]
    async fn test_register_verify_and_login() {
        let app = TestApp::new();
        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"name": "New", "email": "new@example.com", "password": PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["data"].get("password_hash").is_none());

        let login = json!({"email": "new@example.com", "password": PASSWORD});
        let (status, body) = app
            .json(Method::POST, "/api/auth/login", None, Some(login.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Email not verified, confirmation email sent");

        let code = app.mailer.last_code_for("new@example.com").unwrap();
        let (status, _) = app
            .json(
                Method::POST,
                "/api/auth/verify",
                None,
                Some(json!({"email": "new@example.com", "code": code})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .json(Method::POST, "/api/auth/login", None, Some(login))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["token"].is_string());
    }

    #[tokio::test]
    async fn test_two_factor_confirmation_before_session() {
        let app = TestApp::new();
        let (user, token) = app.user(Role::User).await;
        let (status, body) = app
            .json(
                Method::PUT,
                "/api/auth/two-factor",
                Some(&token),
                Some(json!({"enabled": true})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["two_factor_enabled"], true);

        let login = json!({"email": user.email, "password": PASSWORD});
        let (status, body) = app
            .json(Method::POST, "/api/auth/login", None, Some(login.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"two_factor": true}));

        let code = app.mailer.last_code_for(&user.email).unwrap();
        let (status, _) = app
            .json(
                Method::POST,
                "/api/auth/two-factor/confirm",
                None,
                Some(json!({"email": user.email, "code": code})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .json(Method::POST, "/api/auth/login", None, Some(login))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["token"].is_string());
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        let app = TestApp::new();
        let (status, body) = app.json(Method::GET, "/api/playlists", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");

        let (status, body) = app
            .json(Method::GET, "/api/playlists", Some("garbage"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid session");
    }

    #[tokio::test]
    async fn test_non_admin_cannot_create_content() {
        let app = TestApp::new();
        let (_, token) = app.user(Role::User).await;
        let (status, body) = app
            .json(
                Method::POST,
                "/api/content/series",
                Some(&token),
                Some(json!({"name": "Show"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_publish_episode_missing_description() {
        let app = TestApp::new();
        let (_, token) = app.user(Role::Admin).await;
        let series = app.content(ContentKind::Series, None, "A show").await;
        let season = app
            .content(ContentKind::Season, Some(series.id), "Season")
            .await;
        let episode = app
            .content(ContentKind::Episode, Some(season.id), "")
            .await;

        let uri = format!("/api/content/episode/{}/publish", episode.id);
        let (status, body) = app.json(Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Missing fields are required");

        let uri = format!("/api/content/episode/{}", episode.id);
        let (status, body) = app.json(Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["is_published"], false);
    }

    #[tokio::test]
    async fn test_publish_series() {
        let app = TestApp::new();
        let (_, token) = app.user(Role::Admin).await;
        let (status, body) = app
            .json(
                Method::POST,
                "/api/content/series",
                Some(&token),
                Some(json!({
                    "name": "Show",
                    "description": "About things",
                    "media_url": "https://img.example.com/show.jpg"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_str().unwrap().to_owned();

        let (status, _) = app
            .json(Method::GET, &format!("/api/content/series/{id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/api/content/series/{id}/publish");
        let (status, body) = app.json(Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["is_published"], true);

        let (status, _) = app
            .json(Method::GET, &format!("/api/content/series/{id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_playback_follows_subscription_period() {
        let app = TestApp::new();
        let now = Utc::now();
        let (_, episode) = app.published_episode(now).await;
        let uri = format!("/api/episodes/{}/playback", episode.id);

        let (active, active_token) = app.user(Role::User).await;
        subscribe(&app, active.id, now + Duration::hours(1)).await;
        let (status, body) = app.json(Method::GET, &uri, Some(&active_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["playback_id"], "playback");

        let (lapsed, lapsed_token) = app.user(Role::User).await;
        subscribe(&app, lapsed.id, now - Duration::hours(1)).await;
        let (status, body) = app.json(Method::GET, &uri, Some(&lapsed_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "An active subscription is required");
    }

    #[tokio::test]
    async fn test_duplicate_playlist_item() {
        let app = TestApp::new();
        let (_, token) = app.user(Role::User).await;
        let series = app.content(ContentKind::Series, None, "A show").await;
        let (status, body) = app
            .json(
                Method::POST,
                "/api/playlists",
                Some(&token),
                Some(json!({"name": "Watch later"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let playlist = body["data"]["id"].as_str().unwrap().to_owned();

        let uri = format!("/api/playlists/{playlist}/content");
        let item = json!({"series_id": series.id});
        let (status, _) = app
            .json(Method::POST, &uri, Some(&token), Some(item.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = app.json(Method::POST, &uri, Some(&token), Some(item)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "This item is already in the playlist");

        let (_, body) = app.json(Method::GET, "/api/playlists", Some(&token), None).await;
        assert_eq!(body["data"][0]["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_watch_history_roundtrip() {
        let app = TestApp::new();
        let now = Utc::now();
        let (series, episode) = app.published_episode(now).await;
        let (_, token) = app.user(Role::User).await;
        let progress = json!({
            "series_id": series.id,
            "episode_id": episode.id,
            "position_seconds": 42.5
        });
        let (status, _) = app
            .json(Method::POST, "/api/watch-history", Some(&token), Some(progress))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = app
            .json(Method::GET, "/api/watch-history", Some(&token), None)
            .await;
        assert_eq!(body["data"][0]["position_seconds"], 42.5);
    }

    #[tokio::test]
    async fn test_cancel_subscription() {
        let app = TestApp::new();
        let (user, token) = app.user(Role::User).await;
        let (status, body) = app
            .json(Method::POST, "/api/subscription/cancel", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No subscription found");

        subscribe(&app, user.id, Utc::now() + Duration::days(3)).await;
        let (status, body) = app
            .json(Method::POST, "/api/subscription/cancel", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cancel_at_period_end"], true);
        let (_, body) = app
            .json(Method::GET, "/api/subscription", Some(&token), None)
            .await;
        assert_eq!(body["data"]["has_access"], true);
    }

    #[tokio::test]
    async fn test_upload_subtitle_track() {
        let app = TestApp::new();
        let (_, episode) = app.published_episode(Utc::now()).await;
        let (_, token) = app.user(Role::Admin).await;
        let boundary = "X-BOUNDARY";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"kind\"\r\n\r\nsubtitle\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"language\"\r\n\r\nen\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"pilot.vtt\"\r\n\
             Content-Type: text/vtt\r\n\r\nWEBVTT\r\n\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/episodes/{}/tracks", episode.id))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, bytes) = app.send(request).await;
        assert_eq!(status, StatusCode::CREATED);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["kind"], "subtitle");
        assert!(body["data"]["url"].as_str().unwrap().ends_with(".vtt"));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let app = TestApp::new();
        let (_, episode) = app.published_episode(Utc::now()).await;
        let (_, token) = app.user(Role::Admin).await;
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/episodes/{}/tracks", episode.id))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "multipart/form-data; boundary=X-BOUNDARY")
            .header(CONTENT_LENGTH, crate::UPLOAD_BODY_LIMIT + 1)
            .body(Body::empty())
            .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_bandwidth_payload() {
        let app = TestApp::new();
        let request = Request::builder()
            .uri("/api/bandwidth-test?bytes=2048")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/octet-stream");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 2048);
    }

    #[tokio::test]
    async fn test_delete_referenced_category() {
        let app = TestApp::new();
        let (_, token) = app.user(Role::Admin).await;
        let (_, body) = app
            .json(
                Method::POST,
                "/api/categories",
                Some(&token),
                Some(json!({"name": "Drama"})),
            )
            .await;
        let category = body["data"]["id"].as_str().unwrap().to_owned();
        let (status, _) = app
            .json(
                Method::POST,
                "/api/content/series",
                Some(&token),
                Some(json!({"name": "Show", "category_id": category})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/categories/{category}");
        let (status, body) = app.json(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Category is in use by one or more series");
    }
}
