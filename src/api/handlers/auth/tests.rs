//! Handler tests driven through the router with `oneshot`.

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE},
        HeaderMap, Request, StatusCode,
    },
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use super::{login, require_session, session};
use crate::api::{GatewaySettings, GatewayState};
use crate::audit::{AccessRecorder, AuditLogger};
use crate::credentials::CredentialStore;
use crate::gateway::AccessKeyGateway;
use crate::geo::GeoResolver;
use crate::session::{AuthMethod, SessionManager};

fn digest(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

async fn guarded(headers: HeaderMap, state: Extension<Arc<GatewayState>>) -> impl IntoResponse {
    match require_session(&headers, &state).await {
        Ok(session) => (StatusCode::OK, session.subject).into_response(),
        Err(status) => status.into_response(),
    }
}

struct Fixture {
    _dir: TempDir,
    state: Arc<GatewayState>,
}

impl Fixture {
    async fn new(with_access_key: bool) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let audit = Arc::new(AuditLogger::open(dir.path()).await?);
        let geo = Arc::new(GeoResolver::new("http://127.0.0.1:9", Duration::from_millis(200))?);
        let recorder = AccessRecorder::new(audit, geo);
        let sessions = Arc::new(SessionManager::new(chrono::Duration::seconds(60)));
        let mut state = GatewayState::new(
            sessions.clone(),
            recorder.clone(),
            GatewaySettings::new("http://localhost:7860/", "/"),
        );
        if with_access_key {
            let store = CredentialStore::from_json(
                &json!(["admin"]).to_string(),
                &json!([digest("hello")]).to_string(),
            );
            state = state.with_access_key(AccessKeyGateway::new(store, sessions, recorder));
        }
        Ok(Self {
            _dir: dir,
            state: Arc::new(state),
        })
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/login", post(login::login))
            .route("/logout", post(session::logout))
            .route("/guarded", get(guarded))
            .layer(Extension(self.state.clone()))
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
    }
}

fn login_request(body: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri("/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?)
}

#[tokio::test]
async fn login_sets_http_only_cookie() -> Result<()> {
    let fixture = Fixture::new(true).await?;
    let body = json!({"username": "admin", "hashedPassword": digest("hello")}).to_string();
    let response = fixture.router().oneshot(login_request(&body)?).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("tutorgate_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=60"));
    assert!(!cookie.contains("Secure"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let payload: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(payload["user"], "admin");
    Ok(())
}

#[tokio::test]
async fn login_disabled_is_not_found() -> Result<()> {
    let fixture = Fixture::new(false).await?;
    let body = json!({"username": "admin", "hashedPassword": digest("hello")}).to_string();
    let response = fixture.router().oneshot(login_request(&body)?).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_rejected_without_session() -> Result<()> {
    let fixture = Fixture::new(true).await?;
    let response = fixture
        .router()
        .oneshot(login_request(r#"{"username": "admin"}"#)?)
        .await?;
    assert!(response.status().is_client_error());
    assert!(fixture.state.sessions().is_empty().await);
    Ok(())
}

#[tokio::test]
async fn require_session_guards_routes() -> Result<()> {
    let fixture = Fixture::new(true).await?;
    let anonymous = fixture
        .router()
        .oneshot(Request::builder().uri("/guarded").body(Body::empty())?)
        .await?;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let forged = fixture
        .router()
        .oneshot(
            Request::builder()
                .uri("/guarded")
                .header(COOKIE, "tutorgate_session=forged")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

    let live = fixture
        .state
        .sessions()
        .create("ada@example.com", AuthMethod::OAuth)
        .await?;
    let allowed = fixture
        .router()
        .oneshot(
            Request::builder()
                .uri("/guarded")
                .header(AUTHORIZATION, format!("Bearer {}", live.token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(allowed.status(), StatusCode::OK);
    let bytes = to_bytes(allowed.into_body(), usize::MAX).await?;
    assert_eq!(&bytes[..], b"ada@example.com");
    Ok(())
}

#[tokio::test]
async fn logout_without_session_still_clears_cookie() -> Result<()> {
    let fixture = Fixture::new(true).await?;
    let response = fixture
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.contains("Max-Age=0"));
    Ok(())
}
