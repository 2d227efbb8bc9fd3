#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use notes_api::auth::{Authenticator, JwtVerifier, SessionClaims};
use notes_api::config::{AppConfig, StoreBackend};
use notes_api::database::MemoryStore;
use notes_api::server;
use notes_api::state::AppState;

pub const SECRET: &str = "integration-test-secret";

/// Router over a fresh in-memory store, accepting HS256 tokens signed
/// with [`SECRET`].
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let auth = Authenticator::new(Arc::new(JwtVerifier::with_secret(SECRET)), None);
        let state = AppState::new(config, store.clone(), auth);
        let router = server::app(state.clone());
        Self { router, store, state }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };
        Ok((status, body))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn create_note(&self, token: &str, title: &str, content: &str) -> Result<Value> {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/notes",
                Some(token),
                Some(serde_json::json!({ "title": title, "content": content })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create failed: {} {}", status, body);
        Ok(body)
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.backend = StoreBackend::Memory;
    config.security.identity.jwt_secret = Some(SECRET.to_string());
    config
}

/// Token for `sub`, valid for five minutes.
pub fn token(sub: &str) -> String {
    sign(&SessionClaims::for_subject(sub, 300))
}

pub fn sign(claims: &SessionClaims) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("sign test token")
}
