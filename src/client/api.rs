use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use super::ClientError;
use crate::database::models::{Note, UserProfile};

/// Supplies the identity-provider session token for outgoing requests.
///
/// `None` means the sign-in has not produced a token yet.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Option<String>;
}

/// A token known up front, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// How long a list fetch waits for a token to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
struct NoteDraft<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct NotesClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    retry: RetryPolicy,
}

impl NotesClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenSource>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Self::with_http(http, base_url, tokens)
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: &str,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            tokens,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.request(Method::GET, "/health").send().await?;
        decode(response).await
    }

    /// Fetch the caller's notes, newest first.
    ///
    /// Waits for the token source according to the retry policy; once a
    /// token is available the request is sent exactly once.
    pub async fn list_notes(&self) -> Result<Vec<Note>, ClientError> {
        let token = self.wait_for_token().await?;
        let response = self
            .request(Method::GET, "/api/notes")
            .bearer_auth(token)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn create_note(&self, title: &str, content: &str) -> Result<Note, ClientError> {
        let draft = NoteDraft {
            title: Some(title),
            content: Some(content),
        };
        let response = self
            .authorized(Method::POST, "/api/notes")
            .await?
            .json(&draft)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn update_note(
        &self,
        id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Note, ClientError> {
        let draft = NoteDraft { title, content };
        let response = self
            .authorized(Method::PUT, &format!("/api/notes/{}", id))
            .await?
            .json(&draft)
            .send()
            .await?;
        decode(response).await
    }

    /// Returns the server's confirmation message.
    pub async fn delete_note(&self, id: Uuid) -> Result<String, ClientError> {
        let response = self
            .authorized(Method::DELETE, &format!("/api/notes/{}", id))
            .await?
            .send()
            .await?;
        let body: MessageBody = decode(response).await?;
        Ok(body.message)
    }

    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        let response = self
            .authorized(Method::GET, "/api/user/profile")
            .await?
            .send()
            .await?;
        decode(response).await
    }

    async fn wait_for_token(&self) -> Result<String, ClientError> {
        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(token) = self.tokens.token().await {
                return Ok(token);
            }
            if attempt < attempts {
                tracing::debug!(
                    "No session token yet (attempt {}/{}), retrying in {:?}",
                    attempt,
                    attempts,
                    self.retry.backoff
                );
                tokio::time::sleep(self.retry.backoff).await;
            }
        }
        Err(ClientError::NotSignedIn)
    }

    async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.tokens.token().await.ok_or(ClientError::NotSignedIn)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Hands out a token only after `ready_after` calls.
    struct SlowToken {
        calls: AtomicU32,
        ready_after: u32,
    }

    #[async_trait]
    impl TokenSource for SlowToken {
        async fn token(&self) -> Option<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            (call > self.ready_after).then(|| "token".to_string())
        }
    }

    fn client(tokens: Arc<dyn TokenSource>, attempts: u32) -> NotesClient {
        NotesClient::new("http://127.0.0.1:9/", tokens)
            .unwrap()
            .with_retry(RetryPolicy {
                attempts,
                backoff: Duration::from_millis(1),
            })
    }

    #[test]
    fn normalizes_base_url() {
        let client = client(Arc::new(StaticToken::default()), 1);
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
        assert!(NotesClient::new("not a url", Arc::new(StaticToken::default())).is_err());
    }

    #[tokio::test]
    async fn waits_for_token_within_attempts() {
        let tokens = Arc::new(SlowToken {
            calls: AtomicU32::new(0),
            ready_after: 2,
        });
        let client = client(tokens.clone(), 3);

        assert_eq!(client.wait_for_token().await.unwrap(), "token");
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempts() {
        let tokens = Arc::new(SlowToken {
            calls: AtomicU32::new(0),
            ready_after: 10,
        });
        let client = client(tokens.clone(), 3);

        assert!(matches!(client.wait_for_token().await, Err(ClientError::NotSignedIn)));
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn mutations_do_not_wait_for_token() {
        let client = client(Arc::new(StaticToken(None)), 3);
        let err = client.create_note("t", "c").await.unwrap_err();
        assert!(matches!(err, ClientError::NotSignedIn));
    }
}
