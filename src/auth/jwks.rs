use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::AuthError;

/// Unknown key ids trigger at most one refetch per interval.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Default)]
struct KeySet {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Option<Instant>,
}

/// Signing keys published by the identity provider, cached by key id.
pub struct JwksCache {
    url: String,
    http: reqwest::Client,
    state: RwLock<KeySet>,
}

impl JwksCache {
    pub fn new(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            http,
            state: RwLock::new(KeySet::default()),
        }
    }

    /// Decoding key for `kid`, refetching the key set if the id is unknown.
    pub async fn key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.state.read().await.keys.get(kid) {
            return Ok(key.clone());
        }

        let mut state = self.state.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(key) = state.keys.get(kid) {
            return Ok(key.clone());
        }
        let recently = state
            .fetched_at
            .map(|at| at.elapsed() < MIN_REFRESH_INTERVAL)
            .unwrap_or(false);
        if !recently {
            state.keys = self.fetch().await?;
            state.fetched_at = Some(Instant::now());
        }

        state
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }

    async fn fetch(&self) -> Result<HashMap<String, DecodingKey>, AuthError> {
        let set: JwkSet = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut keys = HashMap::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => tracing::warn!("Skipping unusable JWK '{}': {}", kid, e),
            }
        }

        tracing::debug!("Fetched {} signing keys from {}", keys.len(), self.url);
        Ok(keys)
    }
}
