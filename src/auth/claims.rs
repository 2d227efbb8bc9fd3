use serde::{Deserialize, Serialize};

use super::Identity;

/// Claims carried by an identity-provider session token.
///
/// Only `sub` and `exp` are required; the profile claims are present when the
/// provider's session template includes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Authorized party: the origin the session was created for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "given_name", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, alias = "family_name", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, alias = "picture", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_provider_id: Option<String>,
}

impl SessionClaims {
    /// Claims for `sub` expiring `ttl_secs` from now.
    pub fn for_subject(sub: impl Into<String>, ttl_secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: sub.into(),
            exp: now + ttl_secs,
            iat: Some(now),
            ..Default::default()
        }
    }
}

impl From<SessionClaims> for Identity {
    fn from(claims: SessionClaims) -> Self {
        Self {
            subject: claims.sub,
            email: claims.email.filter(|e| !e.trim().is_empty()),
            name: claims.name,
            first_name: claims.first_name,
            last_name: claims.last_name,
            image_url: claims.image_url,
            provider: claims.oauth_provider,
            provider_id: claims.oauth_provider_id,
        }
    }
}
