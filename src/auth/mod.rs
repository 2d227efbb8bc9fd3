//! Identity verification against the external identity provider.
//!
//! A request token is first verified cryptographically ([`TokenVerifier`]);
//! the verified subject may then be enriched with profile data from the
//! provider's user API ([`UserDirectory`]).

pub mod claims;
pub mod directory;
pub mod jwks;
pub mod jwt;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::IdentityConfig;

pub use claims::SessionClaims;
pub use directory::{DirectoryProfile, HttpUserDirectory, UserDirectory};
pub use jwt::JwtVerifier;

/// The caller as established by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
}

impl Identity {
    /// Overlay profile data from the user directory. Directory values win
    /// over token claims; absent directory values keep the claim.
    pub fn merge(&mut self, profile: DirectoryProfile) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.email, profile.email);
        take(&mut self.name, profile.name);
        take(&mut self.first_name, profile.first_name);
        take(&mut self.last_name, profile.last_name);
        take(&mut self.image_url, profile.image_url);
        take(&mut self.provider, profile.provider);
        take(&mut self.provider_id, profile.provider_id);
    }

    /// Display name: explicit `name`, else first and last name joined.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_ref().filter(|n| !n.trim().is_empty()) {
            return Some(name.clone());
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredentials,

    #[error("Authorization header must use Bearer token format")]
    MalformedHeader,

    #[error("No token verification key configured (set IDENTITY_JWKS_URL or IDENTITY_JWT_SECRET)")]
    NotConfigured,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Token header has no key id")]
    MissingKeyId,

    #[error("No signing key with id '{0}'")]
    UnknownKey(String),

    #[error("Token was issued for an unauthorized party")]
    UnauthorizedParty,

    #[error("Identity provider request failed: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("Identity provider rejected user lookup with status {0}")]
    LookupRejected(u16),
}

/// Cryptographic verification of a session token.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Verifies a token and, when configured, enriches the identity from the
/// provider's user directory.
#[derive(Clone)]
pub struct Authenticator {
    verifier: Arc<dyn TokenVerifier>,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl Authenticator {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        directory: Option<Arc<dyn UserDirectory>>,
    ) -> Self {
        Self { verifier, directory }
    }

    /// Wire up the verifier and directory described by `config`.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let verifier = JwtVerifier::from_config(config, http.clone())?;
        let directory = config.secret_key.as_ref().map(|secret| {
            Arc::new(HttpUserDirectory::new(http, &config.api_url, secret)) as Arc<dyn UserDirectory>
        });

        Ok(Self::new(Arc::new(verifier), directory))
    }

    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let mut identity = self.verifier.verify(token).await?;
        if let Some(directory) = &self.directory {
            let profile = directory.lookup(&identity.subject).await?;
            identity.merge(profile);
        }
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedVerifier(Identity);

    #[async_trait]
    impl TokenVerifier for FixedVerifier {
        async fn verify(&self, _token: &str) -> Result<Identity, AuthError> {
            Ok(self.0.clone())
        }
    }

    struct FixedDirectory(Result<DirectoryProfile, u16>);

    #[async_trait]
    impl UserDirectory for FixedDirectory {
        async fn lookup(&self, _subject: &str) -> Result<DirectoryProfile, AuthError> {
            self.0.clone().map_err(AuthError::LookupRejected)
        }
    }

    fn identity() -> Identity {
        Identity {
            subject: "user_1".into(),
            email: Some("claim@example.com".into()),
            name: Some("Claim Name".into()),
            ..Default::default()
        }
    }

    #[test]
    fn display_name_falls_back_to_parts() {
        let mut id = Identity {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            ..Default::default()
        };
        assert_eq!(id.display_name().as_deref(), Some("Ada Lovelace"));

        id.last_name = None;
        assert_eq!(id.display_name().as_deref(), Some("Ada"));

        id.first_name = None;
        assert_eq!(id.display_name(), None);
    }

    #[tokio::test]
    async fn directory_profile_overrides_claims() {
        let auth = Authenticator::new(
            Arc::new(FixedVerifier(identity())),
            Some(Arc::new(FixedDirectory(Ok(DirectoryProfile {
                email: Some("primary@example.com".into()),
                provider: Some("oauth_github".into()),
                ..Default::default()
            })))),
        );
        let id = auth.authenticate("token").await.unwrap();
        assert_eq!(id.email.as_deref(), Some("primary@example.com"));
        assert_eq!(id.name.as_deref(), Some("Claim Name"));
        assert_eq!(id.provider.as_deref(), Some("oauth_github"));
    }

    #[tokio::test]
    async fn directory_failure_rejects() {
        let auth = Authenticator::new(
            Arc::new(FixedVerifier(identity())),
            Some(Arc::new(FixedDirectory(Err(404)))),
        );
        assert!(matches!(
            auth.authenticate("token").await,
            Err(AuthError::LookupRejected(404))
        ));
    }

    #[test]
    fn from_config_requires_a_key() {
        let config = IdentityConfig::default();
        assert!(matches!(
            Authenticator::from_config(&config),
            Err(AuthError::NotConfigured)
        ));
    }
}
