use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use super::claims::SessionClaims;
use super::jwks::JwksCache;
use super::{AuthError, Identity, TokenVerifier};
use crate::config::IdentityConfig;

enum Keys {
    /// RS256 keys from the provider's JWKS endpoint.
    Jwks(JwksCache),
    /// HS256 shared secret, for development and tests.
    Secret(DecodingKey),
}

/// Verifies provider session tokens by signature, expiry, and optionally
/// issuer and authorized party.
pub struct JwtVerifier {
    keys: Keys,
    issuer: Option<String>,
    authorized_parties: Vec<String>,
}

impl JwtVerifier {
    pub fn from_config(config: &IdentityConfig, http: reqwest::Client) -> Result<Self, AuthError> {
        let keys = if let Some(url) = &config.jwks_url {
            Keys::Jwks(JwksCache::new(url.clone(), http))
        } else if let Some(secret) = &config.jwt_secret {
            Keys::Secret(DecodingKey::from_secret(secret.as_bytes()))
        } else {
            return Err(AuthError::NotConfigured);
        };

        Ok(Self {
            keys,
            issuer: config.issuer.clone(),
            authorized_parties: config.authorized_parties.clone(),
        })
    }

    pub fn with_secret(secret: &str) -> Self {
        Self {
            keys: Keys::Secret(DecodingKey::from_secret(secret.as_bytes())),
            issuer: None,
            authorized_parties: Vec::new(),
        }
    }

    pub fn with_jwks(cache: JwksCache) -> Self {
        Self {
            keys: Keys::Jwks(cache),
            issuer: None,
            authorized_parties: Vec::new(),
        }
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn authorized_parties(mut self, parties: Vec<String>) -> Self {
        self.authorized_parties = parties;
        self
    }

    async fn key_for(&self, token: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        let header = decode_header(token)?;
        match &self.keys {
            Keys::Secret(key) => Ok((key.clone(), Algorithm::HS256)),
            Keys::Jwks(cache) => {
                let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
                Ok((cache.key(&kid).await?, Algorithm::RS256))
            }
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let (key, algorithm) = self.key_for(token).await?;

        // Validation pins the algorithm, so a token whose header claims a
        // different one fails here.
        let mut validation = Validation::new(algorithm);
        validation.validate_nbf = true;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let claims = decode::<SessionClaims>(token, &key, &validation)?.claims;

        if !self.authorized_parties.is_empty() {
            let allowed = claims
                .azp
                .as_ref()
                .map(|azp| self.authorized_parties.iter().any(|p| p == azp))
                .unwrap_or(false);
            if !allowed {
                return Err(AuthError::UnauthorizedParty);
            }
        }

        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken(
                jsonwebtoken::errors::ErrorKind::InvalidSubject.into(),
            ));
        }

        Ok(Identity::from(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-identity-secret";

    fn sign(claims: &SessionClaims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let mut claims = SessionClaims::for_subject("user_123", 300);
        claims.email = Some("test@example.com".into());
        let identity = JwtVerifier::with_secret(SECRET)
            .verify(&sign(&claims, SECRET))
            .await
            .unwrap();
        assert_eq!(identity.subject, "user_123");
        assert_eq!(identity.email.as_deref(), Some("test@example.com"));
    }

    #[tokio::test]
    async fn rejects_wrong_secret() {
        let token = sign(&SessionClaims::for_subject("user_123", 300), "secret-1");
        let result = JwtVerifier::with_secret("secret-2").verify(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let token = sign(&SessionClaims::for_subject("user_123", -3600), SECRET);
        let result = JwtVerifier::with_secret(SECRET).verify(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn rejects_unsigned_payload() {
        // header.payload with an empty signature must never be accepted
        let token = sign(&SessionClaims::for_subject("user_123", 300), SECRET);
        let unsigned = format!("{}.", token.rsplit_once('.').unwrap().0);
        let result = JwtVerifier::with_secret(SECRET).verify(&unsigned).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn enforces_issuer() {
        let mut claims = SessionClaims::for_subject("user_123", 300);
        claims.iss = Some("https://other.example".into());
        let verifier = JwtVerifier::with_secret(SECRET).issuer("https://clerk.example");
        assert!(verifier.verify(&sign(&claims, SECRET)).await.is_err());

        claims.iss = Some("https://clerk.example".into());
        assert!(verifier.verify(&sign(&claims, SECRET)).await.is_ok());
    }

    #[tokio::test]
    async fn enforces_authorized_parties() {
        let verifier = JwtVerifier::with_secret(SECRET)
            .authorized_parties(vec!["https://notes.example.com".into()]);

        let mut claims = SessionClaims::for_subject("user_123", 300);
        assert!(matches!(
            verifier.verify(&sign(&claims, SECRET)).await,
            Err(AuthError::UnauthorizedParty)
        ));

        claims.azp = Some("https://evil.example".into());
        assert!(matches!(
            verifier.verify(&sign(&claims, SECRET)).await,
            Err(AuthError::UnauthorizedParty)
        ));

        claims.azp = Some("https://notes.example.com".into());
        assert!(verifier.verify(&sign(&claims, SECRET)).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let result = JwtVerifier::with_secret(SECRET).verify("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }
}
