use async_trait::async_trait;
use serde::Deserialize;

use super::AuthError;

/// Profile fields the identity provider knows about a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryProfile {
    pub email: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
}

/// Server-side user lookup at the identity provider.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup(&self, subject: &str) -> Result<DirectoryProfile, AuthError>;
}

/// `GET {api_url}/v1/users/{id}` authenticated with the provider secret key.
pub struct HttpUserDirectory {
    http: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl HttpUserDirectory {
    pub fn new(http: reqwest::Client, api_url: &str, secret_key: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn lookup(&self, subject: &str) -> Result<DirectoryProfile, AuthError> {
        let mut url = url::Url::parse(&self.api_url).map_err(|_| AuthError::NotConfigured)?;
        url.path_segments_mut()
            .map_err(|_| AuthError::NotConfigured)?
            .extend(["v1", "users", subject]);

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::LookupRejected(response.status().as_u16()));
        }

        let user: ProviderUser = response.json().await?;
        Ok(user.into())
    }
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    id: String,
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct ExternalAccount {
    provider: Option<String>,
    provider_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    primary_email_address_id: Option<String>,
    image_url: Option<String>,
    profile_image_url: Option<String>,
    #[serde(default)]
    external_accounts: Vec<ExternalAccount>,
}

impl From<ProviderUser> for DirectoryProfile {
    fn from(user: ProviderUser) -> Self {
        let primary = user
            .primary_email_address_id
            .as_ref()
            .and_then(|id| user.email_addresses.iter().find(|e| &e.id == id))
            .or_else(|| user.email_addresses.first())
            .map(|e| e.email_address.clone());

        let name = match (user.first_name.as_deref(), user.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last).trim().to_string()),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        }
        .filter(|n| !n.is_empty());

        let account = user.external_accounts.into_iter().next();

        Self {
            email: primary,
            name,
            first_name: user.first_name,
            last_name: user.last_name,
            image_url: user.image_url.or(user.profile_image_url),
            provider: account.as_ref().and_then(|a| a.provider.clone()),
            provider_id: account.and_then(|a| a.provider_user_id),
        }
    }
}
