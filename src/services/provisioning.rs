use crate::auth::Identity;
use crate::config::IdentityConfig;
use crate::database::models::{UpsertUser, User};
use crate::database::{store, StoreError, UserStore};

/// Turns a verified identity into the local user row, creating it on first
/// sight and refreshing it afterwards.
pub struct Provisioner<'a, S: UserStore + ?Sized> {
    users: &'a S,
    config: &'a IdentityConfig,
}

impl<'a, S: UserStore + ?Sized> Provisioner<'a, S> {
    pub fn new(users: &'a S, config: &'a IdentityConfig) -> Self {
        Self { users, config }
    }

    pub async fn provision(&self, identity: &Identity) -> Result<User, StoreError> {
        let upsert = self.upsert_for(identity);
        let user = self.users.upsert_user(upsert).await?;
        tracing::debug!("Provisioned user {}", user.id);
        Ok(user)
    }

    pub fn upsert_for(&self, identity: &Identity) -> UpsertUser {
        UpsertUser {
            id: identity.subject.clone(),
            email: identity.email.clone(),
            placeholder_email: self.placeholder_email(&identity.subject),
            name: identity.display_name(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            image_url: identity.image_url.clone(),
            provider: identity.provider.clone(),
            provider_id: identity.provider_id.clone(),
            signed_in_at: store::now(),
        }
    }

    /// `<subject>@<domain>`, with anything outside `[A-Za-z0-9._-]` in the
    /// subject replaced so the result is a well-formed address.
    fn placeholder_email(&self, subject: &str) -> String {
        let local: String = subject
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}@{}", local, self.config.placeholder_email_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[test]
    fn builds_placeholder_email() {
        let store = MemoryStore::new();
        let config = IdentityConfig::default();
        let provisioner = Provisioner::new(&store, &config);
        assert_eq!(
            provisioner.placeholder_email("user_2abc|x"),
            "user_2abc_x@no-email.local"
        );
    }

    #[tokio::test]
    async fn provisions_from_identity() {
        let store = MemoryStore::new();
        let config = IdentityConfig::default();
        let provisioner = Provisioner::new(&store, &config);

        let identity = Identity {
            subject: "user_1".into(),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            provider: Some("oauth_google".into()),
            ..Default::default()
        };

        let user = provisioner.provision(&identity).await.unwrap();
        assert_eq!(user.id, "user_1");
        assert_eq!(user.email, "user_1@no-email.local");
        assert_eq!(user.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(user.provider.as_deref(), Some("oauth_google"));
        assert_eq!(user.provider_id.as_deref(), Some("user_1"));
    }
}
