use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::ClientError;

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionData {
    token: Option<String>,
    started_at: Option<DateTime<Utc>>,
    /// Keyed `<namespace>.<name>`.
    #[serde(default)]
    flags: BTreeMap<String, bool>,
}

/// State scoped to one sign-in: the session token and one-shot UI flags
/// such as whether the welcome message was already shown.
///
/// Starting a session wipes every flag from the previous one.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    data: SessionData,
}

impl SessionStore {
    pub fn open(dir: &Path) -> Result<Self, ClientError> {
        let path = dir.join(SESSION_FILE);
        let data = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            SessionData::default()
        };
        Ok(Self { path, data })
    }

    pub fn token(&self) -> Option<&str> {
        self.data.token.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.data.token.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.data.started_at
    }

    pub fn start(&mut self, token: impl Into<String>) -> Result<(), ClientError> {
        self.data = SessionData {
            token: Some(token.into()),
            started_at: Some(Utc::now()),
            flags: BTreeMap::new(),
        };
        self.save()
    }

    pub fn clear(&mut self) -> Result<(), ClientError> {
        self.data = SessionData::default();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn flag(&self, namespace: &str, name: &str) -> bool {
        self.data
            .flags
            .get(&flag_key(namespace, name))
            .copied()
            .unwrap_or(false)
    }

    pub fn set_flag(&mut self, namespace: &str, name: &str, value: bool) -> Result<(), ClientError> {
        if !self.is_active() {
            return Err(ClientError::NotSignedIn);
        }
        self.data.flags.insert(flag_key(namespace, name), value);
        self.save()
    }

    /// Returns true exactly once per session for each flag.
    pub fn first_time(&mut self, namespace: &str, name: &str) -> Result<bool, ClientError> {
        if !self.is_active() || self.flag(namespace, name) {
            return Ok(false);
        }
        self.set_flag(namespace, name, true)?;
        Ok(true)
    }

    fn save(&self) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.data)?)?;
        Ok(())
    }
}

fn flag_key(namespace: &str, name: &str) -> String {
    format!("{}.{}", namespace, name)
}
