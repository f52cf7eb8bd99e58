use crate::errors::StorageError;
use crate::storage::KeyValueStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub const SESSIONS_KEY: &str = "sessionTokens";
pub const SELECTED_RESPONSIBLES_KEY: &str = "selectedResponsibles";
pub const INVALID_LOGIN_MESSAGE: &str = "Неверный логин или пароль";

/// Oldest tokens are dropped past this many live sessions.
const MAX_SESSIONS: usize = 32;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Login gate and per-dashboard selections, kept in the key-value store.
/// Every successful login gets its own bearer token, so one client's login or
/// logout never changes another's.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    credentials: Credentials,
    tokens_lock: Arc<Mutex<()>>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>, credentials: Credentials) -> Self {
        Self {
            store,
            credentials,
            tokens_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn is_authenticated(&self, token: Option<&str>) -> bool {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => self.tokens().await.iter().any(|known| known == token),
            None => false,
        }
    }

    /// A fresh token on matching credentials. A failed attempt leaves every
    /// existing session alone.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<String>, StorageError> {
        if username != self.credentials.username || password != self.credentials.password {
            warn!("rejected dashboard login for {username}");
            return Ok(None);
        }

        let token = Uuid::new_v4().to_string();
        let _guard = self.tokens_lock.lock().await;
        let mut tokens = self.tokens().await;
        tokens.push(token.clone());
        let excess = tokens.len().saturating_sub(MAX_SESSIONS);
        tokens.drain(..excess);
        self.store_tokens(&tokens).await?;
        info!("dashboard login for {username}");
        Ok(Some(token))
    }

    pub async fn logout(&self, token: &str) -> Result<(), StorageError> {
        let _guard = self.tokens_lock.lock().await;
        let mut tokens = self.tokens().await;
        let before = tokens.len();
        tokens.retain(|known| known != token.trim());
        if tokens.len() != before {
            self.store_tokens(&tokens).await?;
        }
        Ok(())
    }

    async fn tokens(&self) -> Vec<String> {
        let Some(raw) = self.store.get(SESSIONS_KEY).await else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("stored sessions are unreadable: {err}");
            Vec::new()
        })
    }

    async fn store_tokens(&self, tokens: &[String]) -> Result<(), StorageError> {
        self.store.set(SESSIONS_KEY, serde_json::to_string(tokens)?).await
    }

    /// Ids picked for multi-person views; a missing or corrupt value reads as
    /// empty, and non-positive ids are skipped.
    pub async fn selected_responsibles(&self) -> Vec<i64> {
        let Some(raw) = self.store.get(SELECTED_RESPONSIBLES_KEY).await else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(values) => values
                .iter()
                .filter_map(|value| crate::normalize::normalize_id(Some(value)))
                .filter(|id| *id > 0)
                .collect(),
            Err(err) => {
                warn!("stored responsible selection is unreadable: {err}");
                Vec::new()
            }
        }
    }

    pub async fn set_selected_responsibles(&self, ids: &[i64]) -> Result<Vec<i64>, StorageError> {
        let mut seen = HashSet::new();
        let ids: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| *id > 0 && seen.insert(*id))
            .collect();
        self.store
            .set(SELECTED_RESPONSIBLES_KEY, serde_json::to_string(&ids)?)
            .await?;
        Ok(ids)
    }
}
