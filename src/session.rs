use crate::{
    error::{DynRestError, DynRestResult},
    storage::{TokenStorage, REFRESH_TOKEN_KEY},
};
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::sync::{Arc, RwLock};

/// Session token state shared by the transport and the auth module.
///
/// Only [`Session::set_token`] and [`Session::clear`] write the token. The
/// lock is never held across an await point.
pub struct Session {
    token: RwLock<Option<String>>,
    storage: Arc<dyn TokenStorage>,
    storage_key: String,
}

impl Session {
    /// Start a session from an explicit token, or from storage when none is given
    pub fn new(
        token: Option<String>,
        storage: Arc<dyn TokenStorage>,
        storage_key: impl Into<String>,
    ) -> Self {
        let storage_key = storage_key.into();
        let token = token.or_else(|| storage.get(&storage_key));
        Self {
            token: RwLock::new(token),
            storage,
            storage_key,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn storage(&self) -> &Arc<dyn TokenStorage> {
        &self.storage
    }

    /// Replace the token; with `persist` the stored copy is written or removed too
    pub fn set_token(&self, token: Option<String>, persist: bool) -> DynRestResult<()> {
        let mut current = self
            .token
            .write()
            .map_err(|_| DynRestError::storage_error("session lock poisoned"))?;
        if persist {
            match &token {
                Some(t) => self.storage.set(&self.storage_key, t)?,
                None => self.storage.remove(&self.storage_key)?,
            }
        }
        debug!("Session token {}", if token.is_some() { "set" } else { "cleared" });
        *current = token;
        Ok(())
    }

    /// Drop the token from memory and both persisted keys under one write lock.
    /// Clearing an already cleared session is a no-op.
    pub fn clear(&self) {
        let mut current = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = None;
        for key in [self.storage_key.as_str(), REFRESH_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!("Failed to remove {} from token storage: {}", key, e);
            }
        }
    }

    /// Apply bearer authentication to the request headers
    pub fn apply_auth(&self, headers: &mut HeaderMap) -> DynRestResult<()> {
        if let Some(token) = self.token() {
            let auth_value = format!("Bearer {}", token);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| DynRestError::InvalidHeader(format!("Invalid auth header: {}", e)))?,
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.token().is_some())
            .field("storage_key", &self.storage_key)
            .finish()
    }
}
