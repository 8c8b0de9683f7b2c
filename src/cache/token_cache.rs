use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::token::AccessToken;
use crate::credentials::{CredentialKind, CredentialProvider};
use crate::error::{Error, Result};
use crate::helpers::time::{now_i64, unix_to_rfc3339};
use crate::observability::metrics::get_metrics;

struct Cached {
    token: AccessToken,
    refresh_at: i64,
}

type Slot = Arc<Mutex<Option<Cached>>>;

/// Per-scope token cache in front of a [`CredentialProvider`].
///
/// Each scope owns a slot guarded by an async mutex that is held across the refresh, so
/// concurrent callers for one scope share a single round-trip to the identity backend.
pub struct TokenCache<P = CredentialKind> {
    provider: P,
    slots: RwLock<HashMap<String, Slot>>,
    safety_margin_seconds: u64,
}

impl<P: CredentialProvider> TokenCache<P> {
    pub fn new(provider: P, safety_margin_seconds: u64) -> Self {
        Self {
            provider,
            slots: RwLock::new(HashMap::new()),
            safety_margin_seconds,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// A token for `scope` that is not due for refresh, acquiring one when needed.
    pub async fn current(&self, scope: &str) -> Result<AccessToken> {
        let slot = self.slot(scope).await;
        let mut cached = slot.lock().await;
        let metrics = get_metrics().await;

        if let Some(entry) = cached
            .as_ref()
            .filter(|c| now_i64() < c.refresh_at && !c.token.is_expired())
        {
            metrics.token_cache_hits.inc();
            return Ok(entry.token.clone());
        }
        // never hand out what we had if the refresh below fails
        *cached = None;

        let kind = self.provider.kind();
        match self.provider.get_token(scope).await {
            Ok(token) => {
                metrics.token_acquisitions.with_label_values(&[kind, "success"]).inc();
                info!(
                    scope,
                    credential = kind,
                    token = %token.redacted(),
                    expires_at = %unix_to_rfc3339(token.expires_at()),
                    "access token acquired"
                );
                *cached = Some(Cached {
                    refresh_at: token.refresh_at(self.safety_margin_seconds),
                    token: token.clone(),
                });
                Ok(token)
            }
            Err(e) => {
                metrics.token_acquisitions.with_label_values(&[kind, "failure"]).inc();
                warn!(scope, credential = kind, "access token acquisition failed: {}", e);
                Err(Error::authentication(scope, e))
            }
        }
    }

    /// Drop every cached token; the next `current` call acquires a fresh one.
    pub async fn invalidate(&self) {
        let slots: Vec<Slot> = self.slots.read().await.values().cloned().collect();
        for slot in slots {
            *slot.lock().await = None;
        }
        debug!("token cache invalidated");
    }

    /// Drop the token cached for `scope` only while it is still `rejected`.
    ///
    /// Callers that were refused with the same token clear it once; later ones find the
    /// replacement already in place and keep it.
    pub async fn invalidate_if(&self, scope: &str, rejected: &AccessToken) {
        let Some(slot) = self.slots.read().await.get(scope).cloned() else {
            return;
        };
        let mut cached = slot.lock().await;
        if cached.as_ref().is_some_and(|c| c.token == *rejected) {
            *cached = None;
            debug!(scope, token = %rejected.redacted(), "rejected token dropped");
        }
    }

    async fn slot(&self, scope: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(scope) {
            return slot.clone();
        }
        self.slots
            .write()
            .await
            .entry(scope.to_owned())
            .or_default()
            .clone()
    }
}
