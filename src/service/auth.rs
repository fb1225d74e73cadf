//! Authentication sync step
//!
//! Harvests the live session's credentials into the persisted request cookie,
//! writes the configuration to durable storage and reloads it, so that every
//! outbound call made afterwards carries the current session.

use std::sync::Arc;

use tracing::{Level, event};

use crate::{
    domain::{constant::auth, error::BridgeError, session::AuthSnapshot},
    port::{config::ConfigStore, session::SessionStore}
};

pub struct AuthSync {
    session: Arc<dyn SessionStore>,
    config:  Arc<dyn ConfigStore>
}

impl AuthSync {
    pub fn new(session: Arc<dyn SessionStore>, config: Arc<dyn ConfigStore>) -> Self {
        Self { session, config }
    }

    /// Read credentials, persist them as the request cookie, reload config.
    ///
    /// Storage and session failures are returned as-is; nothing is retried.
    pub async fn sync(&self) -> Result<AuthSnapshot, BridgeError> {
        event!(Level::DEBUG, event = auth::SYNC_STARTED);

        let result = self.sync_inner().await;
        if let Err(e) = &result {
            event!(Level::ERROR, event = auth::SYNC_FAILED, error = %e);
        }
        result
    }

    async fn sync_inner(&self) -> Result<AuthSnapshot, BridgeError> {
        let credentials = self.session.read_all_credentials().await?;
        let snapshot = AuthSnapshot::encode(&credentials);

        let mut config = self.config.current().await;
        config.request.cookie = snapshot.cookie.clone();
        self.config.write(&config).await?;
        event!(Level::DEBUG, event = auth::CONFIG_PERSISTED, credentials = %snapshot.credential_count);

        self.config.reload().await?;
        event!(Level::INFO, event = auth::CONFIG_RELOADED, credentials = %snapshot.credential_count);

        Ok(snapshot)
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }
}
