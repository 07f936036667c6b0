//! Session authentication manager
//!
//! Drives one browser session through the authorization-code flow:
//! login URL, callback with replay protection, identity lookup with a
//! single refresh-then-retry, and logout.

pub mod local;
pub mod oauth;
pub mod ports;
pub mod store;

#[cfg(test)]
mod tests;

pub use local::LocalIdentityProvider;
pub use oauth::{authorization_url, AzureAdProvider};
pub use ports::*;
pub use store::InMemorySessionStore;

use chrono::Utc;
use config::ClientIdentity;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};
use url::Url;

/// Authorization codes are short-lived at the identity provider
pub const DEFAULT_CODE_TTL: Duration = Duration::from_secs(10 * 60);

struct SsoClient {
    identity: ClientIdentity,
    provider: Arc<dyn IdentityProvider>,
}

pub struct SessionAuthManager {
    sso: Result<SsoClient, String>,
    store: Arc<dyn SessionStore>,
    code_ttl: Duration,
}

impl SessionAuthManager {
    pub fn new(
        identity: ClientIdentity,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            sso: Ok(SsoClient { identity, provider }),
            store,
            code_ttl: DEFAULT_CODE_TTL,
        }
    }

    /// Manager for a process whose client identity is incomplete.
    ///
    /// Every sign-in operation reports the configuration error instead of
    /// contacting the identity provider.
    pub fn unconfigured(reason: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            sso: Err(reason.into()),
            store,
            code_ttl: DEFAULT_CODE_TTL,
        }
    }

    pub fn with_code_ttl(mut self, code_ttl: Duration) -> Self {
        self.code_ttl = code_ttl;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.sso.is_ok()
    }

    pub fn configuration_error(&self) -> Option<&str> {
        self.sso.as_ref().err().map(String::as_str)
    }

    pub fn client_identity(&self) -> Option<&ClientIdentity> {
        self.sso.as_ref().ok().map(|sso| &sso.identity)
    }

    fn sso(&self) -> Result<&SsoClient, AuthError> {
        self.sso
            .as_ref()
            .map_err(|reason| AuthError::ConfigError(reason.clone()))
    }

    async fn load(&self, key: &SessionKey) -> Result<Session, AuthError> {
        self.store
            .get(key)
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| AuthError::InternalError(format!("Failed to load session: {e}")))
    }

    async fn save(&self, key: &SessionKey, session: &Session) -> Result<(), AuthError> {
        self.store
            .set(key, session.clone())
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to save session: {e}")))
    }

    /// URL the browser is redirected to for sign-in
    pub fn build_login_url(&self) -> Result<Url, AuthError> {
        authorization_url(&self.sso()?.identity)
    }

    /// Complete sign-in from the identity provider's redirect.
    ///
    /// The code is recorded as used and persisted before it is exchanged,
    /// so a reload of the callback URL can never redeem it twice. On a
    /// failed exchange the session keeps no tokens.
    pub async fn handle_callback(
        &self,
        key: &SessionKey,
        params: &CallbackParams,
    ) -> Result<Session, AuthError> {
        let sso = self.sso()?;

        let code = match params.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code,
            _ => {
                if let Some(error) = &params.error {
                    warn!("Identity provider returned an error: {}", error);
                    let description = params
                        .error_description
                        .clone()
                        .unwrap_or_else(|| error.clone());
                    return Err(AuthError::AuthorizationDenied(description));
                }
                return Err(AuthError::NoCode);
            }
        };

        let mut session = self.load(key).await?;
        let now = Utc::now();
        // A signed-in session keeps every code so a replay never reaches the exchange
        if !session.is_authenticated() {
            session.prune_codes(self.code_ttl, now);
        }

        if session.has_used_code(code) {
            warn!("Rejected replayed authorization code for session {}", key);
            return Err(AuthError::Replay);
        }

        debug!(
            "Session {} moving {:?} -> {:?}",
            key,
            session.state(),
            SessionState::AwaitingCallback
        );
        session.record_code(code, now);
        self.save(key, &session).await?;

        match sso.provider.exchange_code(code).await {
            Ok(tokens) => {
                session.store_tokens(tokens);
                self.save(key, &session).await?;
                info!("Session {} signed in", key);
                Ok(session)
            }
            Err(err) => {
                session.clear_tokens();
                if let Err(save_err) = self.save(key, &session).await {
                    error!("Failed to clear tokens after exchange failure: {}", save_err);
                }

                let description = match err {
                    AuthError::TokenExchange(description) => description,
                    other => other.to_string(),
                };
                warn!("Token exchange failed for session {}: {}", key, description);
                Err(AuthError::TokenExchange(description))
            }
        }
    }

    /// Profile of the signed-in user, or `None`.
    ///
    /// When the identity endpoint rejects the access token, one refresh is
    /// attempted followed by one retry. A token that is still rejected is
    /// dropped from the session; any other failure leaves the session alone.
    pub async fn get_identity(&self, key: &SessionKey) -> Option<UserIdentity> {
        let sso = self.sso().ok()?;

        let session = match self.load(key).await {
            Ok(session) => session,
            Err(e) => {
                error!("{}", e);
                return None;
            }
        };
        let access_token = session.access_token?;

        match sso.provider.fetch_identity(&access_token).await {
            Ok(identity) => return Some(identity),
            Err(AuthError::Unauthorized) => {
                debug!(
                    "Session {} moving {:?} -> {:?}",
                    key,
                    SessionState::Authenticated,
                    SessionState::ExpiredRetry
                );
            }
            Err(e) => {
                warn!("Identity lookup failed for session {}: {}", key, e);
                return None;
            }
        }

        if !self.refresh(key).await {
            self.invalidate_tokens(key).await;
            return None;
        }

        let access_token = match self.load(key).await {
            Ok(session) => session.access_token?,
            Err(e) => {
                error!("{}", e);
                return None;
            }
        };

        match sso.provider.fetch_identity(&access_token).await {
            Ok(identity) => Some(identity),
            Err(AuthError::Unauthorized) => {
                self.invalidate_tokens(key).await;
                None
            }
            Err(e) => {
                warn!("Identity lookup failed after refresh for session {}: {}", key, e);
                None
            }
        }
    }

    /// Trade the stored refresh token for new tokens.
    ///
    /// Returns whether the session now holds a fresh access token.
    pub async fn refresh(&self, key: &SessionKey) -> bool {
        let Ok(sso) = self.sso() else {
            return false;
        };

        let mut session = match self.load(key).await {
            Ok(session) => session,
            Err(e) => {
                error!("{}", e);
                return false;
            }
        };
        let Some(refresh_token) = session.refresh_token.clone() else {
            debug!("Session {} has no refresh token", key);
            return false;
        };

        match sso.provider.refresh(&refresh_token).await {
            Ok(tokens) => {
                session.rotate_tokens(tokens);
                match self.save(key, &session).await {
                    Ok(()) => {
                        info!("Session {} refreshed", key);
                        true
                    }
                    Err(e) => {
                        error!("{}", e);
                        false
                    }
                }
            }
            Err(e) => {
                warn!("Token refresh failed for session {}: {}", key, e);
                false
            }
        }
    }

    /// Drop the tokens but keep the used-code set
    async fn invalidate_tokens(&self, key: &SessionKey) {
        let result = async {
            let mut session = self.load(key).await?;
            session.clear_tokens();
            self.save(key, &session).await
        }
        .await;

        match result {
            Ok(()) => info!("Session {} signed out after token rejection", key),
            Err(e) => error!("{}", e),
        }
    }

    /// Forget everything about the session, used codes included
    pub async fn logout(&self, key: &SessionKey) -> Result<(), AuthError> {
        self.store
            .clear(key)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to clear session: {e}")))?;
        info!("Session {} logged out", key);
        Ok(())
    }
}
