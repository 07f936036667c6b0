use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, time::Duration};
use uuid::Uuid;

/// Opaque key identifying one browser session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionKey(pub String);

impl SessionKey {
    pub fn generate() -> Self {
        SessionKey(Uuid::new_v4().to_string())
    }
}

impl From<String> for SessionKey {
    fn from(value: String) -> Self {
        SessionKey(value)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a session currently sits in the sign-in flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No access token
    Anonymous,
    /// A code was accepted and is being exchanged
    AwaitingCallback,
    /// An access token is held
    Authenticated,
    /// The identity endpoint rejected the access token and a refresh is underway
    ExpiredRetry,
}

/// Per-session authentication state
///
/// `used_authorization_codes` only grows during a session's lifetime, apart
/// from pruning codes older than the authorization-code lifetime while the
/// session is signed out. It survives token invalidation and is only dropped
/// by logout.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub used_authorization_codes: HashMap<String, DateTime<Utc>>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn has_used_code(&self, code: &str) -> bool {
        self.used_authorization_codes.contains_key(code)
    }

    pub fn record_code(&mut self, code: &str, at: DateTime<Utc>) {
        self.used_authorization_codes.insert(code.to_string(), at);
    }

    /// Forget codes the identity provider would no longer accept anyway
    pub fn prune_codes(&mut self, ttl: Duration, now: DateTime<Utc>) {
        self.used_authorization_codes.retain(|_, used_at| {
            (now - *used_at)
                .to_std()
                .map(|age| age < ttl)
                .unwrap_or(true)
        });
    }

    /// Replace both tokens with a freshly exchanged pair
    pub fn store_tokens(&mut self, tokens: TokenSet) {
        self.access_token = Some(tokens.access_token);
        self.refresh_token = tokens.refresh_token;
    }

    /// Apply a refresh response; the old refresh token stays when none is returned
    pub fn rotate_tokens(&mut self, tokens: TokenSet) {
        self.access_token = Some(tokens.access_token);
        if let Some(refresh_token) = tokens.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
    }

    pub fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("used_authorization_codes", &self.used_authorization_codes.len())
            .finish()
    }
}

/// Tokens returned by the identity provider's token endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Profile returned by the identity endpoint (`/me`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

impl UserIdentity {
    /// Best available human-readable name
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.user_principal_name.as_deref())
            .or(self.mail.as_deref())
            .unwrap_or("Unknown user")
    }
}

/// Query parameters the identity provider appends to the redirect URI
///
/// Duplicate `code` parameters fail deserialization, so at most one code
/// ever reaches the manager.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub session_state: Option<String>,
}

impl CallbackParams {
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Default::default()
        }
    }
}

// Errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No authorization code in callback")]
    NoCode,

    #[error("Authorization code has already been used")]
    Replay,

    #[error("Sign-in was refused: {0}")]
    AuthorizationDenied(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Identity endpoint returned status {0}")]
    UnexpectedStatus(u16),

    #[error("Invalid identity payload: {0}")]
    InvalidPayload(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Token endpoint and identity endpoint of the identity provider
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Trade an authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError>;

    /// Trade a refresh token for new tokens
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError>;

    /// Fetch the signed-in user's profile.
    ///
    /// Must return [`AuthError::Unauthorized`] exactly when the endpoint
    /// rejects the access token.
    async fn fetch_identity(&self, access_token: &str) -> Result<UserIdentity, AuthError>;
}

/// Storage for per-session state
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &SessionKey) -> anyhow::Result<Option<Session>>;

    async fn set(&self, key: &SessionKey, session: Session) -> anyhow::Result<()>;

    async fn clear(&self, key: &SessionKey) -> anyhow::Result<()>;
}
