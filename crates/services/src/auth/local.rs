//! Identity provider stand-in for local development
//!
//! Issues codes and tokens itself so the whole sign-in flow, including
//! replay protection and the refresh path, runs without an Azure tenant.

use super::ports::{AuthError, IdentityProvider, TokenSet, UserIdentity};
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const CODE_PREFIX: &str = "dev-";
const ACCESS_PREFIX: &str = "dev-access-";
const REFRESH_PREFIX: &str = "dev-refresh-";

const CODE_LIFETIME: Duration = Duration::from_secs(10 * 60);
const ACCESS_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);
const REFRESH_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);
const MAX_ISSUED: u64 = 10_000;

fn issued_cache(lifetime: Duration) -> Cache<String, ()> {
    Cache::builder()
        .max_capacity(MAX_ISSUED)
        .time_to_live(lifetime)
        .build()
}

pub struct LocalIdentityProvider {
    identity: UserIdentity,
    codes: Cache<String, ()>,
    access_tokens: Cache<String, ()>,
    refresh_tokens: Cache<String, ()>,
}

impl LocalIdentityProvider {
    pub fn new(display_name: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            identity: UserIdentity {
                id: Some(Uuid::new_v4().to_string()),
                display_name: Some(display_name.into()),
                user_principal_name: Some(email.clone()),
                mail: Some(email),
                ..Default::default()
            },
            codes: issued_cache(CODE_LIFETIME),
            access_tokens: issued_cache(ACCESS_TOKEN_LIFETIME),
            refresh_tokens: issued_cache(REFRESH_TOKEN_LIFETIME),
        }
    }

    /// Mint a one-time authorization code.
    ///
    /// Unredeemed codes lapse after ten minutes, and at most `MAX_ISSUED`
    /// are outstanding at once.
    pub async fn issue_code(&self) -> String {
        let code = format!("{CODE_PREFIX}{}", Uuid::new_v4());
        self.codes.insert(code.clone(), ()).await;
        code
    }

    /// Invalidate every access token, as if they had all expired
    pub async fn expire_access_tokens(&self) {
        self.access_tokens.invalidate_all();
        info!("Expired all development access tokens");
    }

    async fn mint_tokens(&self) -> TokenSet {
        let tokens = TokenSet {
            access_token: format!("{ACCESS_PREFIX}{}", Uuid::new_v4()),
            refresh_token: Some(format!("{REFRESH_PREFIX}{}", Uuid::new_v4())),
            expires_in: Some(ACCESS_TOKEN_LIFETIME),
        };

        self.access_tokens
            .insert(tokens.access_token.clone(), ())
            .await;
        if let Some(refresh_token) = &tokens.refresh_token {
            self.refresh_tokens.insert(refresh_token.clone(), ()).await;
        }
        tokens
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        // Codes are single use, like the real provider's
        if self.codes.remove(code).await.is_none() {
            return Err(AuthError::TokenExchange(
                "The authorization code is unknown or was already redeemed".to_string(),
            ));
        }

        debug!("Development code exchanged");
        Ok(self.mint_tokens().await)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        if self.refresh_tokens.remove(refresh_token).await.is_none() {
            return Err(AuthError::TokenExchange(
                "The refresh token is unknown".to_string(),
            ));
        }

        Ok(self.mint_tokens().await)
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<UserIdentity, AuthError> {
        if self.access_tokens.get(access_token).await.is_some() {
            Ok(self.identity.clone())
        } else {
            Err(AuthError::Unauthorized)
        }
    }
}
