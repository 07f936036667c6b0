use super::ports::{AuthError, IdentityProvider, TokenSet, UserIdentity};
use async_trait::async_trait;
use config::ClientIdentity;
use oauth2::{
    basic::{BasicClient, BasicErrorResponse, BasicTokenResponse},
    AuthType, AuthorizationCode, ClientId, ClientSecret, HttpClientError, RedirectUrl,
    RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

// Type alias for a client that only talks to the token endpoint
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

/// Scopes the identity provider always grants to interactive sign-ins
const RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// Scopes sent with every request: the reserved ones followed by the configured ones
pub fn requested_scopes(identity: &ClientIdentity) -> Vec<String> {
    let mut scopes: Vec<String> = RESERVED_SCOPES.iter().map(|s| s.to_string()).collect();
    for scope in &identity.scopes {
        if !scopes.iter().any(|s| s.eq_ignore_ascii_case(scope)) {
            scopes.push(scope.clone());
        }
    }
    scopes
}

/// Authorization URL the browser is sent to.
///
/// Pure function of the client identity: no state or nonce is attached.
pub fn authorization_url(identity: &ClientIdentity) -> Result<Url, AuthError> {
    let mut url = Url::parse(&identity.authorize_url)
        .map_err(|e| AuthError::ConfigError(format!("Invalid authorize URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("client_id", &identity.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &identity.redirect_uri)
        .append_pair("response_mode", "query")
        .append_pair("scope", &requested_scopes(identity).join(" "));

    Ok(url)
}

/// Azure AD (Microsoft identity platform) adapter
///
/// Token requests go through the `oauth2` crate with the client secret in
/// the request body; the profile comes from the Graph `/me` endpoint.
pub struct AzureAdProvider {
    client: ConfiguredClient,
    http_client: Client,
    identity_endpoint: String,
    scopes: Vec<String>,
}

impl AzureAdProvider {
    pub fn new(identity: &ClientIdentity, identity_endpoint: String) -> Result<Self, AuthError> {
        let token_url = TokenUrl::new(identity.token_url.clone())
            .map_err(|e| AuthError::ConfigError(format!("Invalid token URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(identity.client_id.clone()))
            .set_client_secret(ClientSecret::new(identity.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url)
            .set_redirect_uri(
                RedirectUrl::new(identity.redirect_uri.clone())
                    .map_err(|e| AuthError::ConfigError(format!("Invalid redirect URL: {}", e)))?,
            );

        // Token endpoints must not be followed across redirects
        let http_client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http_client,
            identity_endpoint,
            scopes: requested_scopes(identity),
        })
    }

    fn token_set(token: BasicTokenResponse) -> TokenSet {
        TokenSet {
            access_token: token.access_token().secret().to_string(),
            refresh_token: token.refresh_token().map(|t| t.secret().to_string()),
            expires_in: token.expires_in(),
        }
    }
}

/// Keep the identity provider's description verbatim when it sent one
fn token_error(
    err: RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>,
) -> AuthError {
    match err {
        RequestTokenError::ServerResponse(response) => AuthError::TokenExchange(
            response
                .error_description()
                .cloned()
                .unwrap_or_else(|| response.to_string()),
        ),
        other => AuthError::TokenExchange(other.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for AzureAdProvider {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        debug!("Exchanging authorization code for tokens");

        let scope = self.scopes.join(" ");
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .add_extra_param("scope", scope.as_str())
            .request_async(&self.http_client)
            .await
            .map_err(token_error)?;

        info!("Authorization code exchanged");
        Ok(Self::token_set(token))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        debug!("Refreshing access token");

        let refresh_token = RefreshToken::new(refresh_token.to_string());
        let token = self
            .client
            .exchange_refresh_token(&refresh_token)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .request_async(&self.http_client)
            .await
            .map_err(token_error)?;

        Ok(Self::token_set(token))
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<UserIdentity, AuthError> {
        let response = self
            .http_client
            .get(&self.identity_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(format!("Failed to fetch identity: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            debug!("Identity endpoint rejected the access token");
            return Err(AuthError::Unauthorized);
        }
        if !status.is_success() {
            warn!("Identity endpoint returned status: {}", status);
            return Err(AuthError::UnexpectedStatus(status.as_u16()));
        }

        response
            .json::<UserIdentity>()
            .await
            .map_err(|e| AuthError::InvalidPayload(e.to_string()))
    }
}
