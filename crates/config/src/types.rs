use crate::ConfigError;
use serde::Deserialize;
use std::{collections::HashMap, env, fmt, str::FromStr};
use url::Url;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://graph.microsoft.com/v1.0/me";
pub const DEFAULT_DEV_REDIRECT_URI: &str = "http://localhost:3000/auth/callback";
pub const DEV_AUTHORIZE_PATH: &str = "/auth/dev/authorize";
pub const DEV_CLIENT_ID: &str = "local-development";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub translation: TranslationConfig,
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|name: &str| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server: ServerConfig::from_lookup(lookup)?,
            logging: LoggingConfig::from_lookup(lookup),
            auth: AuthConfig::from_lookup(lookup)?,
            translation: TranslationConfig::from_lookup(lookup)?,
        })
    }
}

/// Reads a variable, treating blank values as unset.
fn read<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match read(lookup, name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            host: read(lookup, "SERVER_HOST").unwrap_or(defaults.host),
            port: parse_or(lookup, "SERVER_PORT", defaults.port)?,
        })
    }
}

/// Logging Configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub modules: HashMap<String, String>,
}

impl LoggingConfig {
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut modules = HashMap::new();

        // Module-specific log levels
        if let Some(level) = read(lookup, "LOG_MODULE_API") {
            modules.insert("api".to_string(), level);
        }
        if let Some(level) = read(lookup, "LOG_MODULE_SERVICES") {
            modules.insert("services".to_string(), level);
        }
        if let Some(level) = read(lookup, "LOG_MODULE_TRANSLATION") {
            modules.insert("translation_providers".to_string(), level);
        }

        Self {
            level: read(lookup, "LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: read(lookup, "LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
            modules,
        }
    }

    /// Filter directive understood by `tracing_subscriber::EnvFilter`
    pub fn filter_directive(&self) -> String {
        let mut modules: Vec<_> = self.modules.iter().collect();
        modules.sort();

        let mut filter = self.level.clone();
        for (module, level) in modules {
            filter.push_str(&format!(",{module}={level}"));
        }
        filter
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            modules: HashMap::new(),
        }
    }
}

/// Single sign-on configuration.
///
/// Every identity field is optional at load time. Whether single sign-on is
/// usable is decided once by [`AuthConfig::client_identity`].
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub authority_host: String,
    pub scopes: Vec<String>,
    pub identity_endpoint: String,
    pub dev_mode: bool,
    pub dev_user_name: String,
    pub dev_user_email: String,
    pub session_idle_timeout_seconds: u64,
    pub authorization_code_ttl_seconds: u64,
    pub session_max_entries: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            tenant_id: None,
            redirect_uri: None,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            scopes: vec!["User.Read".to_string()],
            identity_endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            dev_mode: false,
            dev_user_name: "Local Developer".to_string(),
            dev_user_email: "developer@localhost".to_string(),
            session_idle_timeout_seconds: 8 * 60 * 60,
            authorization_code_ttl_seconds: 10 * 60,
            session_max_entries: 10_000,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("tenant_id", &self.tenant_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("authority_host", &self.authority_host)
            .field("scopes", &self.scopes)
            .field("identity_endpoint", &self.identity_endpoint)
            .field("dev_mode", &self.dev_mode)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let scopes = read(lookup, "AZURE_SCOPES")
            .map(|raw| parse_scopes(&raw))
            .unwrap_or(defaults.scopes);

        Ok(Self {
            client_id: read(lookup, "AZURE_CLIENT_ID"),
            client_secret: read(lookup, "AZURE_CLIENT_SECRET"),
            tenant_id: read(lookup, "AZURE_TENANT_ID"),
            redirect_uri: read(lookup, "AZURE_REDIRECT_URI"),
            authority_host: read(lookup, "AZURE_AUTHORITY_HOST").unwrap_or(defaults.authority_host),
            scopes,
            identity_endpoint: read(lookup, "IDENTITY_ENDPOINT")
                .unwrap_or(defaults.identity_endpoint),
            dev_mode: parse_or(lookup, "AUTH_DEV_MODE", false)?,
            dev_user_name: read(lookup, "DEV_USER_NAME").unwrap_or(defaults.dev_user_name),
            dev_user_email: read(lookup, "DEV_USER_EMAIL").unwrap_or(defaults.dev_user_email),
            session_idle_timeout_seconds: parse_or(
                lookup,
                "SESSION_IDLE_TIMEOUT_SECONDS",
                defaults.session_idle_timeout_seconds,
            )?,
            authorization_code_ttl_seconds: parse_or(
                lookup,
                "AUTH_CODE_TTL_SECONDS",
                defaults.authorization_code_ttl_seconds,
            )?,
            session_max_entries: parse_or(
                lookup,
                "SESSION_MAX_ENTRIES",
                defaults.session_max_entries,
            )?,
        })
    }

    /// Resolve the immutable client identity used for the whole process.
    ///
    /// Outside development mode every Azure setting must be present; the
    /// error names all of the missing ones.
    pub fn client_identity(&self) -> Result<ClientIdentity, ConfigError> {
        if self.dev_mode {
            let redirect_uri = self
                .redirect_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_DEV_REDIRECT_URI.to_string());
            return ClientIdentity::local_development(redirect_uri, self.scopes.clone());
        }

        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let client_id = present(&self.client_id);
        let client_secret = present(&self.client_secret);
        let tenant_id = present(&self.tenant_id);
        let redirect_uri = present(&self.redirect_uri);

        let mut missing = Vec::new();
        if client_id.is_none() {
            missing.push("AZURE_CLIENT_ID");
        }
        if client_secret.is_none() {
            missing.push("AZURE_CLIENT_SECRET");
        }
        if tenant_id.is_none() {
            missing.push("AZURE_TENANT_ID");
        }
        if redirect_uri.is_none() {
            missing.push("AZURE_REDIRECT_URI");
        }
        if self.scopes.is_empty() {
            missing.push("AZURE_SCOPES");
        }

        match (client_id, client_secret, tenant_id, redirect_uri) {
            (Some(client_id), Some(client_secret), Some(tenant_id), Some(redirect_uri))
                if missing.is_empty() =>
            {
                let authority = format!("{}/{}", self.authority_host.trim_end_matches('/'), tenant_id);
                Ok(ClientIdentity {
                    client_id,
                    client_secret,
                    redirect_uri,
                    scopes: self.scopes.clone(),
                    authorize_url: format!("{authority}/oauth2/v2.0/authorize"),
                    token_url: format!("{authority}/oauth2/v2.0/token"),
                })
            }
            _ => Err(ConfigError::MissingSettings { names: missing }),
        }
    }
}

fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Client identity registered with the identity provider.
///
/// Immutable for the lifetime of the process.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
}

impl ClientIdentity {
    /// Identity pointing at the portal's own development authorize route
    pub fn local_development(
        redirect_uri: String,
        scopes: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let origin = origin_of(&redirect_uri).ok_or_else(|| ConfigError::InvalidValue {
            name: "AZURE_REDIRECT_URI".to_string(),
            reason: format!("'{redirect_uri}' is not an absolute URL"),
        })?;

        Ok(Self {
            client_id: DEV_CLIENT_ID.to_string(),
            client_secret: DEV_CLIENT_ID.to_string(),
            authorize_url: format!("{origin}{DEV_AUTHORIZE_PATH}"),
            token_url: format!("{origin}/auth/dev/token"),
            redirect_uri,
            scopes,
        })
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

fn origin_of(raw: &str) -> Option<String> {
    let origin = Url::parse(raw).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Translation collaborator configuration
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub deepl_api_key: Option<String>,
    pub deepl_server_url: Option<String>,
    pub timeout_seconds: u64,
    pub document_timeout_seconds: u64,
    pub max_document_bytes: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            deepl_api_key: None,
            deepl_server_url: None,
            timeout_seconds: 30,
            document_timeout_seconds: 600,
            max_document_bytes: 30 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("deepl_api_key", &self.deepl_api_key.as_ref().map(|_| "***"))
            .field("deepl_server_url", &self.deepl_server_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("document_timeout_seconds", &self.document_timeout_seconds)
            .field("max_document_bytes", &self.max_document_bytes)
            .finish()
    }
}

impl TranslationConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            deepl_api_key: read(lookup, "DEEPL_API_KEY"),
            deepl_server_url: read(lookup, "DEEPL_SERVER_URL"),
            timeout_seconds: parse_or(
                lookup,
                "TRANSLATION_TIMEOUT_SECONDS",
                defaults.timeout_seconds,
            )?,
            document_timeout_seconds: parse_or(
                lookup,
                "DOCUMENT_TIMEOUT_SECONDS",
                defaults.document_timeout_seconds,
            )?,
            max_document_bytes: parse_or(
                lookup,
                "MAX_DOCUMENT_BYTES",
                defaults.max_document_bytes,
            )?,
        })
    }

    /// Base URL of the translation API, if a key is configured.
    ///
    /// Free-tier keys end in `:fx` and live on a separate host.
    pub fn server_url(&self) -> Option<String> {
        let key = self.deepl_api_key.as_deref()?;
        if let Some(url) = &self.deepl_server_url {
            return Some(url.trim_end_matches('/').to_string());
        }
        if key.ends_with(":fx") {
            Some("https://api-free.deepl.com".to_string())
        } else {
            Some("https://api.deepl.com".to_string())
        }
    }
}
