#![allow(dead_code)]

use api::{build_app, init_app_state, AppState};
use axum_test::TestServer;
use config::ApiConfig;
use url::Url;

pub const DEV_REDIRECT_URI: &str = "http://localhost:3000/auth/callback";

/// Development-mode configuration: local identity provider and mock translation
pub fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.auth.dev_mode = true;
    config.auth.redirect_uri = Some(DEV_REDIRECT_URI.to_string());
    config.translation.max_document_bytes = 1024;
    config
}

/// Configuration with no identity provider settings at all
pub fn unconfigured_config() -> ApiConfig {
    ApiConfig::default()
}

pub fn setup_test_server_with_config(config: &ApiConfig) -> (TestServer, AppState) {
    let state = init_app_state(config);
    let mut server = TestServer::new(build_app(state.clone())).unwrap();
    server.save_cookies();
    (server, state)
}

pub fn setup_test_server() -> (TestServer, AppState) {
    setup_test_server_with_config(&test_config())
}

pub fn location(response: &axum_test::TestResponse) -> String {
    response
        .header("location")
        .to_str()
        .unwrap()
        .to_string()
}

/// Follow the login redirect to the development authorize page and return
/// the authorization code it hands back
pub async fn obtain_code(server: &TestServer) -> String {
    let login = server.get("/auth/login").await;
    assert_eq!(login.status_code(), 302);

    let authorize_url = Url::parse(&location(&login)).unwrap();
    assert_eq!(authorize_url.path(), "/auth/dev/authorize");

    let mut request = server.get(authorize_url.path());
    for (name, value) in authorize_url.query_pairs() {
        request = request.add_query_param(&name, value.as_ref());
    }
    let authorize = request.await;
    assert_eq!(authorize.status_code(), 302);

    let callback_url = Url::parse(&location(&authorize)).unwrap();
    assert!(callback_url.as_str().starts_with(DEV_REDIRECT_URI));
    callback_url
        .query_pairs()
        .find(|(name, _)| name == "code")
        .map(|(_, value)| value.into_owned())
        .unwrap()
}

/// Complete a development sign-in and return the code that was used
pub async fn sign_in(server: &TestServer) -> String {
    let code = obtain_code(server).await;
    let callback = server
        .get("/auth/callback")
        .add_query_param("code", &code)
        .await;
    assert_eq!(callback.status_code(), 302);
    assert_eq!(location(&callback), "/");
    code
}
