//! Unit tests for SessionAuthManager

use super::*;
use mockall::Sequence;

fn client_identity() -> ClientIdentity {
    ClientIdentity {
        client_id: "client-123".to_string(),
        client_secret: "s3cret".to_string(),
        redirect_uri: "https://portal.example.com/auth/callback".to_string(),
        scopes: vec!["User.Read".to_string()],
        authorize_url: "https://login.example.com/tenant/oauth2/v2.0/authorize".to_string(),
        token_url: "https://login.example.com/tenant/oauth2/v2.0/token".to_string(),
    }
}

fn tokens(access: &str, refresh: Option<&str>) -> TokenSet {
    TokenSet {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_in: Some(Duration::from_secs(3600)),
    }
}

fn user(name: &str) -> UserIdentity {
    UserIdentity {
        display_name: Some(name.to_string()),
        ..Default::default()
    }
}

fn build_manager(provider: MockIdentityProvider) -> (SessionAuthManager, Arc<InMemorySessionStore>) {
    let store = Arc::new(InMemorySessionStore::new(Duration::from_secs(3600), 1000));
    let manager = SessionAuthManager::new(client_identity(), Arc::new(provider), store.clone());
    (manager, store)
}

async fn state_of(store: &InMemorySessionStore, key: &SessionKey) -> SessionState {
    store.get(key).await.unwrap().unwrap_or_default().state()
}

async fn signed_in(store: &InMemorySessionStore, access: &str, refresh: Option<&str>) -> SessionKey {
    let key = SessionKey::generate();
    let mut session = Session::default();
    session.record_code("earlier-code", Utc::now());
    session.store_tokens(tokens(access, refresh));
    store.set(&key, session).await.unwrap();
    key
}

#[test]
fn test_login_url_is_stable() {
    let (manager, _) = build_manager(MockIdentityProvider::new());
    let first = manager.build_login_url().unwrap();
    let second = manager.build_login_url().unwrap();

    assert_eq!(first, second);
    assert!(first.as_str().starts_with("https://login.example.com/tenant/oauth2/v2.0/authorize?"));
    assert!(first.query_pairs().any(|(k, v)| k == "client_id" && v == "client-123"));
}

#[tokio::test]
async fn test_unconfigured_manager_never_touches_provider_or_store() {
    // Any call on the store mock would panic
    let store = Arc::new(MockSessionStore::new());
    let manager = SessionAuthManager::unconfigured("missing AZURE_CLIENT_ID", store);
    let key = SessionKey::generate();

    assert!(!manager.is_configured());
    assert_eq!(manager.configuration_error(), Some("missing AZURE_CLIENT_ID"));
    assert!(matches!(manager.build_login_url(), Err(AuthError::ConfigError(_))));
    assert!(matches!(
        manager.handle_callback(&key, &CallbackParams::with_code("abc")).await,
        Err(AuthError::ConfigError(_))
    ));
    assert!(manager.get_identity(&key).await.is_none());
    assert!(!manager.refresh(&key).await);
}

#[tokio::test]
async fn test_callback_success_stores_tokens_and_code() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_exchange_code()
        .withf(|value| value == "abc")
        .times(1)
        .returning(|_| Ok(tokens("access-1", Some("refresh-1"))));

    let (manager, store) = build_manager(provider);
    let key = SessionKey::generate();

    let session = manager
        .handle_callback(&key, &CallbackParams::with_code("abc"))
        .await
        .unwrap();

    assert_eq!(session.access_token.as_deref(), Some("access-1"));
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert!(session.has_used_code("abc"));
    assert_eq!(store.get(&key).await.unwrap(), Some(session));
    assert_eq!(state_of(&store, &key).await, SessionState::Authenticated);
}

#[tokio::test]
async fn test_reloaded_callback_is_rejected_without_second_exchange() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_exchange_code()
        .times(1)
        .returning(|_| Ok(tokens("access-1", Some("refresh-1"))));

    let (manager, store) = build_manager(provider);
    let key = SessionKey::generate();
    let params = CallbackParams::with_code("abc");

    manager.handle_callback(&key, &params).await.unwrap();
    let before = store.get(&key).await.unwrap();

    assert!(matches!(
        manager.handle_callback(&key, &params).await,
        Err(AuthError::Replay)
    ));
    assert_eq!(store.get(&key).await.unwrap(), before);
}

#[tokio::test]
async fn test_failed_exchange_still_burns_the_code() {
    let mut provider = MockIdentityProvider::new();
    provider.expect_exchange_code().times(1).returning(|_| {
        Err(AuthError::TokenExchange(
            "AADSTS70008: The provided authorization code has expired".to_string(),
        ))
    });

    let (manager, store) = build_manager(provider);
    let key = SessionKey::generate();
    let params = CallbackParams::with_code("stale");

    match manager.handle_callback(&key, &params).await {
        Err(AuthError::TokenExchange(description)) => assert_eq!(
            description,
            "AADSTS70008: The provided authorization code has expired"
        ),
        other => panic!("unexpected result: {other:?}"),
    }

    let session = store.get(&key).await.unwrap().unwrap();
    assert!(session.access_token.is_none());
    assert!(session.refresh_token.is_none());
    assert!(session.has_used_code("stale"));

    assert!(matches!(
        manager.handle_callback(&key, &params).await,
        Err(AuthError::Replay)
    ));
}

#[tokio::test]
async fn test_failed_exchange_drops_previous_tokens() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_exchange_code()
        .times(1)
        .returning(|_| Err(AuthError::NetworkError("connection reset".to_string())));

    let (manager, store) = build_manager(provider);
    let key = signed_in(&store, "old-access", Some("old-refresh")).await;

    let result = manager
        .handle_callback(&key, &CallbackParams::with_code("fresh"))
        .await;
    assert!(matches!(result, Err(AuthError::TokenExchange(_))));

    let session = store.get(&key).await.unwrap().unwrap();
    assert!(!session.is_authenticated());
    assert!(session.has_used_code("earlier-code"));
    assert!(session.has_used_code("fresh"));
}

#[tokio::test]
async fn test_code_is_persisted_before_exchange() {
    let mut seq = Sequence::new();
    let mut store = MockSessionStore::new();
    let mut provider = MockIdentityProvider::new();

    store
        .expect_get()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(None));
    store
        .expect_set()
        .withf(|_, session| session.has_used_code("abc") && session.access_token.is_none())
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    provider
        .expect_exchange_code()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(tokens("access-1", None)));
    store
        .expect_set()
        .withf(|_, session| session.has_used_code("abc") && session.is_authenticated())
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    let manager =
        SessionAuthManager::new(client_identity(), Arc::new(provider), Arc::new(store));
    manager
        .handle_callback(&SessionKey::generate(), &CallbackParams::with_code("abc"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_store_failure_aborts_before_exchange() {
    let mut store = MockSessionStore::new();
    store.expect_get().returning(|_| Ok(None));
    store
        .expect_set()
        .times(1)
        .returning(|_, _| Err(anyhow::anyhow!("store unavailable")));

    let mut provider = MockIdentityProvider::new();
    provider.expect_exchange_code().times(0);

    let manager =
        SessionAuthManager::new(client_identity(), Arc::new(provider), Arc::new(store));
    let result = manager
        .handle_callback(&SessionKey::generate(), &CallbackParams::with_code("abc"))
        .await;
    assert!(matches!(result, Err(AuthError::InternalError(_))));
}

#[tokio::test]
async fn test_callback_without_code_changes_nothing() {
    let mut provider = MockIdentityProvider::new();
    provider.expect_exchange_code().times(0);

    let (manager, store) = build_manager(provider);
    let key = SessionKey::generate();

    assert!(matches!(
        manager.handle_callback(&key, &CallbackParams::default()).await,
        Err(AuthError::NoCode)
    ));
    assert!(matches!(
        manager.handle_callback(&key, &CallbackParams::with_code("  ")).await,
        Err(AuthError::NoCode)
    ));
    assert!(store.get(&key).await.unwrap().is_none());
    assert_eq!(state_of(&store, &key).await, SessionState::Anonymous);
}

#[tokio::test]
async fn test_callback_with_provider_error_is_denied() {
    let mut provider = MockIdentityProvider::new();
    provider.expect_exchange_code().times(0);

    let (manager, store) = build_manager(provider);
    let key = SessionKey::generate();
    let params = CallbackParams {
        error: Some("access_denied".to_string()),
        error_description: Some("AADSTS65004: User declined to consent".to_string()),
        ..Default::default()
    };

    match manager.handle_callback(&key, &params).await {
        Err(AuthError::AuthorizationDenied(description)) => {
            assert_eq!(description, "AADSTS65004: User declined to consent")
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_codes_older_than_ttl_are_forgotten_once_signed_out() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_exchange_code()
        .withf(|value| value == "abc")
        .times(2)
        .returning(|_| Ok(tokens("access", None)));

    let (manager, store) = build_manager(provider);
    let manager = manager.with_code_ttl(Duration::ZERO);
    let key = SessionKey::generate();
    let params = CallbackParams::with_code("abc");

    manager.handle_callback(&key, &params).await.unwrap();

    let mut session = store.get(&key).await.unwrap().unwrap();
    session.clear_tokens();
    store.set(&key, session).await.unwrap();

    manager.handle_callback(&key, &params).await.unwrap();
}

#[tokio::test]
async fn test_expired_code_replay_keeps_signed_in_session() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_exchange_code()
        .withf(|value| value == "ABC123")
        .times(1)
        .returning(|_| Ok(tokens("T1", Some("R1"))));

    let (manager, store) = build_manager(provider);
    let manager = manager.with_code_ttl(Duration::from_millis(50));
    let key = SessionKey::generate();
    let params = CallbackParams::with_code("ABC123");

    manager.handle_callback(&key, &params).await.unwrap();
    let before = store.get(&key).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(matches!(
        manager.handle_callback(&key, &params).await,
        Err(AuthError::Replay)
    ));
    let after = store.get(&key).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after.unwrap().access_token.as_deref(), Some("T1"));
}

#[tokio::test]
async fn test_get_identity_with_valid_token() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_fetch_identity()
        .withf(|value| value == "access-1")
        .times(1)
        .returning(|_| Ok(user("Ada")));
    provider.expect_refresh().times(0);

    let (manager, store) = build_manager(provider);
    let key = signed_in(&store, "access-1", Some("refresh-1")).await;

    assert_eq!(manager.get_identity(&key).await, Some(user("Ada")));
}

#[tokio::test]
async fn test_get_identity_without_token_skips_provider() {
    let mut provider = MockIdentityProvider::new();
    provider.expect_fetch_identity().times(0);

    let (manager, _) = build_manager(provider);
    assert!(manager.get_identity(&SessionKey::generate()).await.is_none());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once_and_retried() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_fetch_identity()
        .withf(|value| value == "old-access")
        .times(1)
        .returning(|_| Err(AuthError::Unauthorized));
    provider
        .expect_refresh()
        .withf(|value| value == "refresh-1")
        .times(1)
        .returning(|_| Ok(tokens("new-access", None)));
    provider
        .expect_fetch_identity()
        .withf(|value| value == "new-access")
        .times(1)
        .returning(|_| Ok(user("Ada")));

    let (manager, store) = build_manager(provider);
    let key = signed_in(&store, "old-access", Some("refresh-1")).await;

    assert_eq!(manager.get_identity(&key).await, Some(user("Ada")));

    let session = store.get(&key).await.unwrap().unwrap();
    assert_eq!(session.access_token.as_deref(), Some("new-access"));
    // Kept because the refresh response carried no new one
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_failed_refresh_signs_out_but_keeps_used_codes() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_fetch_identity()
        .times(1)
        .returning(|_| Err(AuthError::Unauthorized));
    provider
        .expect_refresh()
        .times(1)
        .returning(|_| Err(AuthError::TokenExchange("invalid_grant".to_string())));

    let (manager, store) = build_manager(provider);
    let key = signed_in(&store, "old-access", Some("refresh-1")).await;

    assert!(manager.get_identity(&key).await.is_none());

    let session = store.get(&key).await.unwrap().unwrap();
    assert!(session.access_token.is_none());
    assert!(session.refresh_token.is_none());
    assert!(session.has_used_code("earlier-code"));
    assert_eq!(state_of(&store, &key).await, SessionState::Anonymous);
}

#[tokio::test]
async fn test_second_rejection_does_not_loop() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_fetch_identity()
        .times(2)
        .returning(|_| Err(AuthError::Unauthorized));
    provider
        .expect_refresh()
        .times(1)
        .returning(|_| Ok(tokens("new-access", Some("refresh-2"))));

    let (manager, store) = build_manager(provider);
    let key = signed_in(&store, "old-access", Some("refresh-1")).await;

    assert!(manager.get_identity(&key).await.is_none());
    let session = store.get(&key).await.unwrap().unwrap();
    assert!(!session.is_authenticated());
    assert!(session.has_used_code("earlier-code"));
}

#[tokio::test]
async fn test_expired_token_without_refresh_token() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_fetch_identity()
        .times(1)
        .returning(|_| Err(AuthError::Unauthorized));
    provider.expect_refresh().times(0);

    let (manager, store) = build_manager(provider);
    let key = signed_in(&store, "old-access", None).await;

    assert!(manager.get_identity(&key).await.is_none());
    assert!(!store.get(&key).await.unwrap().unwrap().is_authenticated());
}

#[tokio::test]
async fn test_transient_failure_keeps_session() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_fetch_identity()
        .times(1)
        .returning(|_| Err(AuthError::UnexpectedStatus(503)));
    provider.expect_refresh().times(0);

    let (manager, store) = build_manager(provider);
    let key = signed_in(&store, "access-1", Some("refresh-1")).await;

    assert!(manager.get_identity(&key).await.is_none());
    let session = store.get(&key).await.unwrap().unwrap();
    assert_eq!(session.access_token.as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_refresh_without_refresh_token_returns_false() {
    let mut provider = MockIdentityProvider::new();
    provider.expect_refresh().times(0);

    let (manager, store) = build_manager(provider);
    let key = signed_in(&store, "access-1", None).await;

    assert!(!manager.refresh(&key).await);
    assert!(!manager.refresh(&SessionKey::generate()).await);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_refresh()
        .withf(|value| value == "refresh-1")
        .times(1)
        .returning(|_| Ok(tokens("access-2", Some("refresh-2"))));

    let (manager, store) = build_manager(provider);
    let key = signed_in(&store, "access-1", Some("refresh-1")).await;

    assert!(manager.refresh(&key).await);
    let session = store.get(&key).await.unwrap().unwrap();
    assert_eq!(session.access_token.as_deref(), Some("access-2"));
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_logout_forgets_everything() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_exchange_code()
        .withf(|value| value == "earlier-code")
        .times(1)
        .returning(|_| Ok(tokens("access-2", None)));

    let (manager, store) = build_manager(provider);
    let key = signed_in(&store, "access-1", Some("refresh-1")).await;

    manager.logout(&key).await.unwrap();
    assert!(store.get(&key).await.unwrap().is_none());
    assert_eq!(state_of(&store, &key).await, SessionState::Anonymous);

    // The used-code set went with the session
    manager
        .handle_callback(&key, &CallbackParams::with_code("earlier-code"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_logout_of_unknown_session_is_harmless() {
    let (manager, _) = build_manager(MockIdentityProvider::new());
    manager.logout(&SessionKey::generate()).await.unwrap();
}

#[tokio::test]
async fn test_sessions_do_not_share_used_codes() {
    let mut provider = MockIdentityProvider::new();
    provider
        .expect_exchange_code()
        .times(2)
        .returning(|_| Ok(tokens("access", None)));

    let (manager, _) = build_manager(provider);
    let params = CallbackParams::with_code("shared");

    manager
        .handle_callback(&SessionKey::generate(), &params)
        .await
        .unwrap();
    manager
        .handle_callback(&SessionKey::generate(), &params)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_local_development_round_trip() {
    let provider = Arc::new(LocalIdentityProvider::new("Dev", "dev@localhost"));
    let store = Arc::new(InMemorySessionStore::new(Duration::from_secs(3600), 100));
    let identity = ClientIdentity::local_development(
        "http://localhost:3000/auth/callback".to_string(),
        vec!["User.Read".to_string()],
    )
    .unwrap();
    let manager = SessionAuthManager::new(identity, provider.clone(), store);
    let key = SessionKey::generate();

    let login = manager.build_login_url().unwrap();
    assert_eq!(login.path(), "/auth/dev/authorize");

    let code = provider.issue_code().await;
    manager
        .handle_callback(&key, &CallbackParams::with_code(code))
        .await
        .unwrap();
    assert_eq!(manager.get_identity(&key).await.unwrap().name(), "Dev");

    provider.expire_access_tokens().await;
    assert_eq!(manager.get_identity(&key).await.unwrap().name(), "Dev");
}
