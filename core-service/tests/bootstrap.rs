use async_trait::async_trait;
use bridge_traits::browser::{BrowserLauncher, BrowserSurface};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::storage::{SecureStore, SettingsStore};
use bridge_traits::time::{Clock, FixedClock};
use chrono::{Duration, TimeZone, Utc};
use core_auth::{AccessToken, SessionState, TokenStore};
use core_gateway::{ApiError, USER_INFO_CACHE_KEY};
use core_runtime::config::CoreConfig;
use core_runtime::events::{AuthEvent, CoreEvent};
use core_service::CoreService;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct MemoryBackend {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
    settings: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SecureStore for MemoryBackend {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.secrets.lock().await.insert(key.into(), value.to_vec());
        Ok(())
    }
    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.secrets.lock().await.get(key).cloned())
    }
    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.secrets.lock().await.remove(key);
        Ok(())
    }
    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.secrets.lock().await.keys().cloned().collect())
    }
    async fn clear_all(&self) -> BridgeResult<()> {
        self.secrets.lock().await.clear();
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryBackend {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.settings.lock().await.insert(key.into(), value.into());
        Ok(())
    }
    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.settings.lock().await.get(key).cloned())
    }
    async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()> {
        self.set_string(key, &value.to_string()).await
    }
    async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
        Ok(self.get_string(key).await?.and_then(|v| v.parse().ok()))
    }
    async fn set_i64(&self, key: &str, value: i64) -> BridgeResult<()> {
        self.set_string(key, &value.to_string()).await
    }
    async fn get_i64(&self, key: &str) -> BridgeResult<Option<i64>> {
        Ok(self.get_string(key).await?.and_then(|v| v.parse().ok()))
    }
    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.settings.lock().await.remove(key);
        Ok(())
    }
    async fn has_key(&self, key: &str) -> BridgeResult<bool> {
        Ok(self.settings.lock().await.contains_key(key))
    }
    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.settings.lock().await.keys().cloned().collect())
    }
    async fn clear_all(&self) -> BridgeResult<()> {
        self.settings.lock().await.clear();
        Ok(())
    }
}

/// Gateway + auth server fake answering from a fixed route table.
struct Routes(HashMap<&'static str, (u16, &'static str)>);

#[async_trait]
impl HttpClient for Routes {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let path = url::Url::parse(&request.url)
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        let (status, body) = self.0.get(path.as_str()).copied().unwrap_or((404, ""));
        Ok(HttpResponse::new(status, body))
    }
}

struct NoopBrowser;

#[async_trait]
impl BrowserLauncher for NoopBrowser {
    fn surface(&self) -> BrowserSurface {
        BrowserSurface::EmbeddedWebView
    }
    async fn open_url(&self, _url: &str) -> BridgeResult<()> {
        Ok(())
    }
}

fn config(routes: Routes, backend: Arc<MemoryBackend>, clock: Arc<FixedClock>) -> CoreConfig {
    CoreConfig::builder()
        .auth_base_url("https://auth.everp.test")
        .client_id("everp-mobile")
        .redirect_uri("everp://callback")
        .gateway_base_url("https://gateway.everp.test")
        .http_client(Arc::new(routes))
        .secure_store(backend.clone())
        .settings_store(backend)
        .browser_launcher(Arc::new(NoopBrowser))
        .clock(clock)
        .build()
        .unwrap()
}

async fn persist_token(backend: &Arc<MemoryBackend>, clock: &FixedClock) {
    TokenStore::new(backend.clone())
        .store(&AccessToken::new(
            "persisted",
            "Bearer",
            Some(clock.now() + Duration::hours(2)),
        ))
        .await
        .unwrap();
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 7, 0, 0).unwrap()))
}

#[tokio::test]
async fn bootstrap_restores_persisted_session() {
    let backend = Arc::new(MemoryBackend::default());
    let clock = clock();
    persist_token(&backend, &clock).await;

    let core = CoreService::bootstrap(config(Routes(HashMap::new()), backend, clock))
        .await
        .unwrap();

    match core.session_state() {
        SessionState::Authenticated(token) => assert_eq!(token.secret(), "persisted"),
        other => panic!("unexpected state: {}", other),
    }
}

#[tokio::test]
async fn bootstrap_without_token_is_signed_out() {
    let core = CoreService::bootstrap(config(
        Routes(HashMap::new()),
        Arc::new(MemoryBackend::default()),
        clock(),
    ))
    .await
    .unwrap();

    assert_eq!(core.session_state(), SessionState::Unauthenticated);
    assert_eq!(
        core.gateway().user_info().await.unwrap_err(),
        ApiError::Unauthorized
    );
}

#[tokio::test]
async fn logout_clears_session_and_cache() {
    let backend = Arc::new(MemoryBackend::default());
    let clock = clock();
    persist_token(&backend, &clock).await;
    let routes = Routes(HashMap::from([
        ("/api/user/info", (200, r#"{"userId":"u-1","userName":"Lee"}"#)),
        ("/logout", (500, "")),
    ]));

    let core = CoreService::bootstrap(config(routes, backend.clone(), clock))
        .await
        .unwrap();
    core.gateway().user_info().await.unwrap();
    assert!(backend.has_key(USER_INFO_CACHE_KEY).await.unwrap());

    let outcome = core.logout().await.unwrap();

    assert!(!outcome.remote_revoked);
    assert_eq!(core.session_state(), SessionState::Unauthenticated);
    assert!(!backend.has_key(USER_INFO_CACHE_KEY).await.unwrap());
    assert!(backend.secrets.lock().await.is_empty());
}

#[tokio::test]
async fn gateway_401_expires_session() {
    let backend = Arc::new(MemoryBackend::default());
    let clock = clock();
    persist_token(&backend, &clock).await;
    let routes = Routes(HashMap::from([("/api/user/info", (401, ""))]));

    let core = CoreService::bootstrap(config(routes, backend, clock))
        .await
        .unwrap();
    let mut events = core.events().subscribe();

    assert_eq!(
        core.gateway().user_info().await.unwrap_err(),
        ApiError::Unauthorized
    );
    assert!(!core.session().is_authenticated());
    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Auth(AuthEvent::SessionExpired { .. })
    ));
}
