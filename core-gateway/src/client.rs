//! Gateway API client
//!
//! Authenticated REST/JSON calls against the EvERP gateway. The bearer token
//! is read from the [`SessionManager`] on every call; there is no retry layer.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::SettingsStore;
use core_auth::SessionManager;
use core_runtime::config::{join_endpoint, CoreConfig};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{ApiError, Result};
use crate::types::UserInfo;

pub const USER_INFO_PATH: &str = "/api/user/info";

/// Settings key holding the last fetched [`UserInfo`] as JSON.
pub const USER_INFO_CACHE_KEY: &str = "cache.user_info";

/// Typed client for the gateway API.
///
/// # Example
///
/// ```ignore
/// use core_gateway::GatewayClient;
///
/// let gateway = GatewayClient::from_config(&config, session.clone());
/// let profile = gateway.user_info().await?;
/// let invoices: Vec<Invoice> = gateway.get_json("/api/invoices?status=OPEN").await?;
/// ```
pub struct GatewayClient {
    base_url: Url,
    http_client: Arc<dyn HttpClient>,
    session: Arc<SessionManager>,
    settings_store: Arc<dyn SettingsStore>,
    read_timeout: Duration,
}

impl GatewayClient {
    pub fn new(
        base_url: Url,
        http_client: Arc<dyn HttpClient>,
        session: Arc<SessionManager>,
        settings_store: Arc<dyn SettingsStore>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            base_url,
            http_client,
            session,
            settings_store,
            read_timeout,
        }
    }

    pub fn from_config(config: &CoreConfig, session: Arc<SessionManager>) -> Self {
        Self::new(
            config.gateway_base_url.clone(),
            config.http_client.clone(),
            session,
            config.settings_store.clone(),
            config.timeouts.read,
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `path`, which may carry a query string.
    pub fn endpoint(&self, path: &str) -> Url {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };
        let mut url = join_endpoint(&self.base_url, path);
        url.set_query(query);
        url
    }

    /// `GET path` and decode the JSON body.
    #[instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(HttpMethod::Get, path, None).await?;
        decode(&response)
    }

    /// `POST path` with a JSON body and decode the JSON response.
    ///
    /// An empty response body decodes as JSON `null`, so `T = ()` works for
    /// endpoints that answer 204.
    #[instrument(skip(self, body))]
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| ApiError::Unknown(format!("Failed to encode request body: {}", e)))?;
        let response = self.send(HttpMethod::Post, path, Some(payload)).await?;
        decode(&response)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(HttpMethod::Delete, path, None).await?;
        Ok(())
    }

    /// Fetch the signed-in user's profile and refresh the cached copy.
    ///
    /// A failure to write the cache is logged and otherwise ignored.
    #[instrument(skip(self))]
    pub async fn user_info(&self) -> Result<UserInfo> {
        let info: UserInfo = self.get_json(USER_INFO_PATH).await?;

        match serde_json::to_string(&info) {
            Ok(json) => {
                if let Err(e) = self
                    .settings_store
                    .set_string(USER_INFO_CACHE_KEY, &json)
                    .await
                {
                    warn!(error = %e, "Failed to cache user info");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize user info for caching"),
        }

        Ok(info)
    }

    /// Last profile fetched by [`user_info`](Self::user_info), if any.
    ///
    /// A cached value that no longer decodes is removed and reported as
    /// absent.
    pub async fn cached_user_info(&self) -> Result<Option<UserInfo>> {
        let Some(json) = self
            .settings_store
            .get_string(USER_INFO_CACHE_KEY)
            .await
            .map_err(|e| ApiError::Unknown(format!("Failed to read cache: {}", e)))?
        else {
            return Ok(None);
        };

        match serde_json::from_str(&json) {
            Ok(info) => Ok(Some(info)),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable cached user info");
                self.clear_cache().await?;
                Ok(None)
            }
        }
    }

    /// Drop cached gateway data.
    pub async fn clear_cache(&self) -> Result<()> {
        self.settings_store
            .delete(USER_INFO_CACHE_KEY)
            .await
            .map_err(|e| ApiError::Unknown(format!("Failed to clear cache: {}", e)))?;
        debug!("Gateway cache cleared");
        Ok(())
    }

    async fn drop_cache_after_expiry(&self) {
        if let Err(e) = self.clear_cache().await {
            warn!(error = %e, "Failed to clear gateway cache");
        }
    }

    async fn send(&self, method: HttpMethod, path: &str, body: Option<Vec<u8>>) -> Result<HttpResponse> {
        let was_authenticated = self.session.is_authenticated();
        let token = match self.session.active_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                if was_authenticated {
                    self.drop_cache_after_expiry().await;
                }
                debug!("No active session, refusing gateway call");
                return Err(ApiError::Unauthorized);
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear expired session");
                self.drop_cache_after_expiry().await;
                return Err(ApiError::Unauthorized);
            }
        };

        let mut request = HttpRequest::new(method, self.endpoint(path).as_str())
            .header("Authorization", token.authorization_header())
            .header("Accept", "application/json")
            .timeout(self.read_timeout);
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(body.into());
        }

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(ApiError::from_bridge)?;

        match response.status {
            status if response.is_success() => {
                debug!(status, "Gateway call succeeded");
                Ok(response)
            }
            401 => {
                warn!("Gateway rejected the access token");
                match self.session.expire_token(&token, "gateway returned 401").await {
                    Ok(true) => self.drop_cache_after_expiry().await,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(error = %e, "Failed to clear expired session");
                        self.drop_cache_after_expiry().await;
                    }
                }
                Err(ApiError::Unauthorized)
            }
            status => {
                let error = ApiError::from_response(status, &response.body);
                if response.is_server_error() {
                    warn!(status, error = %error, "Gateway call failed");
                } else {
                    debug!(status, error = %error, "Gateway call rejected");
                }
                Err(error)
            }
        }
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    let body: &[u8] = if response.body.is_empty() {
        b"null"
    } else {
        &response.body[..]
    };
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Unknown(format!("Failed to decode response: {}", e)))
}
