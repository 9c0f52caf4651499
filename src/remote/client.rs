use crate::config::ClientConfig;
use crate::remote::error::RemoteError;
use crate::remote::transport::{HttpResponse, HttpTransport, ReqwestTransport};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

const HEADERS: [(&str, &str); 2] = [("cache-control", "no-cache"), ("Accept", "application/json")];
const EMPTY_RESPONSE_MESSAGE: &str = "Nothing returned. Please check the API key";
const STATUS_RATE_LIMITED: u16 = 429;

/// Outcome class of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    Ok,
    NotFound,
    Unauthorized,
    /// The dispatch request came back with an empty body.
    Empty,
    /// The dispatch body was not a JSON envelope.
    Malformed,
    Other(u16),
}

/// Decoded result of [`RemoteClient::call`].
///
/// Only [`ApiStatus::Ok`] carries `data`; for every other status the envelope
/// (or a descriptive `status` message) ends up in `metadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiPayload {
    pub path: String,
    pub status: ApiStatus,
    pub data: Vec<Map<String, Value>>,
    pub metadata: Map<String, Value>,
}

impl ApiPayload {
    fn without_data(path: &str, status: ApiStatus, metadata: Map<String, Value>) -> Self {
        Self {
            path: path.to_string(),
            status,
            data: Vec::new(),
            metadata,
        }
    }

    fn with_message(path: &str, status: ApiStatus, message: String) -> Self {
        let mut metadata = Map::new();
        metadata.insert("status".to_string(), json!(message));
        Self::without_data(path, status, metadata)
    }

    pub fn is_ok(&self) -> bool {
        self.status == ApiStatus::Ok
    }

    /// The provider's description of the outcome, if any.
    pub fn description(&self) -> String {
        ["descripcion", "status"]
            .iter()
            .find_map(|key| self.metadata.get(*key).and_then(Value::as_str))
            .unwrap_or("no description")
            .to_string()
    }

    /// Fails only on [`ApiStatus::Unauthorized`]; every other status passes
    /// through for the caller to recover from.
    pub fn reject_unauthorized(self) -> Result<Self, RemoteError> {
        match self.status {
            ApiStatus::Unauthorized => Err(RemoteError::Authentication {
                description: self.description(),
            }),
            _ => Ok(self),
        }
    }

    /// Turns every status but [`ApiStatus::Ok`] into a typed error.
    pub fn error_for_status(self) -> Result<Self, RemoteError> {
        let description = self.description();
        match self.status {
            ApiStatus::Ok => Ok(self),
            ApiStatus::Unauthorized => Err(RemoteError::Authentication { description }),
            ApiStatus::NotFound => Err(RemoteError::ResourceNotFound {
                path: self.path,
                description,
            }),
            ApiStatus::Empty | ApiStatus::Malformed => Err(RemoteError::MalformedResponse {
                path: self.path,
                description,
            }),
            ApiStatus::Other(status) => Err(RemoteError::Provider {
                path: self.path,
                status,
                description,
            }),
        }
    }
}

/// Authenticated client for the two-stage AEMET protocol.
///
/// Cloning is cheap and clones share the transport and the cancellation token.
/// Each call races its back-off against a child of the token current when the
/// call started; [`RemoteClient::reset_cancellation`] installs a fresh token so
/// later calls are unaffected by an earlier cancellation.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn HttpTransport>,
    config: ClientConfig,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl RemoteClient {
    /// Client over the default `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self, RemoteError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            config,
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.transport)
    }

    /// Token that aborts any pending rate-limit back-off once cancelled.
    ///
    /// Calls started while the token is cancelled fail with
    /// [`RemoteError::Cancelled`] until [`RemoteClient::reset_cancellation`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the shared token with a fresh one and returns it.
    ///
    /// Calls already running keep observing the token they started with.
    pub fn reset_cancellation(&self) -> CancellationToken {
        let fresh = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = fresh.clone();
        debug!("Cancellation token reset");
        fresh
    }

    /// Requests `path` (relative to the base URL) and follows the envelope.
    ///
    /// # Errors
    ///
    /// * [`RemoteError::RateLimitExceeded`] once `max_attempts` requests were all rate limited.
    /// * [`RemoteError::Cancelled`] if the token fires while waiting to retry.
    /// * [`RemoteError::NetworkRequest`], [`RemoteError::HttpStatus`] and
    ///   [`RemoteError::JsonParse`] when the data or metadata resource cannot be fetched.
    ///
    /// Provider-reported 401, 404, empty and malformed envelopes are not errors
    /// here; they come back as an [`ApiPayload`] with the matching [`ApiStatus`].
    pub async fn call(&self, path: &str) -> Result<ApiPayload, RemoteError> {
        let url = self.config.url_for(path);
        let params = [("api_key", self.config.api_key.as_str())];
        info!("Requesting AEMET resource {}", path);
        let cancel = self.cancellation_token().child_token();
        let response = self.get_with_backoff(&url, &params, path, &cancel).await?;

        if response.body.trim().is_empty() {
            warn!("Empty response from AEMET for {}", path);
            return Ok(ApiPayload::with_message(
                path,
                ApiStatus::Empty,
                EMPTY_RESPONSE_MESSAGE.to_string(),
            ));
        }
        let envelope = match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Object(envelope)) => envelope,
            Ok(other) => {
                return Ok(ApiPayload::with_message(
                    path,
                    ApiStatus::Malformed,
                    format!("Expected a JSON object envelope, got: {}", other),
                ))
            }
            Err(e) => {
                return Ok(ApiPayload::with_message(
                    path,
                    ApiStatus::Malformed,
                    format!("Envelope is not valid JSON: {}", e),
                ))
            }
        };

        let status = envelope
            .get("estado")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(response.status);
        debug!("Envelope for {} has status {}", path, status);

        match status {
            200 => self.follow(path, envelope, &cancel).await,
            404 => Ok(ApiPayload::without_data(path, ApiStatus::NotFound, envelope)),
            401 => Ok(ApiPayload::without_data(path, ApiStatus::Unauthorized, envelope)),
            other => Ok(ApiPayload::without_data(path, ApiStatus::Other(other), envelope)),
        }
    }

    /// Second stage: fetch the `datos` and `metadatos` resources.
    async fn follow(
        &self,
        path: &str,
        envelope: Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<ApiPayload, RemoteError> {
        let Some(data_url) = envelope.get("datos").and_then(Value::as_str) else {
            return Ok(ApiPayload::with_message(
                path,
                ApiStatus::Malformed,
                "Envelope has status 200 but no 'datos' URL".to_string(),
            ));
        };
        let data: Vec<Map<String, Value>> = self.fetch_json(data_url, path, cancel).await?;

        let metadata = match envelope.get("metadatos").and_then(Value::as_str) {
            Some(metadata_url) => self.fetch_json(metadata_url, path, cancel).await?,
            None => Map::new(),
        };
        info!("Received {} records for {}", data.len(), path);

        Ok(ApiPayload {
            path: path.to_string(),
            status: ApiStatus::Ok,
            data,
            metadata,
        })
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<T, RemoteError> {
        let response = self.get_with_backoff(url, &[], path, cancel).await?;
        if !(200..300).contains(&response.status) {
            warn!("HTTP {} for {}", response.status, url);
            return Err(RemoteError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        serde_json::from_str(&response.body).map_err(|source| RemoteError::JsonParse {
            url: url.to_string(),
            source,
        })
    }

    /// GET that sleeps and retries while the answer is a 429, up to `max_attempts`.
    async fn get_with_backoff(
        &self,
        url: &str,
        params: &[(&str, &str)],
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, RemoteError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RemoteError::Cancelled(path.to_string()));
            }
            attempt += 1;
            let response = self.transport.get(url, &HEADERS, params).await?;
            if !is_rate_limited(&response) {
                return Ok(response);
            }
            if attempt >= max_attempts {
                return Err(RemoteError::RateLimitExceeded {
                    path: path.to_string(),
                    attempts: attempt,
                });
            }
            warn!(
                "Rate limited on {} (attempt {}/{}), retrying in {:?}",
                path, attempt, max_attempts, self.config.rate_limit_cooldown
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(RemoteError::Cancelled(path.to_string()));
                }
                _ = tokio::time::sleep(self.config.rate_limit_cooldown) => {}
            }
        }
    }
}

/// A 429 can come as the HTTP status or only inside the envelope.
fn is_rate_limited(response: &HttpResponse) -> bool {
    if response.status == STATUS_RATE_LIMITED {
        return true;
    }
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|v| v.get("estado").and_then(Value::as_u64))
        == Some(u64::from(STATUS_RATE_LIMITED))
}
