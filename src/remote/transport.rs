use crate::remote::error::RemoteError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Status and decoded body of a finished GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Minimal HTTP capability the API client is built on.
///
/// Non-2xx statuses are not errors at this level; only failures to complete
/// the exchange are.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        params: &[(&str, &str)],
    ) -> Result<HttpResponse, RemoteError>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(RemoteError::ClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        params: &[(&str, &str)],
    ) -> Result<HttpResponse, RemoteError> {
        let mut request = self.client.get(url).query(params);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::NetworkRequest(url.to_string(), Box::new(e)))?;
        let status = response.status().as_u16();
        // AEMET serves its data files as ISO-8859-15; text() honours the charset.
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::NetworkRequest(url.to_string(), Box::new(e)))?;
        Ok(HttpResponse { status, body })
    }
}
