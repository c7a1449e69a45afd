//! HTTP/JSON backend.

use async_trait::async_trait;
use chat_types::{
    DeviceInfoResponse, LatestMessageResponse, MessageListResponse, SubmitRequest, SubmitResponse,
};
use serde::de::DeserializeOwned;

use super::{Backend, BackendError};
use crate::config::BackendConfig;

/// Backend reached over HTTP with JSON bodies.
pub struct HttpBackend {
    config: BackendConfig,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a new HTTP backend.
    ///
    /// The request timeout from `config` applies to every call.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Build the absolute URL for a route.
    pub fn url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = self.url(path);
        tracing::trace!(%url, "GET");

        let response = self.http.get(&url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        Ok(chat_types::decode(&body)?)
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn device_info(&self) -> Result<DeviceInfoResponse, BackendError> {
        self.get_json(&self.config.device_info_path).await
    }

    async fn messages(&self) -> Result<MessageListResponse, BackendError> {
        self.get_json(&self.config.messages_path).await
    }

    async fn latest_message(&self) -> Result<LatestMessageResponse, BackendError> {
        self.get_json(&self.config.latest_path).await
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, BackendError> {
        let url = self.url(&self.config.submit_path);
        tracing::trace!(%url, "POST");

        let body = chat_types::encode(request)?;
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;

        // The transport status is authoritative; an unreadable body on a 2xx
        // still counts as accepted.
        let ack: SubmitResponse = chat_types::decode(&body).unwrap_or_default();
        if ack.is_rejected() {
            return Err(BackendError::Rejected(
                ack.message
                    .unwrap_or_else(|| "message was not stored".to_string()),
            ));
        }
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(BackendConfig {
            base_url: base_url.to_string(),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn url_joins_base_and_route() {
        let backend = backend("http://192.168.1.172:8080");
        assert_eq!(backend.url("/"), "http://192.168.1.172:8080/");
        assert_eq!(
            backend.url("/messages"),
            "http://192.168.1.172:8080/messages"
        );
    }

    #[test]
    fn url_handles_trailing_and_missing_slashes() {
        let backend = backend("http://host:8080/api/");
        assert_eq!(backend.url("/messages"), "http://host:8080/api/messages");
        assert_eq!(backend.url("message"), "http://host:8080/api/message");
    }

    #[test]
    fn debug_shows_base_url() {
        let backend = backend("http://host:8080");
        assert!(format!("{:?}", backend).contains("http://host:8080"));
    }
}
