//! HTTP Transport
//!
//! [`Transport`] over reqwest. Knows each provider's endpoint and auth
//! header, nothing about message shapes.

use std::time::Duration;

use agentloop_core::{
    error::{AgentError, Result},
    provider::{Provider, ProviderRequest, Transport},
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, InvalidHeaderValue};
use serde_json::Value;

/// Default timeout for provider requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Sends provider requests over HTTPS
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, timeout })
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full endpoint URL for a request
    pub fn endpoint(request: &ProviderRequest) -> String {
        let base = request.base_url.trim_end_matches('/');
        match request.provider {
            Provider::OpenAi => format!("{base}/v1/chat/completions"),
            Provider::Anthropic => format!("{base}/v1/messages"),
            Provider::Gemini => {
                format!("{base}/v1beta/models/{}:generateContent", request.model)
            }
        }
    }

    /// Provider-specific auth headers
    fn headers(request: &ProviderRequest) -> Result<HeaderMap> {
        let api_key = request
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::missing_api_key(request.provider))?;

        let invalid = |_: InvalidHeaderValue| {
            AgentError::config(format!("Invalid API key for provider: {}", request.provider))
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match request.provider {
            Provider::OpenAi => {
                let value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(invalid)?;
                headers.insert(AUTHORIZATION, value);
            }
            Provider::Anthropic => {
                headers.insert("x-api-key", HeaderValue::from_str(api_key).map_err(invalid)?);
                headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
            }
            Provider::Gemini => {
                headers.insert("x-goog-api-key", HeaderValue::from_str(api_key).map_err(invalid)?);
            }
        }
        Ok(headers)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ProviderRequest) -> Result<Value> {
        let url = Self::endpoint(request);
        let headers = Self::headers(request)?;
        let provider = request.provider;

        tracing::debug!(provider = %provider, url = %url, "POST");

        let response = self
            .http
            .post(&url)
            .headers(headers)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| AgentError::Transport {
                provider,
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AgentError::Transport {
            provider,
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            tracing::warn!(provider = %provider, status = status.as_u16(), "Provider returned an error");
            return Err(AgentError::Transport {
                provider,
                message: format!("HTTP {}: {body}", status.as_u16()),
            });
        }

        serde_json::from_str(&body).map_err(|e| AgentError::Transport {
            provider,
            message: format!("Invalid JSON response: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(provider: Provider, base_url: &str) -> ProviderRequest {
        ProviderRequest {
            provider,
            model: provider.default_model().into(),
            api_key: Some("k".into()),
            base_url: base_url.into(),
            body: json!({}),
        }
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(
            HttpTransport::endpoint(&request(Provider::OpenAi, "https://api.openai.com/")),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            HttpTransport::endpoint(&request(Provider::Anthropic, "http://x")),
            "http://x/v1/messages"
        );
        assert_eq!(
            HttpTransport::endpoint(&request(Provider::Gemini, "http://x")),
            "http://x/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_auth_headers() {
        let headers = HttpTransport::headers(&request(Provider::OpenAi, "http://x")).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer k");

        let headers = HttpTransport::headers(&request(Provider::Anthropic, "http://x")).unwrap();
        assert_eq!(headers["x-api-key"], "k");
        assert_eq!(headers["anthropic-version"], "2023-06-01");

        let headers = HttpTransport::headers(&request(Provider::Gemini, "http://x")).unwrap();
        assert_eq!(headers["x-goog-api-key"], "k");
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let mut request = request(Provider::Gemini, "http://x");
        request.api_key = None;
        let err = HttpTransport::headers(&request).unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }
}
