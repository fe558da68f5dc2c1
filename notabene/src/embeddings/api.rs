use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};

use crate::config::{default_base_url, parse_provider_model, provider_needs_api_key, EmbeddingsConfig};
use crate::embeddings::Embedder;
use crate::error::{NotabeneError, Result};

#[derive(Debug, Clone)]
struct ApiConfig {
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone, Debug)]
pub struct EmbeddingApiClient {
    client: Client,
    config: ApiConfig,
}

impl EmbeddingApiClient {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model) = parse_provider_model(&config.model);

        if provider_needs_api_key(provider) && config.api_key.is_none() {
            return Err(NotabeneError::Configuration(format!(
                "No API key configured for embedding provider '{provider}'"
            )));
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotabeneError::Embedding(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: ApiConfig {
                base_url,
                api_key: config.api_key.clone(),
                model: model.to_string(),
                max_retries: config.max_retries,
            },
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref api_key) = self.config.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                    NotabeneError::Configuration(format!("Invalid API key header: {e}"))
                })?,
            );
        }

        Ok(headers)
    }
}

#[async_trait]
impl Embedder for EmbeddingApiClient {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: &texts,
        };
        let headers = self.headers()?;
        let url = format!("{}/embeddings", self.config.base_url);

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .headers(headers.clone())
                .json(&request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        let body: EmbeddingResponse = resp.json().await.map_err(|e| {
                            NotabeneError::Embedding(format!("Failed to parse response: {e}"))
                        })?;
                        let embeddings: Vec<Vec<f32>> =
                            body.data.into_iter().map(|d| d.embedding).collect();

                        if embeddings.len() != texts.len() {
                            return Err(NotabeneError::Embedding(format!(
                                "Provider returned {} embeddings for {} inputs",
                                embeddings.len(),
                                texts.len()
                            )));
                        }
                        return Ok(embeddings);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse().ok());
                        last_error = Some(NotabeneError::ApiRateLimit { retry_after });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(NotabeneError::ApiAuth(body));
                    }

                    if status.is_server_error() {
                        let body = resp.text().await.unwrap_or_default();
                        last_error = Some(NotabeneError::Embedding(format!(
                            "Server error {status}: {body}"
                        )));
                        continue;
                    }

                    let body = resp.text().await.unwrap_or_default();
                    return Err(NotabeneError::Embedding(format!(
                        "API error {status}: {body}"
                    )));
                }
                Err(e) => {
                    last_error = Some(NotabeneError::Embedding(format!("Request failed: {e}")));
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| NotabeneError::Embedding("Unknown error".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embeddings_config(model: &str, api_key: Option<&str>) -> EmbeddingsConfig {
        EmbeddingsConfig {
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
            base_url: None,
            timeout_secs: 5,
            max_retries: 0,
        }
    }

    #[test]
    fn test_missing_key_is_a_configuration_error() {
        let err = EmbeddingApiClient::new(&embeddings_config("mistral/mistral-embed", None))
            .expect_err("key required");
        assert!(matches!(err, NotabeneError::Configuration(_)));
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        let client = EmbeddingApiClient::new(&embeddings_config("ollama/nomic-embed-text", None));
        assert!(client.is_ok());
    }

    #[test]
    fn test_provider_base_url_resolution() {
        let client = EmbeddingApiClient::new(&embeddings_config(
            "mistral/mistral-embed",
            Some("test-key"),
        ))
        .unwrap();
        assert_eq!(client.config.base_url, "https://api.mistral.ai/v1");
        assert_eq!(client.config.model, "mistral-embed");
    }
}
