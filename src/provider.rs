//! Single-provider lookups.
//!
//! A [`Fetcher`] performs exactly one call against one provider and always
//! hands back a tagged [`ProviderOutcome`]; transport problems are reported
//! as [`ProviderOutcome::Failure`] instead of being raised.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{
    config::{ProviderConfig, RaceConfig},
    errors::{ConfigError, FetchError},
    types::{ProviderOutcome, Query},
};

/// Performs one lookup against one provider.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, provider: &ProviderConfig, query: &Query) -> ProviderOutcome;
}

/// [`Fetcher`] issuing a plain HTTP GET per lookup.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    reject_error_status: bool,
}

impl HttpFetcher {
    /// Builds a fetcher with its own connection pool from the race configuration.
    pub fn new(cfg: &RaceConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ConfigError::HttpClient)?;

        Ok(Self::with_client(http, cfg.reject_error_status))
    }

    /// Wraps an existing client, e.g. one shared with other parts of an application.
    pub fn with_client(http: Client, reject_error_status: bool) -> Self {
        Self {
            http,
            reject_error_status,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, provider: &ProviderConfig, query: &Query) -> ProviderOutcome {
        let url = provider.url_for(query);
        let failure = |reason| ProviderOutcome::Failure {
            provider: provider.id.clone(),
            reason,
        };

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return failure(FetchError::Transport(e)),
        };

        let status = response.status();
        debug!(provider = %provider.id, %url, status = status.as_u16(), "provider responded");
        if self.reject_error_status && (status.is_client_error() || status.is_server_error()) {
            return failure(FetchError::Status(status.as_u16()));
        }

        // Lossy: undecodable bytes are replaced, never rejected.
        match response.text().await {
            Ok(body) => ProviderOutcome::Success {
                provider: provider.id.clone(),
                body,
            },
            Err(e) => failure(FetchError::Body(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn provider_for(server: &MockServer) -> ProviderConfig {
        ProviderConfig::new("mock", format!("{}/cep/{{query}}/json", server.uri())).unwrap()
    }

    fn query() -> Query {
        Query::new("01001000").unwrap()
    }

    #[tokio::test]
    async fn success_returns_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cep/01001000/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"cep":"01001-000"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&RaceConfig::default()).unwrap();
        let outcome = fetcher.fetch(&provider_for(&server), &query()).await;

        match outcome {
            ProviderOutcome::Success { provider, body } => {
                assert_eq!(provider.as_str(), "mock");
                assert_eq!(body, r#"{"cep":"01001-000"}"#);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_status_still_counts_as_success_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&RaceConfig::default()).unwrap();
        let outcome = fetcher.fetch(&provider_for(&server), &query()).await;

        assert!(matches!(
            outcome,
            ProviderOutcome::Success { ref body, .. } if body == "not found"
        ));
    }

    #[tokio::test]
    async fn invalid_utf8_body_is_decoded_lossily() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, b'o', b'k']))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&RaceConfig::default()).unwrap();
        let outcome = fetcher.fetch(&provider_for(&server), &query()).await;

        assert!(matches!(
            outcome,
            ProviderOutcome::Success { ref body, .. } if body == "\u{FFFD}ok"
        ));
    }

    #[tokio::test]
    async fn error_status_is_failure_when_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&RaceConfig::strict()).unwrap();
        let outcome = fetcher.fetch(&provider_for(&server), &query()).await;

        assert!(matches!(
            outcome,
            ProviderOutcome::Failure {
                reason: FetchError::Status(500),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_failure() {
        // Bind and drop a listener to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let provider =
            ProviderConfig::new("dead", format!("http://127.0.0.1:{port}/{{query}}")).unwrap();
        let fetcher = HttpFetcher::new(&RaceConfig::default()).unwrap();
        let outcome = fetcher.fetch(&provider, &query()).await;

        assert!(matches!(
            outcome,
            ProviderOutcome::Failure {
                reason: FetchError::Transport(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn request_timeout_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let cfg = RaceConfig {
            request_timeout: Some(Duration::from_millis(50)),
            ..RaceConfig::default()
        };
        let fetcher = HttpFetcher::new(&cfg).unwrap();
        let outcome = fetcher.fetch(&provider_for(&server), &query()).await;

        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn malformed_url_is_failure() {
        let provider = ProviderConfig::new("broken", "not a url/{query}").unwrap();
        let fetcher = HttpFetcher::new(&RaceConfig::default()).unwrap();
        let outcome = fetcher.fetch(&provider, &query()).await;

        assert!(matches!(
            outcome,
            ProviderOutcome::Failure {
                reason: FetchError::Transport(_),
                ..
            }
        ));
    }
}
