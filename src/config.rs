use std::{fmt, time::Duration};

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::{errors::ConfigError, types::Query};

/// Placeholder substituted with the query in a provider URL template.
pub const QUERY_SLOT: &str = "{query}";

/// Unique identifier for a lookup provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Configuration for a single lookup provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Unique identifier for this provider.
    pub id: ProviderId,
    /// Endpoint URL with a single `{query}` slot.
    pub url_template: String,
}

impl ProviderConfig {
    /// Creates a provider, checking that the template has exactly one `{query}` slot.
    pub fn new(
        id: impl Into<ProviderId>,
        url_template: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let id = id.into();
        let url_template = url_template.into();

        if id.0.trim().is_empty() {
            return Err(ConfigError::EmptyProviderId);
        }

        let slots = url_template.matches(QUERY_SLOT).count();
        if slots != 1 {
            return Err(ConfigError::QuerySlot {
                provider: id,
                found: slots,
            });
        }

        Ok(Self { id, url_template })
    }

    /// Builds the request URL for `query`.
    ///
    /// The query lands in a path segment, so it is percent-encoded first.
    pub fn url_for(&self, query: &Query) -> String {
        self.url_template
            .replacen(QUERY_SLOT, &urlencoding::encode(query.as_str()), 1)
    }
}

/// The two public CEP providers raced by default.
pub fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            id: ProviderId::from("brasilapi"),
            url_template: "https://brasilapi.com.br/api/cep/v1/{query}".to_string(),
        },
        ProviderConfig {
            id: ProviderId::from("viacep"),
            url_template: "https://viacep.com.br/ws/{query}/json/".to_string(),
        },
    ]
}

/// Race strategy configuration.
#[derive(Debug, Clone)]
pub struct RaceConfig {
    /// Maximum time to wait for any provider to answer successfully.
    ///
    /// Once it elapses the race is reported as timed out, whatever the
    /// providers are still doing.
    pub deadline: Duration,

    /// Optional per-request timeout handed to the HTTP client.
    ///
    /// A provider that hits it reports a failure rather than waiting out the
    /// race deadline.
    pub request_timeout: Option<Duration>,

    /// Maximum number of races allowed in flight at once.
    pub max_in_flight: usize,

    /// Treat 4xx/5xx responses as provider failures.
    ///
    /// Off by default: any response body that arrives counts as an answer.
    pub reject_error_status: bool,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(1),
            request_timeout: None,
            max_in_flight: 256,
            reject_error_status: false,
        }
    }
}

impl RaceConfig {
    /// Creates a strict configuration.
    ///
    /// - 500ms deadline
    /// - error statuses count as failures
    pub fn strict() -> Self {
        Self {
            deadline: Duration::from_millis(500),
            reject_error_status: true,
            ..Self::default()
        }
    }

    /// Creates a relaxed configuration for slow networks.
    ///
    /// - 3 second deadline
    /// - 2 second per-request timeout
    pub fn relaxed() -> Self {
        Self {
            deadline: Duration::from_secs(3),
            request_timeout: Some(Duration::from_secs(2)),
            ..Self::default()
        }
    }

    /// Returns this configuration with `deadline` replaced.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Checks that the deadline is non-zero and the in-flight limit is
    /// between 1 and [`Semaphore::MAX_PERMITS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deadline.is_zero() {
            return Err(ConfigError::ZeroDeadline);
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroMaxInFlight);
        }
        if self.max_in_flight > Semaphore::MAX_PERMITS {
            return Err(ConfigError::MaxInFlightTooLarge {
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(())
    }
}
