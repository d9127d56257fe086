use crate::config::ProviderId;

/// Reasons a single provider call can fail.
///
/// These never reach the caller on their own; the racer only reports them
/// once every provider has failed.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response started but its body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The provider answered with an error status and error statuses are rejected.
    #[error("provider answered with status {0}")]
    Status(u16),

    /// Free-form failure, used by non-HTTP fetchers.
    #[error("{0}")]
    Other(String),
}

/// Invalid race or provider configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// No providers were configured.
    #[error("no providers configured")]
    NoProviders,

    /// A provider id is empty or only whitespace.
    #[error("provider id must not be empty")]
    EmptyProviderId,

    /// A URL template does not have exactly one `{query}` slot.
    #[error(
        "provider {provider}: URL template must contain exactly one {{query}} slot, found {found}"
    )]
    QuerySlot { provider: ProviderId, found: usize },

    /// An entry of the provider list could not be parsed.
    #[error("invalid provider entry {0:?}, expected id=url_template")]
    ProviderEntry(String),

    /// The race deadline is zero.
    #[error("race deadline must be greater than zero")]
    ZeroDeadline,

    /// The in-flight race limit is zero.
    #[error("max in-flight races must be greater than zero")]
    ZeroMaxInFlight,

    /// The in-flight race limit exceeds what the limiter can hold.
    #[error("max in-flight races must be at most {max}")]
    MaxInFlightTooLarge { max: usize },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

/// Invalid lookup query.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("query must not be empty")]
    Empty,
}
