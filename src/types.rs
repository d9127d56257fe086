//! Values flowing through a race: the query, per-provider outcomes and the
//! final decision.

use std::fmt;

use crate::{
    config::ProviderId,
    errors::{FetchError, QueryError},
};

/// Opaque lookup key, e.g. a postal code.
///
/// Surrounding whitespace is trimmed; nothing else is validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query(String);

impl Query {
    /// Creates a query from `raw`, rejecting blank input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, QueryError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(QueryError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the trimmed query text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Query {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Result of one provider call.
#[derive(Debug)]
pub enum ProviderOutcome {
    /// The provider delivered a response body.
    ///
    /// The body is decoded as text using the response charset (UTF-8 when
    /// none is declared); invalid byte sequences become U+FFFD.
    Success { provider: ProviderId, body: String },
    /// The call failed before a body could be delivered.
    Failure {
        provider: ProviderId,
        reason: FetchError,
    },
}

impl ProviderOutcome {
    /// Whether the provider delivered a body.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Final decision of a race. Exactly one is produced per race.
#[derive(Debug)]
pub enum RaceResult {
    /// The first provider to answer successfully.
    Won { provider: ProviderId, body: String },
    /// No provider answered successfully before the deadline.
    TimedOut,
    /// Every provider failed before the deadline.
    AllFailed {
        failures: Vec<(ProviderId, FetchError)>,
    },
}

impl RaceResult {
    /// Short tag naming the variant, used in logs and JSON output.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Won { .. } => "won",
            Self::TimedOut => "timed_out",
            Self::AllFailed { .. } => "all_failed",
        }
    }

    /// Returns the winning provider, if the race was won.
    pub fn winner(&self) -> Option<&ProviderId> {
        match self {
            Self::Won { provider, .. } => Some(provider),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_trims_whitespace() {
        let q = Query::new("  01001000\n").unwrap();
        assert_eq!(q.as_str(), "01001000");
    }

    #[test]
    fn blank_query_is_rejected() {
        assert_eq!(Query::new(""), Err(QueryError::Empty));
        assert_eq!("   ".parse::<Query>(), Err(QueryError::Empty));
    }

    #[test]
    fn outcome_accessors() {
        let ok = ProviderOutcome::Success {
            provider: ProviderId::from("a"),
            body: "x".into(),
        };
        let err = ProviderOutcome::Failure {
            provider: ProviderId::from("b"),
            reason: FetchError::Other("boom".into()),
        };
        assert!(ok.is_success());
        assert!(!err.is_success());
    }

    #[test]
    fn race_result_tags() {
        let won = RaceResult::Won {
            provider: ProviderId::from("a"),
            body: String::new(),
        };
        assert_eq!(won.tag(), "won");
        assert_eq!(won.winner().map(ProviderId::as_str), Some("a"));
        assert_eq!(RaceResult::TimedOut.tag(), "timed_out");
        assert!(RaceResult::TimedOut.winner().is_none());
        assert_eq!(RaceResult::AllFailed { failures: vec![] }.tag(), "all_failed");
    }
}
