use thiserror::Error;

/// Failures that abort a search.
///
/// Taxonomy and validation failures mean the search could not be run at all,
/// which callers must be able to tell apart from an empty result set.
/// Index and store failures are surfaced as-is; nothing here retries.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unknown occupation code: {0}")]
    UnknownOccupationCode(String),
    #[error("multi-occupation search is not supported ({0} codes given)")]
    UnsupportedMultiOccupationQuery(usize),
    #[error("invalid result window: to={to} is lower than from={from}")]
    InvalidWindow { from: u64, to: u64 },
    #[error("could not resolve location for zipcode {0}")]
    LocationResolutionFailure(String),
    #[error("search index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("office store unavailable: {0}")]
    StoreUnavailable(String),
}

impl SearchError {
    /// True when the request itself cannot be searched, as opposed to an
    /// infrastructure failure.
    pub fn is_cannot_search(&self) -> bool {
        matches!(
            self,
            SearchError::UnknownOccupationCode(_)
                | SearchError::UnsupportedMultiOccupationQuery(_)
                | SearchError::InvalidWindow { .. }
                | SearchError::LocationResolutionFailure(_)
        )
    }
}

/// Raised when a headcount filter is not a recognised number.
///
/// Always recovered by falling back to "any size".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed size filter: {0:?}")]
pub struct MalformedSizeFilter(pub String);
