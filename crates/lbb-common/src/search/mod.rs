//! Office search: filters in, ranked page plus suggestions out.

pub mod code_mapper;
pub mod error;
pub mod fallback;
pub mod fetcher;
pub mod filters;
pub mod gateway;
pub mod geocoding;
pub mod pagination;
pub mod query;
pub mod shuffle;

pub use code_mapper::CodeMapper;
pub use error::{MalformedSizeFilter, SearchError};
pub use fallback::{AlternativeRadius, FallbackPlanner, FallbackSuggestions};
pub use fetcher::{Fetcher, SearchOutcome, SearchRequest};
pub use filters::{
    Audience, DemographicFlags, GeoPoint, HeadcountFilter, SearchFilters, SortMode, Window,
};
pub use gateway::{FetchedPage, MatchCandidate, OccupationScore, SearchGateway};
pub use geocoding::{Geocoder, GeocodingError, ZipcodeEntry, ZipcodeGeocoder};
pub use pagination::{PageLink, PaginationManager, clamp_window};
pub use query::{QueryBuilder, StructuredQuery};
pub use shuffle::{RankedPage, ResultShuffler, ShuffleSeed};
