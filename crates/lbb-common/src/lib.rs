//! Search-and-ranking core of the office finder: which employers are likely
//! to hire for an occupation around a location, in what order, and what to
//! suggest when there are too few of them.

pub mod config;
pub mod db;
pub mod index;
pub mod logging;
pub mod office;
pub mod search;
pub mod taxonomy;

pub use config::{HeadcountThresholds, PaginationSettings, RadiusTier, SearchSettings};
pub use office::Office;
pub use search::{Fetcher, SearchError, SearchOutcome, SearchRequest};
pub use taxonomy::{Taxonomy, TaxonomyError};
