//! Search index boundary: the index answers structured queries with hit
//! identifiers, per-hit sort values and a total count.

pub mod elastic;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::query::StructuredQuery;

pub use elastic::{ElasticIndex, render_query};
pub use memory::{InMemoryIndex, IndexedOffice};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("index returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected index response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    /// One value per sort clause of the query, in clause order.
    pub sort: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    pub total: u64,
    pub hits: Vec<IndexHit>,
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Short implementation name for logs.
    fn name(&self) -> &'static str;

    async fn count(&self, query: &StructuredQuery) -> Result<u64, IndexError>;

    async fn search(&self, query: &StructuredQuery) -> Result<SearchHits, IndexError>;
}
