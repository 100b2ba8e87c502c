use std::{collections::HashMap, fmt::Display, future::Future, sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::error::SearchError;
use super::query::{ScoreField, SortClause, StructuredQuery};
use crate::db::OfficeStore;
use crate::index::SearchIndex;
use crate::office::Office;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupationScore {
    pub occupation_code: String,
    pub value: f64,
}

/// One employer matched by a search, with the values it was ranked on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub office: Office,
    /// Kilometers from the search origin, rounded to the nearest integer.
    pub distance_km: u32,
    pub score: i32,
    pub occupation_score: Option<OccupationScore>,
}

impl MatchCandidate {
    pub fn id(&self) -> &str {
        &self.office.siret
    }

    pub fn is_boosted(&self) -> bool {
        self.office.is_boosted()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchedPage {
    pub candidates: Vec<MatchCandidate>,
    pub total: u64,
}

/// Runs structured queries against the index and hydrates hits from the store.
#[derive(Clone)]
pub struct SearchGateway {
    index: Arc<dyn SearchIndex>,
    store: Arc<dyn OfficeStore>,
    timeout: Duration,
}

async fn bounded<T, E, F>(
    timeout: Duration,
    call: &'static str,
    future: F,
    unavailable: fn(String) -> SearchError,
) -> Result<T, SearchError>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(unavailable(format!("{call}: {err}"))),
        Err(_) => Err(unavailable(format!(
            "{call} timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Integer kilometers, rounding half away from zero.
fn rounded_km(raw: f64) -> u32 {
    raw.max(0.0).round() as u32
}

impl SearchGateway {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn OfficeStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            index,
            store,
            timeout,
        }
    }

    pub fn index_name(&self) -> &'static str {
        self.index.name()
    }

    /// Total matches for the query's filters; sort and window are ignored.
    #[instrument(skip(self, query), fields(index = self.index.name()))]
    pub async fn count(&self, query: &StructuredQuery) -> Result<u64, SearchError> {
        let count_query = query.for_count();
        bounded(
            self.timeout,
            "count",
            self.index.count(&count_query),
            SearchError::IndexUnavailable,
        )
        .await
    }

    /// Runs the full query and returns hydrated candidates in index order.
    ///
    /// Offices the store does not know, or that lack a locality, are left
    /// out of the page; `total` still reports the index's own count.
    #[instrument(skip(self, query), fields(index = self.index.name()))]
    pub async fn fetch(&self, query: &StructuredQuery) -> Result<FetchedPage, SearchError> {
        let hits = bounded(
            self.timeout,
            "search",
            self.index.search(query),
            SearchError::IndexUnavailable,
        )
        .await?;

        if hits.hits.is_empty() {
            return Ok(FetchedPage {
                candidates: Vec::new(),
                total: hits.total,
            });
        }

        let distance_index = query.distance_sort_index();
        let score_index = query.score_sort_index();
        let occupation_code = query.sort.iter().find_map(|clause| match clause {
            SortClause::ScoreDesc(ScoreField(code)) => Some(code.clone()),
            _ => None,
        });

        let ids: Vec<String> = hits.hits.iter().map(|hit| hit.id.clone()).collect();
        let offices = bounded(
            self.timeout,
            "offices_by_ids",
            self.store.offices_by_ids(&ids),
            SearchError::StoreUnavailable,
        )
        .await?;
        let mut offices_by_id: HashMap<String, Office> = offices
            .into_iter()
            .map(|office| (office.siret.clone(), office))
            .collect();

        let mut candidates = Vec::with_capacity(hits.hits.len());
        for hit in hits.hits {
            let sort_value = |index: Option<usize>| index.and_then(|i| hit.sort.get(i).copied().flatten());

            let Some(office) = offices_by_id.remove(&hit.id) else {
                warn!(siret = %hit.id, "office returned by the index is missing from the store");
                continue;
            };
            if !office.has_city() {
                info!(siret = %office.siret, city_code = %office.city_code, "dropping office without city");
                continue;
            }

            let distance_km = sort_value(distance_index).map(rounded_km).unwrap_or(0);
            let occupation_score = match (&occupation_code, sort_value(score_index)) {
                (Some(code), Some(value)) => Some(OccupationScore {
                    occupation_code: code.clone(),
                    value,
                }),
                _ => None,
            };

            candidates.push(MatchCandidate {
                score: office.score,
                office,
                distance_km,
                occupation_score,
            });
        }

        Ok(FetchedPage {
            candidates,
            total: hits.total,
        })
    }
}
