use serde::Serialize;
use tracing::debug;

use super::{
    code_mapper::CodeMapper,
    error::SearchError,
    filters::{GeoPoint, HeadcountFilter, SearchFilters, SortMode},
};
use crate::config::HeadcountThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DemographicFlag {
    Apprenticeship,
    Junior,
    Senior,
    Disability,
}

/// Per-occupation relevance score an index sorts on, keyed by occupation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreField(pub String);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFilter {
    IndustryIn(Vec<String>),
    HeadcountAtMost(u32),
    HeadcountAtLeast(u32),
    Flag(DemographicFlag),
    HasScore(ScoreField),
    WithinRadius { origin: GeoPoint, radius_km: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortClause {
    DistanceAsc { origin: GeoPoint },
    ScoreDesc(ScoreField),
}

/// Index-agnostic query: ANDed filters, ordered sort clauses and an optional
/// `from`/`size` page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredQuery {
    pub filters: Vec<QueryFilter>,
    pub sort: Vec<SortClause>,
    pub from: Option<u64>,
    pub size: Option<u64>,
}

impl StructuredQuery {
    /// Same filters, without sort or pagination, for count requests.
    pub fn for_count(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            sort: Vec::new(),
            from: None,
            size: None,
        }
    }

    /// Position of the distance value among each hit's sort values.
    pub fn distance_sort_index(&self) -> Option<usize> {
        self.sort
            .iter()
            .position(|clause| matches!(clause, SortClause::DistanceAsc { .. }))
    }

    pub fn score_sort_index(&self) -> Option<usize> {
        self.sort
            .iter()
            .position(|clause| matches!(clause, SortClause::ScoreDesc(_)))
    }
}

/// Translates [`SearchFilters`] into a [`StructuredQuery`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    mapper: CodeMapper,
    headcount: HeadcountThresholds,
}

impl QueryBuilder {
    pub fn new(mapper: CodeMapper, headcount: HeadcountThresholds) -> Self {
        Self { mapper, headcount }
    }

    pub fn mapper(&self) -> &CodeMapper {
        &self.mapper
    }

    pub fn build(&self, filters: &SearchFilters) -> Result<StructuredQuery, SearchError> {
        let industries = self
            .mapper
            .resolve_one(&filters.occupation_code, &filters.industry_codes)?;

        let mut query_filters = vec![QueryFilter::IndustryIn(industries)];

        match filters.headcount {
            HeadcountFilter::SmallOnly => {
                query_filters.push(QueryFilter::HeadcountAtMost(
                    self.headcount.small_only_maximum,
                ));
            }
            HeadcountFilter::BigOnly => {
                query_filters.push(QueryFilter::HeadcountAtLeast(
                    self.headcount.big_only_minimum,
                ));
            }
            HeadcountFilter::Any => {}
        }

        let flags = filters.flags;
        for (enabled, flag) in [
            (flags.apprenticeship, DemographicFlag::Apprenticeship),
            (flags.junior, DemographicFlag::Junior),
            (flags.senior, DemographicFlag::Senior),
            (flags.disability, DemographicFlag::Disability),
        ] {
            if enabled {
                query_filters.push(QueryFilter::Flag(flag));
            }
        }

        let score_field = ScoreField(filters.occupation_code.clone());
        query_filters.push(QueryFilter::HasScore(score_field.clone()));

        let distance_sort = SortClause::DistanceAsc {
            origin: filters.origin,
        };
        let score_sort = SortClause::ScoreDesc(score_field);
        let sort = match filters.sort {
            SortMode::ByDistance => vec![distance_sort, score_sort],
            SortMode::ByScore => vec![score_sort, distance_sort],
        };

        query_filters.push(QueryFilter::WithinRadius {
            origin: filters.origin,
            radius_km: filters.radius_km,
        });

        let (from, size) = match filters.window {
            Some(window) => {
                if window.to + 1 < window.from {
                    return Err(SearchError::InvalidWindow {
                        from: window.from,
                        to: window.to,
                    });
                }
                let from = window.from.saturating_sub(1);
                (Some(from), Some(window.to + 1 - window.from))
            }
            None => (None, None),
        };

        let query = StructuredQuery {
            filters: query_filters,
            sort,
            from,
            size,
        };
        debug!(?query, "built structured query");
        Ok(query)
    }
}
