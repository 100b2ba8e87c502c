use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;

use super::{IndexError, IndexHit, SearchHits, SearchIndex};
use crate::office::Office;
use crate::search::filters::GeoPoint;
use crate::search::query::{DemographicFlag, QueryFilter, ScoreField, SortClause, StructuredQuery};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// An office as the index sees it: the record plus its per-occupation scores.
#[derive(Debug, Clone)]
pub struct IndexedOffice {
    pub office: Office,
    pub occupation_scores: HashMap<String, f64>,
}

impl IndexedOffice {
    pub fn new(office: Office) -> Self {
        Self {
            office,
            occupation_scores: HashMap::new(),
        }
    }

    pub fn with_score(mut self, occupation_code: impl Into<String>, score: f64) -> Self {
        self.occupation_scores.insert(occupation_code.into(), score);
        self
    }

    fn location(&self) -> GeoPoint {
        GeoPoint::new(self.office.latitude, self.office.longitude)
    }

    fn headcount(&self) -> Option<u32> {
        self.office
            .headcount
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
    }

    fn score(&self, ScoreField(code): &ScoreField) -> Option<f64> {
        self.occupation_scores.get(code).copied()
    }

    fn matches(&self, filter: &QueryFilter) -> bool {
        match filter {
            QueryFilter::IndustryIn(codes) => codes.contains(&self.office.naf),
            QueryFilter::HeadcountAtMost(max) => self.headcount().is_some_and(|h| h <= *max),
            QueryFilter::HeadcountAtLeast(min) => self.headcount().is_some_and(|h| h >= *min),
            QueryFilter::Flag(flag) => match flag {
                DemographicFlag::Apprenticeship => self.office.flag_alternance,
                DemographicFlag::Junior => self.office.flag_junior,
                DemographicFlag::Senior => self.office.flag_senior,
                DemographicFlag::Disability => self.office.flag_handicap,
            },
            QueryFilter::HasScore(field) => self.score(field).is_some(),
            QueryFilter::WithinRadius { origin, radius_km } => {
                haversine_km(*origin, self.location()) <= f64::from(*radius_km)
            }
        }
    }

    fn sort_value(&self, clause: &SortClause) -> Option<f64> {
        match clause {
            SortClause::DistanceAsc { origin } => Some(haversine_km(*origin, self.location())),
            SortClause::ScoreDesc(field) => self.score(field),
        }
    }
}

/// Evaluates structured queries over documents held in memory, with the same
/// filter and sort semantics as the Elasticsearch index.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    documents: Vec<IndexedOffice>,
}

fn compare_clause(clause: &SortClause, a: Option<f64>, b: Option<f64>) -> Ordering {
    // Missing values sort last in both directions.
    match (a, b) {
        (Some(a), Some(b)) => match clause {
            SortClause::DistanceAsc { .. } => a.total_cmp(&b),
            SortClause::ScoreDesc(_) => b.total_cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl InMemoryIndex {
    pub fn new(documents: impl IntoIterator<Item = IndexedOffice>) -> Self {
        Self {
            documents: documents.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn matching<'a>(&'a self, query: &'a StructuredQuery) -> impl Iterator<Item = &'a IndexedOffice> {
        self.documents
            .iter()
            .filter(|doc| query.filters.iter().all(|filter| doc.matches(filter)))
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn count(&self, query: &StructuredQuery) -> Result<u64, IndexError> {
        Ok(self.matching(query).count() as u64)
    }

    async fn search(&self, query: &StructuredQuery) -> Result<SearchHits, IndexError> {
        let mut hits: Vec<IndexHit> = self
            .matching(query)
            .map(|doc| IndexHit {
                id: doc.office.siret.clone(),
                sort: query.sort.iter().map(|clause| doc.sort_value(clause)).collect(),
            })
            .collect();

        hits.sort_by(|a, b| {
            query
                .sort
                .iter()
                .enumerate()
                .map(|(i, clause)| compare_clause(clause, a.sort[i], b.sort[i]))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        let total = hits.len() as u64;
        let from = query.from.unwrap_or(0) as usize;
        let size = query.size.map(|s| s as usize).unwrap_or(hits.len());
        let hits = hits.into_iter().skip(from).take(size).collect();

        Ok(SearchHits { total, hits })
    }
}
