use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use super::{IndexError, IndexHit, SearchHits, SearchIndex};
use crate::search::filters::GeoPoint;
use crate::search::query::{DemographicFlag, QueryFilter, ScoreField, SortClause, StructuredQuery};

const LOCATION_FIELD: &str = "locations";

fn score_field_name(ScoreField(code): &ScoreField) -> String {
    format!("score_for_rome_{code}")
}

fn flag_field_name(flag: DemographicFlag) -> &'static str {
    match flag {
        DemographicFlag::Apprenticeship => "flag_alternance",
        DemographicFlag::Junior => "flag_junior",
        DemographicFlag::Senior => "flag_senior",
        DemographicFlag::Disability => "flag_handicap",
    }
}

fn geo(point: GeoPoint) -> Value {
    json!({ "lat": point.latitude, "lon": point.longitude })
}

fn render_filter(filter: &QueryFilter) -> Value {
    match filter {
        QueryFilter::IndustryIn(codes) => json!({ "terms": { "naf": codes } }),
        QueryFilter::HeadcountAtMost(max) => json!({ "range": { "headcount": { "lte": max } } }),
        QueryFilter::HeadcountAtLeast(min) => json!({ "range": { "headcount": { "gte": min } } }),
        QueryFilter::Flag(flag) => json!({ "term": { flag_field_name(*flag): 1 } }),
        QueryFilter::HasScore(field) => json!({ "exists": { "field": score_field_name(field) } }),
        QueryFilter::WithinRadius { origin, radius_km } => json!({
            "geo_distance": {
                "distance": format!("{radius_km}km"),
                LOCATION_FIELD: geo(*origin),
            }
        }),
    }
}

fn render_sort(clause: &SortClause) -> Value {
    match clause {
        SortClause::DistanceAsc { origin } => json!({
            "_geo_distance": {
                LOCATION_FIELD: geo(*origin),
                "order": "asc",
                "unit": "km",
            }
        }),
        SortClause::ScoreDesc(field) => {
            let mut sort = Map::new();
            sort.insert(score_field_name(field), json!({ "order": "desc" }));
            Value::Object(sort)
        }
    }
}

/// Renders a structured query as an Elasticsearch request body.
pub fn render_query(query: &StructuredQuery) -> Value {
    let filters: Vec<Value> = query.filters.iter().map(render_filter).collect();

    let mut body = Map::new();
    body.insert(
        "query".into(),
        json!({ "bool": { "filter": filters } }),
    );
    if !query.sort.is_empty() {
        body.insert(
            "sort".into(),
            Value::Array(query.sort.iter().map(render_sort).collect()),
        );
    }
    if let Some(from) = query.from {
        body.insert("from".into(), json!(from));
    }
    if let Some(size) = query.size {
        body.insert("size".into(), json!(size));
    }
    Value::Object(body)
}

/// Reads `hits.total`, which is a plain number on older clusters and an
/// object with a `value` on newer ones.
fn parse_total(hits: &Value) -> Result<u64, IndexError> {
    let total = &hits["total"];
    total
        .as_u64()
        .or_else(|| total["value"].as_u64())
        .ok_or_else(|| IndexError::Decode(format!("missing hits.total in {hits}")))
}

fn parse_hits(response: &Value) -> Result<SearchHits, IndexError> {
    let hits = &response["hits"];
    let total = parse_total(hits)?;

    let hits = hits["hits"]
        .as_array()
        .ok_or_else(|| IndexError::Decode("missing hits.hits".to_string()))?
        .iter()
        .map(|hit| {
            let id = hit["_id"]
                .as_str()
                .ok_or_else(|| IndexError::Decode(format!("hit without _id: {hit}")))?
                .to_string();
            let sort = hit["sort"]
                .as_array()
                .map(|values| values.iter().map(Value::as_f64).collect())
                .unwrap_or_default();
            Ok(IndexHit { id, sort })
        })
        .collect::<Result<Vec<_>, IndexError>>()?;

    Ok(SearchHits { total, hits })
}

/// Office index served by an Elasticsearch cluster over HTTP.
#[derive(Debug, Clone)]
pub struct ElasticIndex {
    client: Client,
    base_url: String,
    index: String,
}

impl ElasticIndex {
    pub fn new(
        base_url: impl Into<String>,
        index: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IndexError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/{action}", self.base_url, self.index)
    }

    async fn post(&self, action: &str, body: &Value) -> Result<Value, IndexError> {
        let response = self.client.post(self.endpoint(action)).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    #[instrument(skip(self, query), fields(index = %self.index))]
    async fn count(&self, query: &StructuredQuery) -> Result<u64, IndexError> {
        let rendered = render_query(&query.for_count());
        let body = json!({ "query": rendered["query"] });
        debug!(%body, "index count");

        let response = self.post("_count", &body).await?;
        response["count"]
            .as_u64()
            .ok_or_else(|| IndexError::Decode(format!("missing count in {response}")))
    }

    #[instrument(skip(self, query), fields(index = %self.index))]
    async fn search(&self, query: &StructuredQuery) -> Result<SearchHits, IndexError> {
        let mut body = render_query(query);
        body["_source"] = json!(false);
        debug!(%body, "index search");

        let response = self.post("_search", &body).await?;
        parse_hits(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> StructuredQuery {
        let origin = GeoPoint::new(48.85, 2.35);
        let score = ScoreField("D1102".into());
        StructuredQuery {
            filters: vec![
                QueryFilter::IndustryIn(vec!["1071C".into()]),
                QueryFilter::HeadcountAtMost(12),
                QueryFilter::Flag(DemographicFlag::Apprenticeship),
                QueryFilter::HasScore(score.clone()),
                QueryFilter::WithinRadius {
                    origin,
                    radius_km: 30,
                },
            ],
            sort: vec![SortClause::DistanceAsc { origin }, SortClause::ScoreDesc(score)],
            from: Some(10),
            size: Some(10),
        }
    }

    #[test]
    fn renders_filters_sort_and_window() {
        let body = render_query(&query());

        assert_eq!(
            body["query"]["bool"]["filter"],
            json!([
                { "terms": { "naf": ["1071C"] } },
                { "range": { "headcount": { "lte": 12 } } },
                { "term": { "flag_alternance": 1 } },
                { "exists": { "field": "score_for_rome_D1102" } },
                { "geo_distance": { "distance": "30km", "locations": { "lat": 48.85, "lon": 2.35 } } },
            ])
        );
        assert_eq!(
            body["sort"],
            json!([
                { "_geo_distance": { "locations": { "lat": 48.85, "lon": 2.35 }, "order": "asc", "unit": "km" } },
                { "score_for_rome_D1102": { "order": "desc" } },
            ])
        );
        assert_eq!(body["from"], json!(10));
        assert_eq!(body["size"], json!(10));
    }

    #[test]
    fn count_rendering_omits_sort_and_window() {
        let body = render_query(&query().for_count());
        assert!(body.get("sort").is_none());
        assert!(body.get("from").is_none());
        assert!(body.get("size").is_none());
    }

    #[test]
    fn parses_both_total_formats() {
        let legacy = json!({
            "hits": { "total": 3, "hits": [{ "_id": "a", "sort": [1.4, 80.0] }] }
        });
        let parsed = parse_hits(&legacy).unwrap();
        assert_eq!(parsed.total, 3);
        assert_eq!(parsed.hits[0].sort, vec![Some(1.4), Some(80.0)]);

        let modern = json!({
            "hits": { "total": { "value": 7, "relation": "eq" }, "hits": [{ "_id": "b", "sort": [null] }] }
        });
        let parsed = parse_hits(&modern).unwrap();
        assert_eq!(parsed.total, 7);
        assert_eq!(parsed.hits[0].sort, vec![None]);
    }

    #[test]
    fn hits_without_ids_are_rejected() {
        let broken = json!({ "hits": { "total": 1, "hits": [{ "sort": [] }] } });
        assert!(matches!(parse_hits(&broken), Err(IndexError::Decode(_))));
    }
}
