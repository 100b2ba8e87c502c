use axum::{
    Json,
    extract::{OriginalUri, Query, State},
};
use lbb_common::office::stars;
use lbb_common::search::{
    FallbackSuggestions, MatchCandidate, PageLink, PaginationManager, SearchOutcome,
    SearchRequest,
};
use lbb_common::taxonomy::Taxonomy;
use serde::Serialize;

use crate::SharedState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct OccupationView {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct OfficeView {
    pub siret: String,
    pub name: String,
    pub naf: String,
    pub city: Option<String>,
    pub zipcode: String,
    pub address: String,
    pub distance_km: u32,
    pub stars: f64,
    pub boosted: bool,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct PaginationView {
    pub show: bool,
    pub current_page: u64,
    pub page_count: u64,
    pub first: Option<PageLink>,
    pub pages: Vec<PageLink>,
    pub last: Option<PageLink>,
}

#[derive(Debug, Serialize)]
pub struct AlternativeOccupationView {
    pub code: String,
    pub label: Option<String>,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct AlternativeRadiusView {
    pub distance_km: u32,
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct FallbackView {
    pub alternative_occupations: Vec<AlternativeOccupationView>,
    pub alternative_radii: Vec<AlternativeRadiusView>,
}

#[derive(Debug, Serialize)]
pub struct OfficesResponse {
    pub occupation: OccupationView,
    pub count: u64,
    pub from: u64,
    pub to: u64,
    pub sort: &'static str,
    pub offices: Vec<OfficeView>,
    pub pagination: PaginationView,
    pub fallback: Option<FallbackView>,
}

fn office_view(candidate: &MatchCandidate, state: &SharedState) -> OfficeView {
    let office = &candidate.office;
    let score = candidate
        .occupation_score
        .as_ref()
        .map(|s| s.value)
        .unwrap_or(f64::from(candidate.score));
    let thresholds = &state.fetcher.settings().headcount;

    OfficeView {
        siret: office.siret.clone(),
        name: office.name(),
        naf: office.naf.clone(),
        city: office.city_name().map(str::to_string),
        zipcode: office.zipcode.clone(),
        address: office.address_text(thresholds),
        distance_km: candidate.distance_km,
        stars: stars(score),
        boosted: office.is_boosted(),
        phone: office.phone(),
        website: Some(office.website.trim().to_string()).filter(|w| !w.is_empty()),
        latitude: office.latitude,
        longitude: office.longitude,
    }
}

fn fallback_view(fallback: FallbackSuggestions, taxonomy: &Taxonomy) -> FallbackView {
    FallbackView {
        alternative_occupations: fallback
            .alternative_occupations
            .into_iter()
            .map(|(code, count)| AlternativeOccupationView {
                label: taxonomy.label(&code).map(str::to_string),
                code,
                count,
            })
            .collect(),
        alternative_radii: fallback
            .alternative_radii
            .into_iter()
            .map(|radius| AlternativeRadiusView {
                distance_km: radius.radius_km,
                label: radius.label,
                count: radius.count,
            })
            .collect(),
    }
}

fn render(outcome: SearchOutcome, full_path_url: &str, state: &SharedState) -> OfficesResponse {
    let taxonomy = state.fetcher.taxonomy();
    let pagination = PaginationManager::new(
        outcome.count,
        outcome.window,
        full_path_url,
        &state.fetcher.settings().pagination,
    );
    let code = outcome.filters.occupation_code.clone();

    OfficesResponse {
        occupation: OccupationView {
            label: taxonomy.label(&code).unwrap_or_default().to_string(),
            code,
        },
        count: outcome.count,
        from: outcome.window.from,
        to: outcome.window.to,
        sort: outcome.filters.sort.as_str(),
        offices: outcome
            .offices
            .iter()
            .map(|candidate| office_view(candidate, state))
            .collect(),
        pagination: PaginationView {
            show: pagination.should_show(),
            current_page: pagination.current_page(),
            page_count: pagination.page_count(),
            first: pagination.first_page(),
            pages: pagination.pages(),
            last: pagination.last_page(),
        },
        fallback: outcome
            .fallback
            .map(|fallback| fallback_view(fallback, taxonomy)),
    }
}

pub async fn search_offices(
    State(state): State<SharedState>,
    OriginalUri(uri): OriginalUri,
    Query(request): Query<SearchRequest>,
) -> Result<Json<OfficesResponse>, ApiError> {
    let outcome = state.fetcher.search(&request).await?;

    let full_path_url = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    Ok(Json(render(outcome, &full_path_url, &state)))
}
