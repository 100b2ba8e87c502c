use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::code_mapper::CodeMapper;
use super::error::SearchError;
use super::fallback::{FallbackPlanner, FallbackSuggestions};
use super::filters::{
    Audience, DemographicFlags, HeadcountFilter, SearchFilters, SortMode, Window,
};
use super::gateway::SearchGateway;
use super::geocoding::Geocoder;
use super::pagination::clamp_window;
use super::query::QueryBuilder;
use super::shuffle::{RankedPage, ResultShuffler};
use crate::config::SearchSettings;
use crate::db::OfficeStore;
use crate::index::SearchIndex;
use crate::taxonomy::Taxonomy;

/// Raw search form parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Occupation code or slug of its label.
    pub occupation: String,
    pub city: Option<String>,
    pub zipcode: String,
    pub industry: Option<String>,
    pub distance: Option<u32>,
    pub headcount: Option<String>,
    pub sort: Option<String>,
    pub apprenticeship: bool,
    pub audience: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub filters: SearchFilters,
    pub count: u64,
    pub window: Window,
    pub offices: RankedPage,
    pub fallback: Option<FallbackSuggestions>,
}

/// Runs a whole search: locate, count, clamp, fetch, reorder, and suggest
/// broader searches when results are scarce.
#[derive(Clone)]
pub struct Fetcher {
    builder: QueryBuilder,
    gateway: SearchGateway,
    planner: FallbackPlanner,
    geocoder: Arc<dyn Geocoder>,
    settings: SearchSettings,
}

impl Fetcher {
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn OfficeStore>,
        geocoder: Arc<dyn Geocoder>,
        settings: SearchSettings,
    ) -> Self {
        let builder = QueryBuilder::new(CodeMapper::new(taxonomy), settings.headcount);
        let gateway = SearchGateway::new(index, store, settings.external_call_timeout);
        let planner = FallbackPlanner::new(
            builder.clone(),
            gateway.clone(),
            settings.radius_tiers.clone(),
            settings.fallback_threshold,
        );

        Self {
            builder,
            gateway,
            planner,
            geocoder,
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        self.builder.mapper().taxonomy()
    }

    pub fn index_name(&self) -> &'static str {
        self.gateway.index_name()
    }

    /// Turns raw parameters into filters. The window is left unset until the
    /// total count is known.
    pub fn filters_for(&self, request: &SearchRequest) -> Result<SearchFilters, SearchError> {
        let occupation_code = self
            .taxonomy()
            .resolve(&request.occupation)
            .map(|occupation| occupation.code.clone())
            .ok_or_else(|| SearchError::UnknownOccupationCode(request.occupation.clone()))?;

        let city = request.city.as_deref().unwrap_or_default();
        let origin = match self.geocoder.coordinates_for(&request.zipcode) {
            Some(origin) => {
                info!(
                    city,
                    zipcode = %request.zipcode,
                    latitude = origin.latitude,
                    longitude = origin.longitude,
                    "location found"
                );
                origin
            }
            None => {
                info!(city, zipcode = %request.zipcode, "location error");
                return Err(SearchError::LocationResolutionFailure(request.zipcode.clone()));
            }
        };

        let radius_km = request
            .distance
            .filter(|d| *d > 0)
            .unwrap_or(self.settings.default_radius_km);

        let mut filters = SearchFilters::new(occupation_code, origin, radius_km);
        filters.industry_codes = request
            .industry
            .iter()
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect();
        filters.headcount = HeadcountFilter::from_param(request.headcount.as_deref());
        filters.sort = SortMode::from_param(request.sort.as_deref());
        filters.flags = DemographicFlags::new(
            request.apprenticeship,
            Audience::from_param(request.audience.as_deref()),
        );
        Ok(filters)
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
        self.search_on(request, Local::now().date_naive()).await
    }

    /// Same as [`Fetcher::search`] with the reordering seeded from `date`.
    #[instrument(skip(self, request), fields(occupation = %request.occupation, zipcode = %request.zipcode))]
    pub async fn search_on(
        &self,
        request: &SearchRequest,
        date: NaiveDate,
    ) -> Result<SearchOutcome, SearchError> {
        let filters = self.filters_for(request)?;

        let count = self.gateway.count(&self.builder.build(&filters)?).await?;

        let window = clamp_window(
            request.from.unwrap_or(1),
            request.to.unwrap_or(self.settings.pagination.page_size as i64),
            count,
            &self.settings.pagination,
        );
        let filters = filters.with_window(window);

        let offices = if count > 0 {
            let page = self.gateway.fetch(&self.builder.build(&filters)?).await?;
            ResultShuffler::for_date(date).shuffle(
                page.candidates,
                filters.sort,
                &filters.occupation_code,
            )
        } else {
            RankedPage::default()
        };

        let fallback = self.planner.plan(&filters, count).await?;

        info!(
            count,
            from = window.from,
            to = window.to,
            shown = offices.len(),
            fallback = fallback.is_some(),
            "search completed"
        );

        Ok(SearchOutcome {
            filters,
            count,
            window,
            offices,
            fallback,
        })
    }
}
