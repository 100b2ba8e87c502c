use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::MalformedSizeFilter;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Coarse employer size restriction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadcountFilter {
    #[default]
    Any,
    SmallOnly,
    BigOnly,
}

impl FromStr for HeadcountFilter {
    type Err = MalformedSizeFilter;

    /// Form codes: `1` any size, `2` small only, `3` big only. Any other
    /// number means no restriction.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let code = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| MalformedSizeFilter(raw.to_string()))?;

        Ok(match code {
            2 => HeadcountFilter::SmallOnly,
            3 => HeadcountFilter::BigOnly,
            _ => HeadcountFilter::Any,
        })
    }
}

impl HeadcountFilter {
    /// Lenient parse for request parameters: malformed input degrades to `Any`.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => HeadcountFilter::Any,
            Some(value) => value.parse().unwrap_or_else(|err: MalformedSizeFilter| {
                warn!(error = %err, "ignoring size filter");
                HeadcountFilter::Any
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    ByDistance,
    ByScore,
}

impl SortMode {
    /// `distance` or `score`; anything else falls back to distance.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("distance") => SortMode::ByDistance,
            Some("score") => SortMode::ByScore,
            Some(other) => {
                warn!(sort = other, "sort should be distance or score; using distance");
                SortMode::ByDistance
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::ByDistance => "distance",
            SortMode::ByScore => "score",
        }
    }
}

/// Target public selected on the search form. Each value other than `All`
/// switches on exactly one demographic flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    All,
    Junior,
    Senior,
    Disability,
}

impl Audience {
    /// Accepts the numeric form codes (`0`..`3`) as well as the names.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("1") | Some("junior") => Audience::Junior,
            Some("2") | Some("senior") => Audience::Senior,
            Some("3") | Some("disability") => Audience::Disability,
            _ => Audience::All,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicFlags {
    pub apprenticeship: bool,
    pub junior: bool,
    pub senior: bool,
    pub disability: bool,
}

impl DemographicFlags {
    pub fn new(apprenticeship: bool, audience: Audience) -> Self {
        Self {
            apprenticeship,
            junior: audience == Audience::Junior,
            senior: audience == Audience::Senior,
            disability: audience == Audience::Disability,
        }
    }
}

/// 1-based inclusive range of result positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub from: u64,
    pub to: u64,
}

impl Window {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }
}

/// Immutable description of one search, passed by reference through every
/// stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchFilters {
    pub occupation_code: String,
    /// Empty means every industry eligible for the occupation.
    pub industry_codes: Vec<String>,
    pub origin: GeoPoint,
    pub radius_km: u32,
    pub headcount: HeadcountFilter,
    pub sort: SortMode,
    pub flags: DemographicFlags,
    pub window: Option<Window>,
}

impl SearchFilters {
    pub fn new(occupation_code: impl Into<String>, origin: GeoPoint, radius_km: u32) -> Self {
        Self {
            occupation_code: occupation_code.into(),
            industry_codes: Vec::new(),
            origin,
            radius_km,
            headcount: HeadcountFilter::Any,
            sort: SortMode::ByDistance,
            flags: DemographicFlags::default(),
            window: None,
        }
    }

    pub fn with_occupation(&self, occupation_code: impl Into<String>) -> Self {
        Self {
            occupation_code: occupation_code.into(),
            ..self.clone()
        }
    }

    pub fn with_radius(&self, radius_km: u32) -> Self {
        Self {
            radius_km,
            ..self.clone()
        }
    }

    pub fn with_window(&self, window: Window) -> Self {
        Self {
            window: Some(window),
            ..self.clone()
        }
    }

    pub fn without_window(&self) -> Self {
        Self {
            window: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headcount_form_codes() {
        assert_eq!("1".parse::<HeadcountFilter>(), Ok(HeadcountFilter::Any));
        assert_eq!("2".parse::<HeadcountFilter>(), Ok(HeadcountFilter::SmallOnly));
        assert_eq!(" 3 ".parse::<HeadcountFilter>(), Ok(HeadcountFilter::BigOnly));
        assert_eq!("42".parse::<HeadcountFilter>(), Ok(HeadcountFilter::Any));
    }

    #[test]
    fn malformed_headcount_degrades_to_any() {
        assert_eq!(
            "big".parse::<HeadcountFilter>(),
            Err(MalformedSizeFilter("big".into()))
        );
        assert_eq!(HeadcountFilter::from_param(Some("big")), HeadcountFilter::Any);
        assert_eq!(HeadcountFilter::from_param(Some("")), HeadcountFilter::Any);
        assert_eq!(HeadcountFilter::from_param(None), HeadcountFilter::Any);
        assert_eq!(
            HeadcountFilter::from_param(Some("2")),
            HeadcountFilter::SmallOnly
        );
    }

    #[test]
    fn unknown_sort_falls_back_to_distance() {
        assert_eq!(SortMode::from_param(Some("score")), SortMode::ByScore);
        assert_eq!(SortMode::from_param(Some("distance")), SortMode::ByDistance);
        assert_eq!(SortMode::from_param(Some("alphabetical")), SortMode::ByDistance);
        assert_eq!(SortMode::from_param(None), SortMode::ByDistance);
    }

    #[test]
    fn audience_sets_a_single_flag() {
        let flags = DemographicFlags::new(true, Audience::from_param(Some("2")));
        assert!(flags.apprenticeship);
        assert!(flags.senior);
        assert!(!flags.junior);
        assert!(!flags.disability);

        let none = DemographicFlags::new(false, Audience::from_param(Some("nope")));
        assert_eq!(none, DemographicFlags::default());
    }

    #[test]
    fn derived_filters_leave_the_original_untouched() {
        let base = SearchFilters::new("D1102", GeoPoint::new(48.85, 2.35), 30)
            .with_window(Window::new(1, 10));

        let wider = base.with_radius(50);
        let other = base.with_occupation("D1104");
        let count_only = base.without_window();

        assert_eq!(base.radius_km, 30);
        assert_eq!(wider.radius_km, 50);
        assert_eq!(other.occupation_code, "D1104");
        assert_eq!(base.occupation_code, "D1102");
        assert!(count_only.window.is_none());
        assert_eq!(base.window, Some(Window::new(1, 10)));
    }
}
