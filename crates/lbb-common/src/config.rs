use std::time::Duration;

use serde::Serialize;
use tracing::warn;

/// A radius offered as a broader alternative when a search returns few results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadiusTier {
    pub radius_km: u32,
    pub label: String,
}

impl RadiusTier {
    pub fn new(radius_km: u32, label: impl Into<String>) -> Self {
        Self {
            radius_km,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationSettings {
    pub page_size: u64,
    /// Largest accepted `to - from` for a requested window.
    pub max_page_span: u64,
    /// Width of the sliding window of page links.
    pub max_pages: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            max_page_span: 10,
            max_pages: 7,
        }
    }
}

impl PaginationSettings {
    pub fn half_width(&self) -> u64 {
        self.max_pages / 2
    }
}

/// Headcount bucket codes bounding the employer-size filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadcountThresholds {
    pub small_only_maximum: u32,
    pub big_only_minimum: u32,
}

impl Default for HeadcountThresholds {
    fn default() -> Self {
        Self {
            small_only_maximum: 12,
            big_only_minimum: 21,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub pagination: PaginationSettings,
    pub headcount: HeadcountThresholds,
    /// Searches with fewer results than this get fallback suggestions.
    pub fallback_threshold: u64,
    pub radius_tiers: Vec<RadiusTier>,
    pub default_radius_km: u32,
    /// Upper bound for each call to the index or the store.
    pub external_call_timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            pagination: PaginationSettings::default(),
            headcount: HeadcountThresholds::default(),
            fallback_threshold: 10,
            radius_tiers: default_radius_tiers(),
            default_radius_km: 10,
            external_call_timeout: Duration::from_millis(3000),
        }
    }
}

fn default_radius_tiers() -> Vec<RadiusTier> {
    vec![
        RadiusTier::new(30, "30 km"),
        RadiusTier::new(50, "50 km"),
        RadiusTier::new(3000, "France entière"),
    ]
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Parses `30:30 km,50:50 km,3000:France entière`. Tiers are kept sorted by
/// radius; malformed entries are skipped.
pub fn parse_radius_tiers(raw: &str) -> Vec<RadiusTier> {
    let mut tiers: Vec<RadiusTier> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (radius, label) = entry.split_once(':').unwrap_or((entry, ""));
            let Ok(radius_km) = radius.trim().parse::<u32>() else {
                warn!(entry, "ignoring malformed radius tier");
                return None;
            };
            let label = match label.trim() {
                "" => format!("{radius_km} km"),
                label => label.to_string(),
            };
            Some(RadiusTier::new(radius_km, label))
        })
        .collect();

    tiers.sort_by_key(|tier| tier.radius_km);
    tiers.dedup_by_key(|tier| tier.radius_km);
    tiers
}

impl SearchSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let radius_tiers = std::env::var("LBB_FALLBACK_RADIUS_TIERS")
            .ok()
            .map(|raw| parse_radius_tiers(&raw))
            .filter(|tiers| !tiers.is_empty())
            .unwrap_or(defaults.radius_tiers);

        Self {
            pagination: PaginationSettings {
                page_size: env_parse::<u64>("LBB_PAGE_SIZE")
                    .filter(|v| *v > 0)
                    .unwrap_or(defaults.pagination.page_size),
                max_page_span: env_parse::<u64>("LBB_MAX_PAGE_SPAN")
                    .unwrap_or(defaults.pagination.max_page_span),
                max_pages: env_parse::<u64>("LBB_PAGINATION_MAX_PAGES")
                    .filter(|v| *v > 0)
                    .unwrap_or(defaults.pagination.max_pages),
            },
            headcount: HeadcountThresholds {
                small_only_maximum: env_parse::<u32>("LBB_HEADCOUNT_SMALL_MAX")
                    .unwrap_or(defaults.headcount.small_only_maximum),
                big_only_minimum: env_parse::<u32>("LBB_HEADCOUNT_BIG_MIN")
                    .unwrap_or(defaults.headcount.big_only_minimum),
            },
            fallback_threshold: env_parse::<u64>("LBB_FALLBACK_THRESHOLD")
                .unwrap_or(defaults.fallback_threshold),
            radius_tiers,
            default_radius_km: env_parse::<u32>("LBB_DEFAULT_RADIUS_KM")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.default_radius_km),
            external_call_timeout: env_parse::<u64>("LBB_EXTERNAL_CALL_TIMEOUT_MS")
                .filter(|v| *v > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.external_call_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_radius_tiers_in_radius_order() {
        let tiers = parse_radius_tiers("50:50 km, 30:30 km,3000:France entière,oops:x,100");

        assert_eq!(
            tiers,
            vec![
                RadiusTier::new(30, "30 km"),
                RadiusTier::new(50, "50 km"),
                RadiusTier::new(100, "100 km"),
                RadiusTier::new(3000, "France entière"),
            ]
        );
    }

    #[test]
    fn defaults_match_the_search_form() {
        let settings = SearchSettings::default();

        assert_eq!(settings.pagination.page_size, 10);
        assert_eq!(settings.pagination.half_width(), 3);
        assert_eq!(settings.fallback_threshold, 10);
        assert_eq!(settings.radius_tiers.len(), 3);
        assert_eq!(settings.radius_tiers[2].label, "France entière");
    }
}
