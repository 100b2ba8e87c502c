use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, instrument};

use super::error::SearchError;
use super::filters::SearchFilters;
use super::gateway::SearchGateway;
use super::query::QueryBuilder;
use crate::config::RadiusTier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlternativeRadius {
    pub radius_km: u32,
    pub label: String,
    pub count: u64,
}

/// Broader searches offered when the primary one returns few results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FallbackSuggestions {
    /// Count at the original radius for every alternative occupation, under
    /// the same industry filter as the primary search.
    pub alternative_occupations: BTreeMap<String, u64>,
    /// Wider radii, each strictly improving on the previous count.
    pub alternative_radii: Vec<AlternativeRadius>,
}

impl FallbackSuggestions {
    pub fn is_empty(&self) -> bool {
        self.alternative_occupations.is_empty() && self.alternative_radii.is_empty()
    }
}

/// Keeps the tiers whose count beats everything recorded before them,
/// starting from `baseline`.
fn strictly_improving(
    tiers: &[RadiusTier],
    counts: &[u64],
    baseline: u64,
) -> Vec<AlternativeRadius> {
    let mut best = baseline;
    tiers
        .iter()
        .zip(counts)
        .filter_map(|(tier, &count)| {
            (count > best).then(|| {
                best = count;
                AlternativeRadius {
                    radius_km: tier.radius_km,
                    label: tier.label.clone(),
                    count,
                }
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct FallbackPlanner {
    builder: QueryBuilder,
    gateway: SearchGateway,
    radius_tiers: Vec<RadiusTier>,
    threshold: u64,
}

impl FallbackPlanner {
    pub fn new(
        builder: QueryBuilder,
        gateway: SearchGateway,
        mut radius_tiers: Vec<RadiusTier>,
        threshold: u64,
    ) -> Self {
        radius_tiers.sort_by_key(|tier| tier.radius_km);
        Self {
            builder,
            gateway,
            radius_tiers,
            threshold,
        }
    }

    async fn count(&self, filters: &SearchFilters) -> Result<u64, SearchError> {
        let query = self.builder.build(filters)?;
        self.gateway.count(&query).await
    }

    /// Counts alternative occupations and wider radii concurrently.
    ///
    /// Returns `None` when the primary search already has enough results.
    /// Nothing here touches the primary result set.
    #[instrument(skip(self, filters), fields(occupation = %filters.occupation_code))]
    pub async fn plan(
        &self,
        filters: &SearchFilters,
        primary_count: u64,
    ) -> Result<Option<FallbackSuggestions>, SearchError> {
        if primary_count >= self.threshold {
            return Ok(None);
        }

        let base = filters.without_window();
        let taxonomy = self.builder.mapper().taxonomy();

        let alternatives: Vec<&String> = taxonomy
            .mobilities_for(&base.occupation_code)
            .iter()
            .filter(|code| **code != base.occupation_code)
            .collect();

        let occupation_counts = try_join_all(alternatives.iter().map(|code| {
            let alternative = base.with_occupation(code.as_str());
            async move {
                if !taxonomy.contains(&alternative.occupation_code) {
                    return Ok(0);
                }
                self.count(&alternative).await
            }
        }));

        let radius_counts = try_join_all(
            self.radius_tiers
                .iter()
                .map(|tier| {
                    let widened = base.with_radius(tier.radius_km);
                    async move { self.count(&widened).await }
                }),
        );

        let (occupation_counts, radius_counts) =
            futures::try_join!(occupation_counts, radius_counts)?;

        let alternative_occupations: BTreeMap<String, u64> = alternatives
            .into_iter()
            .cloned()
            .zip(occupation_counts)
            .collect();
        let alternative_radii =
            strictly_improving(&self.radius_tiers, &radius_counts, primary_count);

        debug!(
            primary_count,
            occupations = alternative_occupations.len(),
            radii = alternative_radii.len(),
            "fallback planned"
        );

        Ok(Some(FallbackSuggestions {
            alternative_occupations,
            alternative_radii,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::HeadcountThresholds;
    use crate::db::InMemoryOfficeStore;
    use crate::index::{InMemoryIndex, IndexedOffice};
    use crate::office::Office;
    use crate::search::code_mapper::CodeMapper;
    use crate::search::filters::GeoPoint;
    use crate::taxonomy::{Occupation, Taxonomy};

    fn tiers() -> Vec<RadiusTier> {
        vec![
            RadiusTier::new(30, "30 km"),
            RadiusTier::new(50, "50 km"),
            RadiusTier::new(3000, "France entière"),
        ]
    }

    #[test]
    fn only_strictly_improving_tiers_are_kept() {
        let kept = strictly_improving(&tiers(), &[3, 3, 8], 3);
        assert_eq!(
            kept,
            vec![AlternativeRadius {
                radius_km: 3000,
                label: "France entière".into(),
                count: 8
            }]
        );

        let kept = strictly_improving(&tiers(), &[4, 6, 6], 0);
        let counts: Vec<_> = kept.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![4, 6]);
    }

    fn bakery(siret: &str, naf: &str, latitude: f64, longitude: f64) -> IndexedOffice {
        IndexedOffice::new(Office {
            siret: siret.into(),
            naf: naf.into(),
            latitude,
            longitude,
            score: 50,
            ..Office::default()
        })
    }

    fn planner() -> FallbackPlanner {
        let taxonomy = Taxonomy::from_occupations([
            Occupation {
                code: "D1102".into(),
                label: "Boulangerie - viennoiserie".into(),
                slug: None,
                industries: vec!["1071C".into()],
                mobilities: vec!["D1104".into(), "D1102".into(), "Z0000".into()],
            },
            Occupation {
                code: "D1104".into(),
                label: "Pâtisserie, confiserie, chocolaterie et glacerie".into(),
                slug: None,
                industries: vec!["1071D".into()],
                mobilities: vec![],
            },
        ])
        .unwrap();

        let index = InMemoryIndex::new([
            // Paris
            bakery("p1", "1071C", 48.85, 2.35).with_score("D1102", 60.0),
            // ~40 km away (Meaux)
            bakery("m1", "1071C", 48.96, 2.88).with_score("D1102", 60.0),
            // Lyon
            bakery("l1", "1071C", 45.76, 4.83).with_score("D1102", 60.0),
            bakery("l2", "1071C", 45.76, 4.84).with_score("D1102", 60.0),
            bakery("pastry", "1071D", 48.85, 2.35).with_score("D1104", 70.0),
        ]);
        let gateway = SearchGateway::new(
            Arc::new(index),
            Arc::new(InMemoryOfficeStore::default()),
            Duration::from_secs(1),
        );
        let builder = QueryBuilder::new(
            CodeMapper::new(Arc::new(taxonomy)),
            HeadcountThresholds::default(),
        );

        FallbackPlanner::new(builder, gateway, tiers(), 10)
    }

    #[tokio::test]
    async fn skips_planning_above_the_threshold() {
        let filters = SearchFilters::new("D1102", GeoPoint::new(48.85, 2.35), 10);
        let plan = planner().plan(&filters, 10).await.unwrap();
        assert!(plan.is_none());
    }

    #[tokio::test]
    async fn suggests_alternative_occupations_and_wider_radii() {
        let filters = SearchFilters::new("D1102", GeoPoint::new(48.85, 2.35), 10);

        let plan = planner().plan(&filters, 1).await.unwrap().unwrap();

        assert_eq!(
            plan.alternative_occupations,
            BTreeMap::from([("D1104".to_string(), 1), ("Z0000".to_string(), 0)])
        );
        // 30 km still finds only the Paris bakery, 50 km adds Meaux,
        // nationwide adds Lyon.
        assert_eq!(
            plan.alternative_radii,
            vec![
                AlternativeRadius {
                    radius_km: 50,
                    label: "50 km".into(),
                    count: 2
                },
                AlternativeRadius {
                    radius_km: 3000,
                    label: "France entière".into(),
                    count: 4
                },
            ]
        );
    }

    #[tokio::test]
    async fn alternative_occupations_keep_the_industry_filter() {
        let mut filters = SearchFilters::new("D1102", GeoPoint::new(48.85, 2.35), 10);
        filters.industry_codes = vec!["1071C".into()];

        let plan = planner().plan(&filters, 1).await.unwrap().unwrap();

        // The pastry occupation only covers 1071D, so nothing is left once
        // 1071C is required.
        assert_eq!(plan.alternative_occupations.get("D1104"), Some(&0));
        assert_eq!(plan.alternative_occupations.get("Z0000"), Some(&0));

        filters.industry_codes = vec!["1071D".into()];
        let plan = planner().plan(&filters, 0).await.unwrap().unwrap();
        assert_eq!(plan.alternative_occupations.get("D1104"), Some(&1));
    }
}
