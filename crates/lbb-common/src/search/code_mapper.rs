use std::sync::Arc;

use super::error::SearchError;
use crate::taxonomy::Taxonomy;

/// Maps an occupation to the industry codes eligible for matching.
#[derive(Debug, Clone)]
pub struct CodeMapper {
    taxonomy: Arc<Taxonomy>,
}

impl CodeMapper {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Resolves the industry codes to filter on.
    ///
    /// Without an industry filter (or with a single empty placeholder) every
    /// industry associated with the occupation is returned; otherwise only the
    /// requested codes that are valid for it, in request order.
    pub fn resolve(
        &self,
        occupation_codes: &[String],
        industry_codes: &[String],
    ) -> Result<Vec<String>, SearchError> {
        if let Some(unknown) = occupation_codes
            .iter()
            .find(|code| !self.taxonomy.contains(code))
        {
            return Err(SearchError::UnknownOccupationCode(unknown.clone()));
        }

        let [occupation_code] = occupation_codes else {
            return Err(SearchError::UnsupportedMultiOccupationQuery(
                occupation_codes.len(),
            ));
        };

        let eligible = self.taxonomy.industries_for(occupation_code);
        let requested: Vec<&String> = industry_codes
            .iter()
            .filter(|code| !code.trim().is_empty())
            .collect();

        if requested.is_empty() {
            return Ok(eligible.to_vec());
        }

        let mut resolved: Vec<String> = Vec::with_capacity(requested.len());
        for code in requested {
            if eligible.contains(code) && !resolved.contains(code) {
                resolved.push(code.clone());
            }
        }

        Ok(resolved)
    }

    /// Single-occupation convenience used by the query builder.
    pub fn resolve_one(
        &self,
        occupation_code: &str,
        industry_codes: &[String],
    ) -> Result<Vec<String>, SearchError> {
        self.resolve(&[occupation_code.to_string()], industry_codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Occupation;

    fn mapper() -> CodeMapper {
        let taxonomy = Taxonomy::from_occupations([
            Occupation {
                code: "D1102".into(),
                label: "Boulangerie".into(),
                slug: None,
                industries: vec!["1071C".into(), "1071D".into(), "4724Z".into()],
                mobilities: vec![],
            },
            Occupation {
                code: "D1104".into(),
                label: "Pâtisserie".into(),
                slug: None,
                industries: vec!["1071D".into()],
                mobilities: vec![],
            },
        ])
        .unwrap();

        CodeMapper::new(Arc::new(taxonomy))
    }

    fn codes(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_industry_filter_yields_every_eligible_code() {
        let mapper = mapper();

        let all = mapper.resolve(&codes(&["D1102"]), &[]).unwrap();
        assert_eq!(all, codes(&["1071C", "1071D", "4724Z"]));

        let placeholder = mapper.resolve(&codes(&["D1102"]), &codes(&[""])).unwrap();
        assert_eq!(placeholder, all);
    }

    #[test]
    fn explicit_industries_are_intersected_with_the_occupation() {
        let mapper = mapper();

        let resolved = mapper
            .resolve(&codes(&["D1102"]), &codes(&["4724Z", "9999Z", "4724Z"]))
            .unwrap();
        assert_eq!(resolved, codes(&["4724Z"]));

        let none = mapper
            .resolve(&codes(&["D1104"]), &codes(&["4724Z"]))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn unknown_occupation_is_rejected() {
        let err = mapper().resolve(&codes(&["Z9999"]), &[]).unwrap_err();
        assert!(matches!(err, SearchError::UnknownOccupationCode(code) if code == "Z9999"));
    }

    #[test]
    fn multi_occupation_queries_are_rejected() {
        let err = mapper()
            .resolve(&codes(&["D1102", "D1104"]), &[])
            .unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedMultiOccupationQuery(2)));

        let err = mapper().resolve(&[], &[]).unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedMultiOccupationQuery(0)));
    }
}
