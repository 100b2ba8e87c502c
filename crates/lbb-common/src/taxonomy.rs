//! Occupation taxonomy: occupation codes, their labels, the industry codes
//! eligible for each occupation and the alternative occupations suggested
//! when a search comes back nearly empty.
//!
//! The taxonomy is read-only configuration owned by the enclosing service and
//! loaded from a JSON document:
//!
//! ```json
//! {
//!   "occupations": [
//!     {
//!       "code": "D1102",
//!       "label": "Boulangerie - viennoiserie",
//!       "industries": ["1071C", "1071D"],
//!       "mobilities": ["D1104", "D1106"]
//!     }
//!   ]
//! }
//! ```

use std::{collections::HashMap, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

static RE_NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse taxonomy: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate occupation code in taxonomy: {0}")]
    DuplicateCode(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Occupation {
    pub code: String,
    pub label: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub mobilities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TaxonomyDocument {
    occupations: Vec<Occupation>,
}

#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    occupations: HashMap<String, Occupation>,
    code_by_slug: HashMap<String, String>,
}

/// ASCII slug of a label: accents folded, lower-cased, runs of anything else
/// collapsed into a single `-`.
pub fn slugify(label: &str) -> String {
    let folded: String = label
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    RE_NON_ALNUM
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

impl Taxonomy {
    pub fn from_occupations(
        occupations: impl IntoIterator<Item = Occupation>,
    ) -> Result<Self, TaxonomyError> {
        let mut taxonomy = Taxonomy::default();

        for mut occupation in occupations {
            if taxonomy.occupations.contains_key(&occupation.code) {
                return Err(TaxonomyError::DuplicateCode(occupation.code));
            }

            let slug = occupation
                .slug
                .take()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| slugify(&occupation.label));
            occupation.slug = Some(slug.clone());

            taxonomy
                .code_by_slug
                .insert(slug, occupation.code.clone());
            taxonomy
                .occupations
                .insert(occupation.code.clone(), occupation);
        }

        for occupation in taxonomy.occupations.values() {
            for mobility in &occupation.mobilities {
                if !taxonomy.occupations.contains_key(mobility) {
                    warn!(
                        occupation = %occupation.code,
                        mobility = %mobility,
                        "alternative occupation missing from taxonomy"
                    );
                }
            }
        }

        Ok(taxonomy)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, TaxonomyError> {
        let document: TaxonomyDocument = serde_json::from_str(raw)?;
        Self::from_occupations(document.occupations)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.occupations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupations.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.occupations.contains_key(code)
    }

    pub fn get(&self, code: &str) -> Option<&Occupation> {
        self.occupations.get(code)
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.get(code).map(|o| o.label.as_str())
    }

    /// Accepts either an occupation code or the slug of its label.
    pub fn resolve(&self, code_or_slug: &str) -> Option<&Occupation> {
        let key = code_or_slug.trim();
        self.occupations.get(key).or_else(|| {
            self.code_by_slug
                .get(key)
                .and_then(|code| self.occupations.get(code))
        })
    }

    pub fn industries_for(&self, code: &str) -> &[String] {
        self.get(code)
            .map(|o| o.industries.as_slice())
            .unwrap_or_default()
    }

    pub fn mobilities_for(&self, code: &str) -> &[String] {
        self.get(code)
            .map(|o| o.mobilities.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "occupations": [
            {
                "code": "D1102",
                "label": "Boulangerie - viennoiserie",
                "industries": ["1071C", "1071D"],
                "mobilities": ["D1104", "D1102"]
            },
            {
                "code": "D1104",
                "label": "Pâtisserie, confiserie, chocolaterie et glacerie",
                "slug": "patisserie",
                "industries": ["1071D"]
            }
        ]
    }"#;

    #[test]
    fn slugify_folds_accents_and_punctuation() {
        assert_eq!(slugify("Boulangerie - viennoiserie"), "boulangerie-viennoiserie");
        assert_eq!(
            slugify("Pâtisserie, confiserie, chocolaterie et glacerie"),
            "patisserie-confiserie-chocolaterie-et-glacerie"
        );
        assert_eq!(slugify("  Électricité  "), "electricite");
    }

    #[test]
    fn resolves_codes_and_slugs() {
        let taxonomy = Taxonomy::from_json_str(SAMPLE).unwrap();

        assert_eq!(taxonomy.len(), 2);
        assert_eq!(taxonomy.resolve("D1102").unwrap().code, "D1102");
        assert_eq!(
            taxonomy.resolve("boulangerie-viennoiserie").unwrap().code,
            "D1102"
        );
        assert_eq!(taxonomy.resolve("patisserie").unwrap().code, "D1104");
        assert!(taxonomy.resolve("plomberie").is_none());
    }

    #[test]
    fn exposes_industries_and_mobilities() {
        let taxonomy = Taxonomy::from_json_str(SAMPLE).unwrap();

        assert_eq!(taxonomy.industries_for("D1102"), ["1071C", "1071D"]);
        assert_eq!(taxonomy.mobilities_for("D1102"), ["D1104", "D1102"]);
        assert!(taxonomy.mobilities_for("D1104").is_empty());
        assert!(taxonomy.industries_for("Z9999").is_empty());
    }

    #[test]
    fn rejects_duplicate_codes() {
        let raw = r#"{"occupations": [
            {"code": "A1", "label": "a"},
            {"code": "A1", "label": "b"}
        ]}"#;

        assert!(matches!(
            Taxonomy::from_json_str(raw),
            Err(TaxonomyError::DuplicateCode(code)) if code == "A1"
        ));
    }
}
