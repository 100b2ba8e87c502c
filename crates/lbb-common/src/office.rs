use serde::{Deserialize, Serialize};

use crate::config::HeadcountThresholds;

/// Full employer record as held by the office store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub siret: String,
    pub company_name: String,
    pub office_name: String,
    pub naf: String,
    pub street_number: String,
    pub street_name: String,
    pub city_code: String,
    pub zipcode: String,
    /// Locality name; missing when the city code is not in the commune table.
    pub city: Option<String>,
    pub email: String,
    pub tel: String,
    pub website: String,
    pub flag_alternance: bool,
    pub flag_junior: bool,
    pub flag_senior: bool,
    pub flag_handicap: bool,
    pub departement: String,
    /// Headcount bucket code (`"03"`, `"12"`, ...).
    pub headcount: Option<String>,
    /// Base relevance score, 0 to 100. 100 marks a manually boosted office.
    pub score: i32,
    pub longitude: f64,
    pub latitude: f64,
}

pub const BOOSTED_SCORE: i32 = 100;

/// Stars (0.0 to 5.0) shown for a 0..100 score.
pub fn stars(score: f64) -> f64 {
    score / 20.0
}

impl Office {
    pub fn name(&self) -> String {
        let name = if !self.office_name.trim().is_empty() {
            self.office_name.trim()
        } else if !self.company_name.trim().is_empty() {
            self.company_name.trim()
        } else {
            "sans nom"
        };
        name.to_uppercase()
    }

    pub fn is_boosted(&self) -> bool {
        self.score == BOOSTED_SCORE
    }

    /// Unparseable headcount codes count as small.
    pub fn is_small(&self, thresholds: &HeadcountThresholds) -> bool {
        self.headcount
            .as_deref()
            .and_then(|code| code.trim().parse::<u32>().ok())
            .map(|code| code < thresholds.small_only_maximum)
            .unwrap_or(true)
    }

    pub fn city_name(&self) -> Option<&str> {
        match self.city.as_deref().map(str::trim) {
            Some(city) if !city.is_empty() => Some(city),
            _ if self.city_code.starts_with("75") => Some("Paris"),
            _ => None,
        }
    }

    /// Whether the office carries enough locality data to be displayed.
    pub fn has_city(&self) -> bool {
        self.city_name().is_some()
    }

    pub fn address_fields(&self, thresholds: &HeadcountThresholds) -> Vec<String> {
        let mut fields = Vec::new();
        if !self.is_small(thresholds) {
            fields.push("Service des ressources humaines".to_string());
        }
        if !self.street_name.trim().is_empty() {
            fields.push(
                format!("{} {}", self.street_number.trim(), self.street_name.trim())
                    .trim()
                    .to_string(),
            );
        }
        fields.push(
            format!("{} {}", self.zipcode, self.city_name().unwrap_or_default())
                .trim()
                .to_string(),
        );
        fields
    }

    pub fn address_text(&self, thresholds: &HeadcountThresholds) -> String {
        self.address_fields(thresholds).join(", ")
    }

    /// Phone number for display. Numbers imported as floats (`123456789.0`)
    /// get their leading zero back and are grouped by pairs.
    pub fn phone(&self) -> Option<String> {
        let tel = self.tel.trim();
        if tel.is_empty() {
            return None;
        }

        if let Some(digits) = tel.strip_suffix(".0") {
            let padded = format!("0{digits}");
            let grouped = padded
                .as_bytes()
                .chunks(2)
                .map(|pair| String::from_utf8_lossy(pair).into_owned())
                .collect::<Vec<_>>()
                .join(" ");
            return Some(grouped);
        }

        Some(tel.to_string())
    }
}
