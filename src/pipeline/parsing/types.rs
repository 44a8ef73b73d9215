use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::standards::NutrientKey;

/// Per-serving nutrient amounts in each key's canonical unit.
pub type NutrientMap = BTreeMap<NutrientKey, f64>;

/// Serving information printed above the nutrient table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServingInfo {
    pub serving_size: Option<String>,
    pub servings_per_container: Option<f64>,
}

impl ServingInfo {
    pub fn is_empty(&self) -> bool {
        self.serving_size.is_none() && self.servings_per_container.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningField {
    Amount,
    DailyValue,
}

/// A parsed value that failed range validation and was dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub key: NutrientKey,
    pub field: WarningField,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = match self.field {
            WarningField::Amount => "amount",
            WarningField::DailyValue => "%DV",
        };
        write!(
            f,
            "{} {what} {} outside plausible range [{}, {}], dropped",
            self.key, self.value, self.min, self.max
        )
    }
}

/// Structured nutrition record produced by the parser or a product lookup.
///
/// Amounts in `nutrition_facts` are always within `NutrientKey::valid_range`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredNutritionData {
    pub nutrition_facts: NutrientMap,
    /// Percent of daily value, captured inline or back-filled.
    pub daily_values: NutrientMap,
    pub serving: ServingInfo,
    pub ingredients: Vec<String>,
    pub allergens: Vec<String>,
    pub claims: Vec<String>,
    pub raw_text: String,
    pub warnings: Vec<ParseWarning>,
}

impl StructuredNutritionData {
    /// Empty record carrying only the source text.
    pub fn empty(raw_text: &str) -> Self {
        Self {
            raw_text: raw_text.to_string(),
            ..Default::default()
        }
    }

    pub fn fact(&self, key: NutrientKey) -> Option<f64> {
        self.nutrition_facts.get(&key).copied()
    }

    /// Amount or 0.0 when the label did not state it.
    pub fn fact_or_zero(&self, key: NutrientKey) -> f64 {
        self.fact(key).unwrap_or(0.0)
    }

    pub fn has_content(&self) -> bool {
        !self.nutrition_facts.is_empty() || !self.ingredients.is_empty() || !self.claims.is_empty()
    }
}
