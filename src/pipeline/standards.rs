//! Static nutrient reference data: the closed nutrient key set, FDA daily
//! reference values, physiologically plausible ranges, and the regulatory
//! thresholds behind nutrient content claims.
//!
//! Everything here is `const` or derived from a `match`, so the table is
//! read-only for the life of the process and safe to share across requests.

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Nutrient keys
// ──────────────────────────────────────────────

/// Canonical unit a nutrient amount is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Kcal,
    Gram,
    Milligram,
    Microgram,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kcal => "kcal",
            Self::Gram => "g",
            Self::Milligram => "mg",
            Self::Microgram => "mcg",
        }
    }

    /// Factor converting an amount in `from` into this unit.
    /// `None` when the units are not mass-compatible.
    pub fn factor_from(&self, from: Unit) -> Option<f64> {
        let scale = |u: Unit| match u {
            Unit::Gram => Some(1_000_000.0),
            Unit::Milligram => Some(1_000.0),
            Unit::Microgram => Some(1.0),
            Unit::Kcal => None,
        };
        match (self, from) {
            (Unit::Kcal, Unit::Kcal) => Some(1.0),
            (to, from) => Some(scale(from)? / scale(*to)?),
        }
    }

    /// Parse a label unit token (`g`, `mg`, `mcg`, `µg`, `kcal`, `cal`).
    pub fn from_label(token: &str) -> Option<Unit> {
        match token.trim().to_lowercase().as_str() {
            "g" => Some(Unit::Gram),
            "mg" => Some(Unit::Milligram),
            "mcg" | "µg" | "ug" => Some(Unit::Microgram),
            "kcal" | "cal" | "calories" | "calorie" => Some(Unit::Kcal),
            _ => None,
        }
    }
}

/// Closed set of nutrients the pipeline understands.
///
/// Declaration order is label order (Nutrition Facts panel top to bottom),
/// which is also the iteration order of `BTreeMap<NutrientKey, _>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientKey {
    Calories,
    CaloriesFromFat,
    TotalFat,
    SaturatedFat,
    TransFat,
    PolyunsaturatedFat,
    MonounsaturatedFat,
    Cholesterol,
    Sodium,
    TotalCarbs,
    DietaryFiber,
    TotalSugars,
    AddedSugars,
    Protein,
    VitaminA,
    VitaminC,
    VitaminD,
    VitaminE,
    VitaminK,
    Folate,
    Niacin,
    Thiamine,
    Riboflavin,
    VitaminB6,
    VitaminB12,
    Calcium,
    Iron,
    Potassium,
    Magnesium,
    Phosphorus,
    Zinc,
    Selenium,
    Copper,
    Manganese,
}

impl NutrientKey {
    pub const ALL: [NutrientKey; 34] = [
        Self::Calories,
        Self::CaloriesFromFat,
        Self::TotalFat,
        Self::SaturatedFat,
        Self::TransFat,
        Self::PolyunsaturatedFat,
        Self::MonounsaturatedFat,
        Self::Cholesterol,
        Self::Sodium,
        Self::TotalCarbs,
        Self::DietaryFiber,
        Self::TotalSugars,
        Self::AddedSugars,
        Self::Protein,
        Self::VitaminA,
        Self::VitaminC,
        Self::VitaminD,
        Self::VitaminE,
        Self::VitaminK,
        Self::Folate,
        Self::Niacin,
        Self::Thiamine,
        Self::Riboflavin,
        Self::VitaminB6,
        Self::VitaminB12,
        Self::Calcium,
        Self::Iron,
        Self::Potassium,
        Self::Magnesium,
        Self::Phosphorus,
        Self::Zinc,
        Self::Selenium,
        Self::Copper,
        Self::Manganese,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Calories => "Calories",
            Self::CaloriesFromFat => "Calories from Fat",
            Self::TotalFat => "Total Fat",
            Self::SaturatedFat => "Saturated Fat",
            Self::TransFat => "Trans Fat",
            Self::PolyunsaturatedFat => "Polyunsaturated Fat",
            Self::MonounsaturatedFat => "Monounsaturated Fat",
            Self::Cholesterol => "Cholesterol",
            Self::Sodium => "Sodium",
            Self::TotalCarbs => "Total Carbohydrate",
            Self::DietaryFiber => "Dietary Fiber",
            Self::TotalSugars => "Total Sugars",
            Self::AddedSugars => "Added Sugars",
            Self::Protein => "Protein",
            Self::VitaminA => "Vitamin A",
            Self::VitaminC => "Vitamin C",
            Self::VitaminD => "Vitamin D",
            Self::VitaminE => "Vitamin E",
            Self::VitaminK => "Vitamin K",
            Self::Folate => "Folate",
            Self::Niacin => "Niacin",
            Self::Thiamine => "Thiamine",
            Self::Riboflavin => "Riboflavin",
            Self::VitaminB6 => "Vitamin B6",
            Self::VitaminB12 => "Vitamin B12",
            Self::Calcium => "Calcium",
            Self::Iron => "Iron",
            Self::Potassium => "Potassium",
            Self::Magnesium => "Magnesium",
            Self::Phosphorus => "Phosphorus",
            Self::Zinc => "Zinc",
            Self::Selenium => "Selenium",
            Self::Copper => "Copper",
            Self::Manganese => "Manganese",
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Self::Calories | Self::CaloriesFromFat => Unit::Kcal,
            Self::Cholesterol
            | Self::Sodium
            | Self::VitaminC
            | Self::VitaminE
            | Self::Niacin
            | Self::Thiamine
            | Self::Riboflavin
            | Self::VitaminB6
            | Self::Calcium
            | Self::Iron
            | Self::Potassium
            | Self::Magnesium
            | Self::Phosphorus
            | Self::Zinc
            | Self::Copper
            | Self::Manganese => Unit::Milligram,
            Self::VitaminA
            | Self::VitaminD
            | Self::VitaminK
            | Self::Folate
            | Self::VitaminB12
            | Self::Selenium => Unit::Microgram,
            _ => Unit::Gram,
        }
    }

    /// Lowercase phrases a label uses for this nutrient, most specific first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Calories => &["calories", "energy", "kcal"],
            Self::CaloriesFromFat => &["calories from fat"],
            Self::TotalFat => &["total fat", "fat"],
            Self::SaturatedFat => &["saturated fat", "sat fat", "sat. fat", "saturated"],
            Self::TransFat => &["trans fat", "trans"],
            Self::PolyunsaturatedFat => &["polyunsaturated fat", "polyunsaturated"],
            Self::MonounsaturatedFat => &["monounsaturated fat", "monounsaturated"],
            Self::Cholesterol => &["cholesterol", "cholest"],
            Self::Sodium => &["sodium"],
            Self::TotalCarbs => &[
                "total carbohydrate",
                "carbohydrates",
                "carbohydrate",
                "total carbs",
                "carbs",
            ],
            Self::DietaryFiber => &["dietary fiber", "dietary fibre", "fiber", "fibre"],
            Self::TotalSugars => &["total sugars", "total sugar", "sugars", "sugar"],
            Self::AddedSugars => &["added sugars", "added sugar"],
            Self::Protein => &["protein"],
            Self::VitaminA => &["vitamin a", "vit a", "vit. a"],
            Self::VitaminC => &["vitamin c", "vit c", "vit. c", "ascorbic acid"],
            Self::VitaminD => &["vitamin d", "vit d", "vit. d"],
            Self::VitaminE => &["vitamin e", "vit e", "vit. e"],
            Self::VitaminK => &["vitamin k", "vit k", "vit. k"],
            Self::Folate => &["folate", "folic acid"],
            Self::Niacin => &["niacin"],
            Self::Thiamine => &["thiamine", "thiamin"],
            Self::Riboflavin => &["riboflavin"],
            Self::VitaminB6 => &["vitamin b6", "vit b6", "pyridoxine"],
            Self::VitaminB12 => &["vitamin b12", "vit b12", "cobalamin"],
            Self::Calcium => &["calcium"],
            Self::Iron => &["iron"],
            Self::Potassium => &["potassium"],
            Self::Magnesium => &["magnesium"],
            Self::Phosphorus => &["phosphorus"],
            Self::Zinc => &["zinc"],
            Self::Selenium => &["selenium"],
            Self::Copper => &["copper"],
            Self::Manganese => &["manganese"],
        }
    }

    /// FDA daily reference value in this key's canonical unit.
    pub fn daily_value(&self) -> Option<f64> {
        let dv = match self {
            Self::Calories => 2000.0,
            Self::TotalFat => 78.0,
            Self::SaturatedFat => 20.0,
            Self::Cholesterol => 300.0,
            Self::Sodium => 2300.0,
            Self::TotalCarbs => 275.0,
            Self::DietaryFiber => 28.0,
            Self::AddedSugars => 50.0,
            Self::Protein => 50.0,
            Self::VitaminA => 900.0,
            Self::VitaminC => 90.0,
            Self::VitaminD => 20.0,
            Self::VitaminE => 15.0,
            Self::VitaminK => 120.0,
            Self::Folate => 400.0,
            Self::Niacin => 16.0,
            Self::Thiamine => 1.2,
            Self::Riboflavin => 1.3,
            Self::VitaminB6 => 1.7,
            Self::VitaminB12 => 2.4,
            Self::Calcium => 1300.0,
            Self::Iron => 18.0,
            Self::Potassium => 4700.0,
            Self::Magnesium => 420.0,
            Self::Phosphorus => 1250.0,
            Self::Zinc => 11.0,
            Self::Selenium => 55.0,
            Self::Copper => 0.9,
            Self::Manganese => 2.3,
            Self::CaloriesFromFat
            | Self::TransFat
            | Self::PolyunsaturatedFat
            | Self::MonounsaturatedFat
            | Self::TotalSugars => return None,
        };
        Some(dv)
    }

    /// Inclusive plausible range for a per-serving amount.
    pub fn valid_range(&self) -> (f64, f64) {
        match self {
            Self::Calories | Self::CaloriesFromFat => (0.0, 2000.0),
            Self::TotalFat | Self::PolyunsaturatedFat | Self::MonounsaturatedFat => (0.0, 100.0),
            Self::SaturatedFat => (0.0, 50.0),
            Self::TransFat => (0.0, 10.0),
            Self::Cholesterol => (0.0, 1000.0),
            Self::Sodium => (0.0, 5000.0),
            Self::TotalCarbs => (0.0, 200.0),
            Self::DietaryFiber => (0.0, 50.0),
            Self::TotalSugars | Self::AddedSugars => (0.0, 100.0),
            Self::Protein => (0.0, 100.0),
            _ => (0.0, 10_000.0),
        }
    }

    pub fn in_range(&self, value: f64) -> bool {
        let (min, max) = self.valid_range();
        value.is_finite() && value >= min && value <= max
    }

    /// Percent of the daily value, rounded to one decimal.
    pub fn percent_daily_value(&self, amount: f64) -> Option<f64> {
        let dv = self.daily_value()?;
        Some(round_to(amount / dv * 100.0, 1))
    }
}

impl std::fmt::Display for NutrientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Sodium milligrams per gram of salt (EU labels declare salt, not sodium).
pub const SODIUM_MG_PER_SALT_G: f64 = 400.0;

/// Energy density used for macronutrient calorie shares.
pub const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
pub const KCAL_PER_GRAM_CARB: f64 = 4.0;
pub const KCAL_PER_GRAM_FAT: f64 = 9.0;

// ──────────────────────────────────────────────
// Claim thresholds
// ──────────────────────────────────────────────

/// Direction of a regulatory threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    AtMost,
    AtLeast,
}

impl Comparator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::AtMost => "≤",
            Self::AtLeast => "≥",
        }
    }

    pub fn holds(&self, value: f64, limit: f64) -> bool {
        match self {
            Self::AtMost => value <= limit,
            Self::AtLeast => value >= limit,
        }
    }
}

/// Which regulated nutrient content claim a threshold defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    FatFree,
    LowFat,
    SugarFree,
    LowSodium,
    HighFiber,
}

/// FDA per-serving threshold for a nutrient content claim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaimThreshold {
    pub kind: ClaimKind,
    pub label: &'static str,
    pub nutrient: NutrientKey,
    /// How explanations refer to the nutrient ("fat", "sodium").
    pub noun: &'static str,
    pub comparator: Comparator,
    pub limit: f64,
}

impl ClaimThreshold {
    pub fn is_met(&self, value: f64) -> bool {
        self.comparator.holds(value, self.limit)
    }

    /// `≤0.5g per serving`
    pub fn criterion(&self) -> String {
        format!(
            "{}{}{} per serving",
            self.comparator.symbol(),
            format_amount(self.limit),
            self.nutrient.unit().as_str()
        )
    }
}

pub static CLAIM_THRESHOLDS: [ClaimThreshold; 5] = [
    ClaimThreshold {
        kind: ClaimKind::FatFree,
        label: "fat free",
        noun: "fat",
        nutrient: NutrientKey::TotalFat,
        comparator: Comparator::AtMost,
        limit: 0.5,
    },
    ClaimThreshold {
        kind: ClaimKind::LowFat,
        label: "low fat",
        noun: "fat",
        nutrient: NutrientKey::TotalFat,
        comparator: Comparator::AtMost,
        limit: 3.0,
    },
    ClaimThreshold {
        kind: ClaimKind::SugarFree,
        label: "sugar free",
        noun: "sugar",
        nutrient: NutrientKey::TotalSugars,
        comparator: Comparator::AtMost,
        limit: 0.5,
    },
    ClaimThreshold {
        kind: ClaimKind::LowSodium,
        label: "low sodium",
        noun: "sodium",
        nutrient: NutrientKey::Sodium,
        comparator: Comparator::AtMost,
        limit: 140.0,
    },
    ClaimThreshold {
        kind: ClaimKind::HighFiber,
        label: "high fiber",
        noun: "fiber",
        nutrient: NutrientKey::DietaryFiber,
        comparator: Comparator::AtLeast,
        limit: 5.0,
    },
];

pub fn claim_threshold(kind: ClaimKind) -> &'static ClaimThreshold {
    CLAIM_THRESHOLDS
        .iter()
        .find(|t| t.kind == kind)
        .unwrap_or(&CLAIM_THRESHOLDS[0])
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Format an amount without a trailing `.0` (`3` rather than `3.0`, `0.5` kept).
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", round_to(value, 2))
    }
}
