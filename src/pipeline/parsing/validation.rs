// Range validation and daily-value back-fill for parsed nutrient amounts.
// Applied to every amount before it reaches StructuredNutritionData, whether
// it came from label text or from a product database record.

use std::collections::BTreeMap;

use super::types::{NutrientMap, ParseWarning, WarningField};
use crate::pipeline::standards::{round_to, NutrientKey};

/// Largest %DV a label plausibly prints (fortified cereals reach several hundred).
const MAX_PERCENT_DAILY_VALUE: f64 = 1000.0;

/// Validated amounts and percentages plus the warnings for anything dropped.
#[derive(Debug, Clone, Default)]
pub struct ValidatedFacts {
    pub amounts: NutrientMap,
    pub daily_values: NutrientMap,
    pub warnings: Vec<ParseWarning>,
}

/// Drop out-of-range amounts and percentages, then back-fill missing %DV.
pub fn validate_nutrients(
    raw_amounts: BTreeMap<NutrientKey, f64>,
    raw_daily_values: BTreeMap<NutrientKey, f64>,
) -> ValidatedFacts {
    let mut warnings = Vec::new();

    // 1. Amounts against physiological ranges
    let mut amounts = NutrientMap::new();
    for (key, value) in raw_amounts {
        let (min, max) = key.valid_range();
        if key.in_range(value) {
            amounts.insert(key, value);
        } else {
            warnings.push(ParseWarning {
                key,
                field: WarningField::Amount,
                value,
                min,
                max,
            });
        }
    }

    // 2. Inline percentages
    let mut daily_values = NutrientMap::new();
    for (key, percent) in raw_daily_values {
        if percent.is_finite() && (0.0..=MAX_PERCENT_DAILY_VALUE).contains(&percent) {
            daily_values.insert(key, percent);
        } else {
            warnings.push(ParseWarning {
                key,
                field: WarningField::DailyValue,
                value: percent,
                min: 0.0,
                max: MAX_PERCENT_DAILY_VALUE,
            });
        }
    }

    // 3. Back-fill
    backfill_daily_values(&amounts, &mut daily_values);

    for warning in &warnings {
        tracing::warn!(
            nutrient = %warning.key,
            value = warning.value,
            min = warning.min,
            max = warning.max,
            "Nutrient value outside plausible range, dropped"
        );
    }

    ValidatedFacts {
        amounts,
        daily_values,
        warnings,
    }
}

/// Compute %DV from the FDA reference for every known amount whose
/// percentage was not printed on the label.
pub fn backfill_daily_values(amounts: &NutrientMap, daily_values: &mut NutrientMap) {
    for (key, amount) in amounts {
        if daily_values.contains_key(key) {
            continue;
        }
        if let Some(percent) = key.percent_daily_value(*amount) {
            daily_values.insert(*key, round_to(percent, 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(NutrientKey, f64)]) -> BTreeMap<NutrientKey, f64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn out_of_range_amount_dropped_with_warning() {
        let result = validate_nutrients(
            map(&[(NutrientKey::Calories, 2400.0), (NutrientKey::Protein, 5.0)]),
            BTreeMap::new(),
        );
        assert!(!result.amounts.contains_key(&NutrientKey::Calories));
        assert_eq!(result.amounts.get(&NutrientKey::Protein), Some(&5.0));
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].key, NutrientKey::Calories);
        assert_eq!(result.warnings[0].field, WarningField::Amount);
        assert_eq!(result.warnings[0].max, 2000.0);
    }

    #[test]
    fn boundary_values_kept() {
        let result = validate_nutrients(
            map(&[(NutrientKey::Calories, 2000.0), (NutrientKey::TransFat, 0.0)]),
            BTreeMap::new(),
        );
        assert_eq!(result.amounts.len(), 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn backfill_only_when_percentage_missing() {
        let result = validate_nutrients(
            map(&[(NutrientKey::Sodium, 460.0), (NutrientKey::TotalFat, 3.0)]),
            map(&[(NutrientKey::TotalFat, 4.0)]),
        );
        assert_eq!(result.daily_values.get(&NutrientKey::Sodium), Some(&20.0));
        assert_eq!(result.daily_values.get(&NutrientKey::TotalFat), Some(&4.0));
    }

    #[test]
    fn no_backfill_without_reference() {
        let result = validate_nutrients(map(&[(NutrientKey::TotalSugars, 12.0)]), BTreeMap::new());
        assert!(result.daily_values.is_empty());
    }

    #[test]
    fn absurd_percentage_dropped() {
        let result = validate_nutrients(BTreeMap::new(), map(&[(NutrientKey::Iron, 4500.0)]));
        assert!(result.daily_values.is_empty());
        assert_eq!(result.warnings[0].field, WarningField::DailyValue);
    }
}
