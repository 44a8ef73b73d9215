//! Per-calorie nutrient metrics.

use super::types::{MacronutrientBalance, MicronutrientSnapshot};
use crate::pipeline::parsing::NutrientMap;
use crate::pipeline::standards::{
    round_to, NutrientKey, KCAL_PER_GRAM_CARB, KCAL_PER_GRAM_FAT, KCAL_PER_GRAM_PROTEIN,
};

const MAX_DENSITY: f64 = 100.0;

/// Acceptable macronutrient distribution ranges, percent of calories.
const PROTEIN_RANGE: (f64, f64) = (10.0, 35.0);
const FAT_RANGE: (f64, f64) = (20.0, 35.0);
const CARB_RANGE: (f64, f64) = (45.0, 65.0);
const OUT_OF_RANGE_PENALTY: f64 = 20.0;

fn amount(facts: &NutrientMap, key: NutrientKey) -> f64 {
    facts.get(&key).copied().unwrap_or(0.0)
}

fn calories(facts: &NutrientMap) -> f64 {
    amount(facts, NutrientKey::Calories)
}

/// Weighted nutrients per 100 kcal, capped at 100. Zero without calories.
pub fn nutrient_density(facts: &NutrientMap) -> f64 {
    let kcal = calories(facts);
    if kcal <= 0.0 {
        return 0.0;
    }
    let weighted = amount(facts, NutrientKey::Protein) * 4.0
        + amount(facts, NutrientKey::DietaryFiber) * 2.0
        + amount(facts, NutrientKey::VitaminC) * 0.1
        + amount(facts, NutrientKey::Calcium) * 0.01
        + amount(facts, NutrientKey::Iron);
    (weighted / kcal * 100.0).min(MAX_DENSITY)
}

pub fn macronutrient_balance(facts: &NutrientMap) -> MacronutrientBalance {
    let kcal = calories(facts);
    if kcal <= 0.0 {
        return MacronutrientBalance::default();
    }
    let share =
        |key: NutrientKey, kcal_per_gram: f64| amount(facts, key) * kcal_per_gram / kcal * 100.0;
    let protein_pct = share(NutrientKey::Protein, KCAL_PER_GRAM_PROTEIN);
    let fat_pct = share(NutrientKey::TotalFat, KCAL_PER_GRAM_FAT);
    let carb_pct = share(NutrientKey::TotalCarbs, KCAL_PER_GRAM_CARB);

    let outside = |pct: f64, (low, high): (f64, f64)| pct < low || pct > high;
    let mut balance_score = 100.0;
    for (pct, range) in [
        (protein_pct, PROTEIN_RANGE),
        (fat_pct, FAT_RANGE),
        (carb_pct, CARB_RANGE),
    ] {
        if outside(pct, range) {
            balance_score -= OUT_OF_RANGE_PENALTY;
        }
    }

    MacronutrientBalance {
        protein_pct: round_to(protein_pct, 1),
        carb_pct: round_to(carb_pct, 1),
        fat_pct: round_to(fat_pct, 1),
        balance_score,
    }
}

/// Density per 100 kcal of the serving; zero without calories.
pub fn caloric_efficiency(density: f64, facts: &NutrientMap) -> f64 {
    let kcal = calories(facts);
    if kcal <= 0.0 {
        return 0.0;
    }
    round_to(density / (kcal / 100.0), 2)
}

pub fn micronutrient_snapshot(facts: &NutrientMap) -> MicronutrientSnapshot {
    MicronutrientSnapshot {
        vitamin_c_mg: amount(facts, NutrientKey::VitaminC),
        calcium_mg: amount(facts, NutrientKey::Calcium),
        iron_mg: amount(facts, NutrientKey::Iron),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(entries: &[(NutrientKey, f64)]) -> NutrientMap {
        entries.iter().copied().collect()
    }

    #[test]
    fn density_formula() {
        // (10*4 + 5*2 + 30*0.1 + 200*0.01 + 2) / 200 * 100 = 57 / 200 * 100 = 28.5
        let f = facts(&[
            (NutrientKey::Calories, 200.0),
            (NutrientKey::Protein, 10.0),
            (NutrientKey::DietaryFiber, 5.0),
            (NutrientKey::VitaminC, 30.0),
            (NutrientKey::Calcium, 200.0),
            (NutrientKey::Iron, 2.0),
        ]);
        assert!((nutrient_density(&f) - 28.5).abs() < 1e-9);
    }

    #[test]
    fn density_capped_and_zero_calorie_safe() {
        let dense = facts(&[(NutrientKey::Calories, 10.0), (NutrientKey::Protein, 20.0)]);
        assert_eq!(nutrient_density(&dense), 100.0);
        let no_kcal = facts(&[(NutrientKey::Protein, 20.0)]);
        assert_eq!(nutrient_density(&no_kcal), 0.0);
    }

    #[test]
    fn balanced_macros_score_full() {
        // 200 kcal: protein 10g = 20%, fat 6g = 27%, carbs 27g = 54%
        let f = facts(&[
            (NutrientKey::Calories, 200.0),
            (NutrientKey::Protein, 10.0),
            (NutrientKey::TotalFat, 6.0),
            (NutrientKey::TotalCarbs, 27.0),
        ]);
        let b = macronutrient_balance(&f);
        assert_eq!(b.protein_pct, 20.0);
        assert_eq!(b.fat_pct, 27.0);
        assert_eq!(b.carb_pct, 54.0);
        assert_eq!(b.balance_score, 100.0);
    }

    #[test]
    fn every_macro_out_of_range() {
        // Pure sugar: protein 0%, fat 0%, carbs 100%
        let f = facts(&[(NutrientKey::Calories, 100.0), (NutrientKey::TotalCarbs, 25.0)]);
        let b = macronutrient_balance(&f);
        assert_eq!(b.balance_score, 40.0);
    }

    #[test]
    fn zero_calories_gives_zero_balance() {
        assert_eq!(macronutrient_balance(&NutrientMap::new()), MacronutrientBalance::default());
    }

    #[test]
    fn caloric_efficiency_rounds() {
        let f = facts(&[(NutrientKey::Calories, 300.0)]);
        assert_eq!(caloric_efficiency(10.0, &f), 3.33);
        assert_eq!(caloric_efficiency(10.0, &NutrientMap::new()), 0.0);
    }
}
