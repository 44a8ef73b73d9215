//! Rule-generated findings, benefits, concerns and recommendations.
//!
//! Every rule reads one nutrient (or the NOVA class) independently; the lists
//! are capped so output size stays bounded whatever the label says.

use super::types::{HealthImpacts, ImpactRating};
use crate::pipeline::parsing::NutrientMap;
use crate::pipeline::standards::{format_amount, NutrientKey};

pub const MAX_INSIGHTS_PER_LIST: usize = 6;
pub const MAX_RECOMMENDATIONS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insights {
    pub findings: Vec<String>,
    pub benefits: Vec<String>,
    pub concerns: Vec<String>,
}

fn amount(facts: &NutrientMap, key: NutrientKey) -> f64 {
    facts.get(&key).copied().unwrap_or(0.0)
}

pub fn generate_insights(facts: &NutrientMap, nova_class: u8, density: f64) -> Insights {
    let mut out = Insights::default();

    density_rules(density, &mut out);
    nova_rules(nova_class, &mut out);
    protein_rules(amount(facts, NutrientKey::Protein), &mut out);
    fiber_rules(amount(facts, NutrientKey::DietaryFiber), &mut out);
    sodium_rules(amount(facts, NutrientKey::Sodium), &mut out);
    sugar_rules(
        amount(facts, NutrientKey::AddedSugars),
        amount(facts, NutrientKey::TotalSugars),
        &mut out,
    );
    fat_rules(
        amount(facts, NutrientKey::SaturatedFat),
        amount(facts, NutrientKey::TransFat),
        &mut out,
    );

    out.findings.truncate(MAX_INSIGHTS_PER_LIST);
    out.benefits.truncate(MAX_INSIGHTS_PER_LIST);
    out.concerns.truncate(MAX_INSIGHTS_PER_LIST);
    out
}

fn density_rules(density: f64, out: &mut Insights) {
    if density > 20.0 {
        out.findings.push(format!(
            "Exceptional nutrient density ({density:.1}) - among top 10% of foods for nutritional value per calorie"
        ));
        out.benefits.push(
            "Outstanding nutritional efficiency - provides maximum nutrients with minimal calories".into(),
        );
    } else if density > 15.0 {
        out.findings.push(format!(
            "High nutrient density score ({density:.1}) indicates excellent nutritional value per calorie"
        ));
        out.benefits.push(
            "Nutrient-dense food providing excellent nutritional bang for your caloric buck".into(),
        );
    } else if density > 8.0 {
        out.findings.push(format!(
            "Moderate nutrient density ({density:.1}) provides reasonable nutritional value"
        ));
        out.benefits.push("Decent nutritional value relative to calorie content".into());
    } else if density < 5.0 {
        out.findings.push(format!(
            "Low nutrient density ({density:.1}) suggests limited nutritional benefits"
        ));
        out.concerns.push(
            "Poor nutritional value relative to calorie content - mostly empty calories".into(),
        );
    }
}

fn nova_rules(nova_class: u8, out: &mut Insights) {
    match nova_class {
        1 => {
            out.findings.push(
                "NOVA Group 1 classification indicates unprocessed or minimally processed whole food".into(),
            );
            out.benefits.push(
                "Whole food with minimal processing retains natural nutritional profile".into(),
            );
        }
        2 => {
            out.findings.push(
                "NOVA Group 2 classification indicates processed culinary ingredients".into(),
            );
            out.benefits
                .push("Minimally processed with basic culinary modifications".into());
        }
        3 => {
            out.findings.push(
                "NOVA Group 3 classification indicates processed food with added ingredients".into(),
            );
            out.concerns.push(
                "Moderate processing may reduce some nutritional benefits of original ingredients".into(),
            );
        }
        _ => {
            out.findings.push(
                "NOVA Group 4 classification indicates ultra-processed food with industrial formulation".into(),
            );
            out.concerns.push(
                "Ultra-processed foods linked to increased obesity, diabetes, and cardiovascular disease risk".into(),
            );
            out.concerns.push(
                "May contain additives and preservatives with limited long-term safety data".into(),
            );
        }
    }
}

fn protein_rules(protein: f64, out: &mut Insights) {
    let g = format_amount(protein);
    if protein > 15.0 {
        out.benefits.push(format!(
            "Excellent protein content ({g}g) supports muscle synthesis and metabolic health"
        ));
    } else if protein > 10.0 {
        out.benefits.push(format!(
            "Good protein content ({g}g) supports muscle maintenance and satiety"
        ));
    } else if protein > 5.0 {
        out.findings.push(format!(
            "Moderate protein content ({g}g) contributes to daily protein needs"
        ));
    } else {
        out.concerns
            .push("Low protein content - consider pairing with protein-rich foods".into());
    }
}

fn fiber_rules(fiber: f64, out: &mut Insights) {
    let g = format_amount(fiber);
    if fiber > 10.0 {
        out.benefits.push(format!(
            "Exceptional fiber content ({g}g) promotes gut health, blood sugar control, and cardiovascular health"
        ));
    } else if fiber > 5.0 {
        out.benefits.push(format!(
            "High fiber content ({g}g) promotes digestive health and blood sugar control"
        ));
    } else if fiber > 3.0 {
        out.findings.push(format!(
            "Moderate fiber content ({g}g) contributes to daily fiber intake"
        ));
    } else if fiber < 2.0 {
        out.concerns.push(
            "Very low fiber content provides minimal digestive and metabolic benefits".into(),
        );
    }
}

fn sodium_rules(sodium: f64, out: &mut Insights) {
    let mg = format_amount(sodium);
    if sodium > 800.0 {
        out.concerns.push(format!(
            "Very high sodium content ({mg}mg) significantly increases hypertension and stroke risk"
        ));
        out.findings
            .push("Sodium level exceeds WHO recommended daily maximum in single serving".into());
    } else if sodium > 600.0 {
        out.concerns.push(format!(
            "High sodium content ({mg}mg) may contribute to hypertension and cardiovascular risk"
        ));
        out.findings
            .push("Exceeds heart-healthy sodium recommendations".into());
    } else if sodium > 300.0 {
        out.findings.push(format!(
            "Moderate sodium content ({mg}mg) - monitor total daily intake"
        ));
    } else if sodium < 140.0 {
        out.benefits.push(format!(
            "Low sodium content ({mg}mg) supports cardiovascular health"
        ));
    }
}

fn sugar_rules(added: f64, total: f64, out: &mut Insights) {
    let g = format_amount(added);
    if added > 15.0 {
        out.concerns.push(format!(
            "Very high added sugar content ({g}g) significantly increases diabetes and obesity risk"
        ));
        out.findings
            .push("Added sugars exceed WHO recommended daily maximum".into());
    } else if added > 10.0 {
        out.concerns.push(format!(
            "High added sugar content ({g}g) linked to metabolic health issues"
        ));
        out.findings
            .push("Added sugars exceed recommended daily intake guidelines".into());
    } else if added > 5.0 {
        out.findings.push(format!(
            "Moderate added sugar content ({g}g) - limit frequency of consumption"
        ));
    } else if added <= 1.0 && total <= 5.0 {
        out.benefits
            .push("Low sugar content supports stable blood glucose levels".into());
    }
}

fn fat_rules(saturated: f64, trans: f64, out: &mut Insights) {
    if saturated > 10.0 {
        out.concerns.push(format!(
            "High saturated fat content ({}g) may increase LDL cholesterol and heart disease risk",
            format_amount(saturated)
        ));
    } else if saturated > 5.0 {
        out.findings.push(format!(
            "Moderate saturated fat content ({}g) - balance with unsaturated fats",
            format_amount(saturated)
        ));
    }
    if trans > 0.0 {
        out.concerns.push(format!(
            "Contains trans fats ({}g) - strongly linked to cardiovascular disease",
            format_amount(trans)
        ));
    }
}

/// Consumption advice from the score bracket plus triggered impact flags.
pub fn generate_recommendations(
    overall_score: u8,
    impacts: &HealthImpacts,
    concerning_ingredients: &[String],
) -> Vec<String> {
    let bracket: [&str; 2] = match overall_score {
        80.. => [
            "Excellent choice - can be consumed regularly as part of balanced diet",
            "Consider as staple food option with high nutritional value",
        ],
        60..=79 => [
            "Good option - suitable for regular moderate consumption",
            "Pair with nutrient-dense foods to maximize nutritional benefits",
        ],
        40..=59 => [
            "Consume occasionally - limit to 2-3 times per week maximum",
            "Consider healthier alternatives when possible",
        ],
        _ => [
            "Limit consumption - reserve for special occasions only",
            "Seek whole food alternatives for better health outcomes",
        ],
    };
    let mut recommendations: Vec<String> = bracket.iter().map(|s| s.to_string()).collect();

    if impacts.cardiovascular.rating == ImpactRating::HighRisk {
        recommendations.push(
            "Monitor blood pressure if consuming regularly due to cardiovascular concerns".into(),
        );
    }
    if impacts.metabolic.rating == ImpactRating::Concerning {
        recommendations.push(
            "Consider timing consumption around physical activity to mitigate metabolic impact".into(),
        );
    }
    if !concerning_ingredients.is_empty() {
        let top: Vec<&str> = concerning_ingredients.iter().take(3).map(String::as_str).collect();
        recommendations.push(format!(
            "Be aware of concerning ingredients: {}",
            top.join(", ")
        ));
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::scoring::impacts::assess_health_impacts;

    fn facts(entries: &[(NutrientKey, f64)]) -> NutrientMap {
        entries.iter().copied().collect()
    }

    #[test]
    fn density_brackets() {
        let high = generate_insights(&NutrientMap::new(), 1, 25.0);
        assert!(high.findings[0].starts_with("Exceptional nutrient density (25.0)"));

        let gap = generate_insights(&NutrientMap::new(), 1, 6.0);
        assert!(!gap.findings.iter().any(|f| f.contains("nutrient density")));

        let low = generate_insights(&NutrientMap::new(), 1, 2.0);
        assert!(low.concerns[0].contains("empty calories"));
    }

    #[test]
    fn nova_four_adds_two_concerns() {
        let insights = generate_insights(&NutrientMap::new(), 4, 10.0);
        assert!(insights.findings.iter().any(|f| f.starts_with("NOVA Group 4")));
        assert!(insights.concerns.iter().any(|c| c.starts_with("Ultra-processed")));
        assert!(insights.concerns.iter().any(|c| c.contains("preservatives")));
    }

    #[test]
    fn nutrient_rules_quote_amounts() {
        let insights = generate_insights(
            &facts(&[
                (NutrientKey::Protein, 18.0),
                (NutrientKey::DietaryFiber, 7.0),
                (NutrientKey::Sodium, 950.0),
                (NutrientKey::TransFat, 0.5),
            ]),
            2,
            10.0,
        );
        assert!(insights.benefits.iter().any(|b| b.contains("(18g)")));
        assert!(insights.benefits.iter().any(|b| b.contains("High fiber content (7g)")));
        assert!(insights.concerns.iter().any(|c| c.contains("(950mg)")));
        assert!(insights.concerns.iter().any(|c| c.contains("trans fats (0.5g)")));
    }

    #[test]
    fn lists_capped_at_six() {
        let insights = generate_insights(
            &facts(&[
                (NutrientKey::Protein, 1.0),
                (NutrientKey::DietaryFiber, 0.0),
                (NutrientKey::Sodium, 1200.0),
                (NutrientKey::AddedSugars, 30.0),
                (NutrientKey::SaturatedFat, 15.0),
                (NutrientKey::TransFat, 2.0),
            ]),
            4,
            1.0,
        );
        assert_eq!(insights.concerns.len(), MAX_INSIGHTS_PER_LIST);
        assert!(insights.findings.len() <= MAX_INSIGHTS_PER_LIST);
    }

    #[test]
    fn recommendations_bracket_and_extras() {
        let impacts = assess_health_impacts(
            &facts(&[
                (NutrientKey::Sodium, 900.0),
                (NutrientKey::SaturatedFat, 9.0),
                (NutrientKey::TotalSugars, 30.0),
            ]),
            &[],
        );
        let concerning = vec![
            "Bha".to_string(),
            "Bht".to_string(),
            "Aspartame".into(),
            "Red 3".into(),
        ];
        let recs = generate_recommendations(30, &impacts, &concerning);
        assert_eq!(recs.len(), MAX_RECOMMENDATIONS);
        assert!(recs[0].starts_with("Limit consumption"));
        assert!(recs[2].starts_with("Monitor blood pressure"));
        assert!(recs[3].starts_with("Consider timing"));
    }

    #[test]
    fn concerning_ingredients_top_three() {
        let impacts = assess_health_impacts(&NutrientMap::new(), &[]);
        let concerning = vec!["A".to_string(), "B".into(), "C".into(), "D".into()];
        let recs = generate_recommendations(85, &impacts, &concerning);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[2], "Be aware of concerning ingredients: A, B, C");
    }
}
