//! OpenFoodFacts product database client.
//!
//! Barcode lookup is tried before name search. A hit is mapped into the
//! same validated `StructuredNutritionData` the label parser produces, plus
//! a synthetic text block so downstream text consumers see one shape.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::types::{ProductLookup, ProductRecord};
use super::{status_error, ExtractionError};
use crate::config::{normalize_base_url, ProductLookupConfig};
use crate::pipeline::parsing::text::title_case;
use crate::pipeline::parsing::validation::validate_nutrients;
use crate::pipeline::parsing::{ServingInfo, StructuredNutritionData};
use crate::pipeline::standards::{format_amount, NutrientKey, SODIUM_MG_PER_SALT_G};

/// Ingredient items kept from `ingredients_text`.
const MAX_INGREDIENTS: usize = 25;

/// `nutriments` field (per 100 g) for each directly mapped key, with fallbacks.
const NUTRIMENT_FIELDS: &[(NutrientKey, &[&str])] = &[
    (
        NutrientKey::Calories,
        &["energy-kcal_100g", "energy-kcal_value", "energy-kcal"],
    ),
    (NutrientKey::TotalFat, &["fat_100g"]),
    (NutrientKey::SaturatedFat, &["saturated-fat_100g"]),
    (NutrientKey::TotalCarbs, &["carbohydrates_100g"]),
    (NutrientKey::TotalSugars, &["sugars_100g"]),
    (NutrientKey::Protein, &["proteins_100g", "protein_100g"]),
    (NutrientKey::DietaryFiber, &["fiber_100g"]),
];

/// OpenFoodFacts HTTP client.
pub struct OpenFoodFactsClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ExtractionError> {
        let base_url = normalize_base_url(base_url)
            .ok_or_else(|| ExtractionError::InvalidUrl(base_url.to_string()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("labelscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &ProductLookupConfig) -> Result<Self, ExtractionError> {
        Self::new(&config.base_url, config.timeout_secs)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ExtractionError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| ExtractionError::from_transport(e, &self.base_url, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(status_error(response));
        }

        response
            .json()
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))
    }

    fn by_barcode(&self, barcode: &str) -> Result<Option<OffProduct>, ExtractionError> {
        let url = format!("{}/api/v0/product/{barcode}.json", self.base_url);
        let reply: OffProductResponse = self.get_json(&url, &[])?;
        Ok(reply.into_product())
    }

    fn by_name(&self, name: &str) -> Result<Option<OffProduct>, ExtractionError> {
        let url = format!("{}/cgi/search.pl", self.base_url);
        let reply: OffSearchResponse = self.get_json(
            &url,
            &[
                ("search_terms", name),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page_size", "1"),
            ],
        )?;
        Ok(reply.products.into_iter().next())
    }
}

impl ProductLookup for OpenFoodFactsClient {
    fn lookup(
        &self,
        barcode: Option<&str>,
        name: Option<&str>,
    ) -> Result<ProductRecord, ExtractionError> {
        let _span = tracing::info_span!("openfoodfacts_lookup", ?barcode, ?name).entered();

        // A barcode miss falls through to the name search; a barcode
        // transport error is only returned when there is no name to try.
        let mut barcode_error = None;
        if let Some(code) = barcode {
            match self.by_barcode(code) {
                Ok(Some(product)) => return Ok(product_record(&product)),
                Ok(None) => tracing::info!(barcode = code, "Barcode not in product database"),
                Err(e) => {
                    tracing::warn!(barcode = code, error = %e, "Barcode lookup failed");
                    barcode_error = Some(e);
                }
            }
        }

        if let Some(name) = name {
            if let Some(product) = self.by_name(name)? {
                return Ok(product_record(&product));
            }
        }

        Err(barcode_error.unwrap_or_else(|| {
            ExtractionError::NotFound(
                barcode.or(name).unwrap_or("no identifiers").to_string(),
            )
        }))
    }
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Deserialize)]
struct OffProductResponse {
    #[serde(default)]
    status: Value,
    #[serde(default)]
    product: Option<OffProduct>,
}

impl OffProductResponse {
    fn into_product(self) -> Option<OffProduct> {
        (number(&self.status) == Some(1.0))
            .then_some(self.product)
            .flatten()
    }
}

#[derive(Deserialize)]
struct OffSearchResponse {
    #[serde(default)]
    products: Vec<OffProduct>,
}

#[derive(Debug, Default, Deserialize)]
struct OffProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    serving_size: Option<String>,
    #[serde(default)]
    ingredients_text: Option<String>,
    #[serde(default)]
    ingredients_text_en: Option<String>,
    #[serde(default)]
    labels: Option<String>,
    #[serde(default)]
    nutriscore_grade: Option<String>,
    #[serde(default)]
    nova_group: Value,
    #[serde(default)]
    allergens_tags: Vec<String>,
    #[serde(default)]
    nutriments: HashMap<String, Value>,
}

/// OFF sends numbers both as JSON numbers and as strings.
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

// ──────────────────────────────────────────────
// Mapping
// ──────────────────────────────────────────────

fn product_record(product: &OffProduct) -> ProductRecord {
    let data = structured_from_product(product);
    let text = synthetic_text(product.product_name.as_deref(), &data);
    tracing::info!(
        nutrients = data.nutrition_facts.len(),
        ingredients = data.ingredients.len(),
        claims = data.claims.len(),
        "Product found in database"
    );
    ProductRecord {
        text: text.clone(),
        structured: Some(StructuredNutritionData {
            raw_text: text,
            ..data
        }),
    }
}

fn nutriment(product: &OffProduct, fields: &[&str]) -> Option<f64> {
    fields
        .iter()
        .find_map(|f| product.nutriments.get(*f).and_then(number))
}

fn structured_from_product(product: &OffProduct) -> StructuredNutritionData {
    let mut amounts = BTreeMap::new();
    for (key, fields) in NUTRIMENT_FIELDS {
        if let Some(value) = nutriment(product, fields) {
            amounts.insert(*key, value);
        }
    }
    let sodium_mg = nutriment(product, &["sodium_100g"])
        .map(|g| g * 1000.0)
        .or_else(|| nutriment(product, &["salt_100g"]).map(|g| g * SODIUM_MG_PER_SALT_G));
    if let Some(mg) = sodium_mg {
        amounts.insert(NutrientKey::Sodium, mg);
    }

    let validated = validate_nutrients(amounts, BTreeMap::new());

    StructuredNutritionData {
        nutrition_facts: validated.amounts,
        daily_values: validated.daily_values,
        serving: ServingInfo {
            serving_size: product
                .serving_size
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            servings_per_container: None,
        },
        ingredients: split_ingredients(
            product
                .ingredients_text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .or(product.ingredients_text_en.as_deref())
                .unwrap_or(""),
        ),
        allergens: allergens(&product.allergens_tags),
        claims: claims(product),
        raw_text: String::new(),
        warnings: validated.warnings,
    }
}

fn split_ingredients(text: &str) -> Vec<String> {
    text.split([',', ';'])
        .map(|s| {
            s.trim()
                .trim_end_matches('.')
                .trim_matches(|c| c == '_' || c == '*')
                .trim()
        })
        .filter(|s| s.chars().count() > 1)
        .map(title_case)
        .take(MAX_INGREDIENTS)
        .collect()
}

/// `en:tree-nuts` → `Tree Nuts`; sorted and de-duplicated.
fn allergens(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = tags
        .iter()
        .map(|t| t.rsplit(':').next().unwrap_or(t).replace('-', " "))
        .filter(|t| !t.trim().is_empty())
        .map(|t| title_case(t.trim()))
        .collect();
    out.sort();
    out.dedup();
    out
}

fn claims(product: &OffProduct) -> Vec<String> {
    let mut out: Vec<String> = product
        .labels
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(grade) = product
        .nutriscore_grade
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty() && *g != "unknown")
    {
        out.push(format!("Nutri-Score {}", grade.to_uppercase()));
    }
    if let Some(group) = number(&product.nova_group) {
        out.push(format!("NOVA group {}", group as u8));
    }
    out
}

fn synthetic_text(name: Option<&str>, data: &StructuredNutritionData) -> String {
    let mut lines = Vec::new();
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        lines.push(format!("Name: {name}"));
    }
    if !data.ingredients.is_empty() {
        lines.push(format!("Ingredients: {}", data.ingredients.join(", ")));
    }
    if !data.nutrition_facts.is_empty() {
        let summary = data
            .nutrition_facts
            .iter()
            .map(|(key, value)| {
                format!(
                    "{} {}{}",
                    key.display_name(),
                    format_amount(*value),
                    key.unit().as_str()
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Nutrition (per 100g): {summary}"));
    }
    if !data.claims.is_empty() {
        lines.push(format!("Claims: {}", data.claims.join(", ")));
    }
    lines.join("\n")
}
