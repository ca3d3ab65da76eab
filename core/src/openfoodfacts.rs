use serde::Deserialize;

use crate::models::{FoodEstimate, Pfc, round1};

pub const SOURCE: &str = "openfoodfacts";

const KJ_PER_KCAL: f64 = 4.184;

#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    pub status: i32,
    pub product: Option<ProductData>,
}

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub nutriments: Option<Nutriments>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct Nutriments {
    #[serde(rename = "energy-kcal_100g")]
    pub energy_kcal_100g: Option<f64>,
    /// Energy in kJ, used when the kcal figure is absent.
    #[serde(rename = "energy_100g")]
    pub energy_kj_100g: Option<f64>,
    pub proteins_100g: Option<f64>,
    pub carbohydrates_100g: Option<f64>,
    pub fat_100g: Option<f64>,
}

fn non_negative(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0)
}

/// Convert a product to a per-100 g estimate. Products without a name or any energy value
/// are unusable and yield `None`; missing macros count as zero.
#[must_use]
pub fn product_to_estimate(p: ProductData) -> Option<FoodEstimate> {
    let name = p.product_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
    let nutriments = p.nutriments?;
    let calories = nutriments
        .energy_kcal_100g
        .or_else(|| nutriments.energy_kj_100g.map(|kj| round1(kj / KJ_PER_KCAL)))
        .filter(|v| v.is_finite() && *v >= 0.0)?;

    Some(FoodEstimate {
        name,
        brand: p
            .brands
            .and_then(|b| b.split(',').next().map(|s| s.trim().to_string()))
            .filter(|b| !b.is_empty()),
        per_100g: Pfc {
            protein: non_negative(nutriments.proteins_100g),
            fat: non_negative(nutriments.fat_100g),
            carbs: non_negative(nutriments.carbohydrates_100g),
            calories,
        },
        source: SOURCE.to_string(),
    })
}
