//! Daily target suggestion from a body profile (Mifflin–St Jeor).

use crate::models::{Gender, Pfc, UserProfile};

const FALLBACK_HEIGHT_CM: f64 = 170.0;
const FALLBACK_WEIGHT_KG: f64 = 70.0;
const FALLBACK_AGE: u32 = 30;

const CUT_KCAL: f64 = 500.0;
const BULK_KCAL: f64 = 300.0;

fn or_fallback(value: f64, fallback: f64) -> f64 {
    if value > 0.0 { value } else { fallback }
}

fn min_calories(gender: Gender) -> f64 {
    match gender {
        Gender::Male => 1500.0,
        Gender::Female => 1200.0,
    }
}

#[must_use]
pub fn basal_metabolic_rate(profile: &UserProfile) -> f64 {
    let h = or_fallback(profile.height, FALLBACK_HEIGHT_CM);
    let w = or_fallback(profile.weight, FALLBACK_WEIGHT_KG);
    let a = f64::from(if profile.age > 0 { profile.age } else { FALLBACK_AGE });
    let base = 10.0 * w + 6.25 * h - 5.0 * a;
    match profile.gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    }
}

#[must_use]
pub fn body_mass_index(profile: &UserProfile) -> f64 {
    let h = or_fallback(profile.height, FALLBACK_HEIGHT_CM) / 100.0;
    or_fallback(profile.weight, FALLBACK_WEIGHT_KG) / (h * h)
}

/// Suggested target: TDEE adjusted toward the target weight, split 25/25/50 P/F/C by energy.
#[must_use]
pub fn suggested_target(profile: &UserProfile) -> Pfc {
    let weight = or_fallback(profile.weight, FALLBACK_WEIGHT_KG);
    let target_weight = or_fallback(profile.target_weight, weight);
    let tdee = basal_metabolic_rate(profile) * profile.activity_level;

    let mut calories = tdee;
    if target_weight < weight {
        calories -= CUT_KCAL;
    } else if target_weight > weight {
        calories += BULK_KCAL;
    }
    let calories = calories.max(min_calories(profile.gender));

    Pfc {
        protein: (calories * 0.25 / 4.0).round(),
        fat: (calories * 0.25 / 9.0).round(),
        carbs: (calories * 0.50 / 4.0).round(),
        calories: calories.round(),
    }
}
