use serde::Serialize;

use crate::clinical::repo_types::ClinicalRecord;

const DEFAULT_DIABETES_TYPE: &str = "none";
const DEFAULT_BOLUS: i32 = 1;
const DEFAULT_TARGET_GLUCOSE: i32 = 100;

/// Request payload describing the patient and the meal to estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationContext {
    pub medications: Vec<String>,
    pub diabetes_type: String,
    /// Grams of carbohydrate covered by one insulin unit.
    pub meal_bolus: i32,
    /// mg/dL lowered by one insulin unit.
    pub correction_bolus: i32,
    pub target_glucose: i32,
    pub current_glucose: Option<i32>,
    pub meal_description: String,
}

impl RecommendationContext {
    /// Zero and blank profile values count as absent.
    pub fn for_meal(
        record: &ClinicalRecord,
        medications: Vec<String>,
        current_glucose: Option<i32>,
        meal_description: &str,
    ) -> Self {
        let diabetes_type = record
            .diabetes_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_DIABETES_TYPE)
            .to_string();

        Self {
            medications,
            diabetes_type,
            meal_bolus: non_zero(record.meal_bolus).unwrap_or(DEFAULT_BOLUS),
            correction_bolus: non_zero(record.correction_bolus).unwrap_or(DEFAULT_BOLUS),
            target_glucose: non_zero(record.target_glucose).unwrap_or(DEFAULT_TARGET_GLUCOSE),
            current_glucose,
            meal_description: meal_description.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}

fn non_zero(v: Option<i32>) -> Option<i32> {
    v.filter(|n| *n != 0)
}
