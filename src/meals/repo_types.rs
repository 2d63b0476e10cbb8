use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::recommend::Assessment;

/// A logged meal joined with its owner's name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MealRecord {
    #[serde(skip_serializing)]
    pub id: Uuid,
    pub slug: String,
    pub clinical_record_id: Uuid,
    pub owner_name: String,
    pub description: String,
    pub current_glucose: Option<i32>,
    pub insulin_units: i32,
    pub insulin_name: String,
    pub total_carbs: i32,
    pub total_calories: i32,
    pub tokens_used: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

/// Column values written on every save.
#[derive(Debug, Clone)]
pub struct MealWrite<'a> {
    pub description: &'a str,
    pub current_glucose: Option<i32>,
    pub assessment: &'a Assessment,
}
