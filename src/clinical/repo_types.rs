use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A patient's clinical profile.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClinicalRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub diabetes_type: Option<String>,
    pub meal_bolus: Option<i32>,
    pub correction_bolus: Option<i32>,
    pub target_glucose: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Medication {
    #[serde(skip_serializing)]
    pub clinical_record_id: Uuid,
    pub trade_name: String,
    pub active_ingredient: Option<String>,
    pub therapeutic_class: Option<String>,
}
