use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime, Time};

use super::{clock_time, iso_date};

/// A logged physical activity joined with its owner's name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActivityRecord {
    pub slug: String,
    pub owner_name: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(with = "clock_time")]
    pub time: Time,
    pub activity_type: String,
    pub duration_minutes: i32,
    pub effort: String,
    pub avg_heart_rate: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
