use serde::Deserialize;
use time::{Date, Time};

use super::{clock_time, iso_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Light,
    Moderate,
    Vigorous,
}

impl Effort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effort::Light => "light",
            Effort::Moderate => "moderate",
            Effort::Vigorous => "vigorous",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityInput {
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(with = "clock_time")]
    pub time: Time,
    pub activity_type: String,
    pub duration_minutes: i32,
    pub effort: Effort,
    pub avg_heart_rate: Option<i32>,
}

impl ActivityInput {
    pub fn validate(mut self) -> Result<Self, String> {
        self.activity_type = self.activity_type.trim().to_string();
        if self.activity_type.is_empty() {
            return Err("activity_type is required".into());
        }
        if self.duration_minutes <= 0 {
            return Err("duration_minutes must be positive".into());
        }
        if self.avg_heart_rate.is_some_and(|hr| hr <= 0) {
            return Err("avg_heart_rate must be positive".into());
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    #[test]
    fn parses_date_time_and_effort() {
        let i: ActivityInput = serde_json::from_str(
            r#"{"date":"2026-03-14","time":"07:30","activity_type":" Running ",
                "duration_minutes":45,"effort":"vigorous","avg_heart_rate":150}"#,
        )
        .unwrap();
        let i = i.validate().unwrap();
        assert_eq!(i.date, date!(2026 - 03 - 14));
        assert_eq!(i.time, time!(7:30));
        assert_eq!(i.activity_type, "Running");
        assert_eq!(i.effort, Effort::Vigorous);
        assert_eq!(i.effort.as_str(), "vigorous");
    }

    #[test]
    fn rejects_invalid_values() {
        let base = |duration: i32, hr: Option<i32>, kind: &str| ActivityInput {
            date: date!(2026 - 01 - 01),
            time: time!(18:00),
            activity_type: kind.into(),
            duration_minutes: duration,
            effort: Effort::Light,
            avg_heart_rate: hr,
        };
        assert!(base(0, None, "walk").validate().is_err());
        assert!(base(30, Some(0), "walk").validate().is_err());
        assert!(base(30, None, "  ").validate().is_err());
        assert!(base(30, None, "walk").validate().is_ok());
    }

    #[test]
    fn rejects_unknown_effort_and_bad_date() {
        let bad_effort = r#"{"date":"2026-01-01","time":"08:00","activity_type":"swim",
                             "duration_minutes":20,"effort":"extreme"}"#;
        assert!(serde_json::from_str::<ActivityInput>(bad_effort).is_err());
        let bad_date = r#"{"date":"01/02/2026","time":"08:00","activity_type":"swim",
                           "duration_minutes":20,"effort":"light"}"#;
        assert!(serde_json::from_str::<ActivityInput>(bad_date).is_err());
    }
}
