use serde::{Deserialize, Serialize};

use super::repo_types::{ClinicalRecord, Medication};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiabetesType {
    Type1,
    Type2,
    Gestational,
    Prediabetes,
    Other,
}

impl DiabetesType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiabetesType::Type1 => "type1",
            DiabetesType::Type2 => "type2",
            DiabetesType::Gestational => "gestational",
            DiabetesType::Prediabetes => "prediabetes",
            DiabetesType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicationInput {
    pub trade_name: String,
    pub active_ingredient: Option<String>,
    pub therapeutic_class: Option<String>,
}

/// Body of create and update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ClinicalRecordInput {
    pub diabetes_type: Option<DiabetesType>,
    pub meal_bolus: Option<i32>,
    pub correction_bolus: Option<i32>,
    pub target_glucose: Option<i32>,
    #[serde(default)]
    pub medications: Vec<MedicationInput>,
}

impl ClinicalRecordInput {
    /// Trims text fields and rejects negative parameters or nameless medications.
    pub fn validate(mut self) -> Result<Self, String> {
        for (label, value) in [
            ("meal_bolus", self.meal_bolus),
            ("correction_bolus", self.correction_bolus),
            ("target_glucose", self.target_glucose),
        ] {
            if value.is_some_and(|v| v < 0) {
                return Err(format!("{label} must not be negative"));
            }
        }

        for med in &mut self.medications {
            med.trade_name = med.trade_name.trim().to_string();
            if med.trade_name.is_empty() {
                return Err("medication trade_name is required".into());
            }
            med.active_ingredient = clean(med.active_ingredient.take());
            med.therapeutic_class = clean(med.therapeutic_class.take());
        }
        Ok(self)
    }
}

fn clean(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[derive(Debug, Serialize)]
pub struct ClinicalRecordView {
    #[serde(flatten)]
    pub record: ClinicalRecord,
    pub medications: Vec<Medication>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(json: &str) -> ClinicalRecordInput {
        serde_json::from_str(json).expect("valid body")
    }

    #[test]
    fn validate_trims_medications() {
        let i = input(
            r#"{"diabetes_type":"type1","meal_bolus":15,
                "medications":[{"trade_name":"  Lantus ","active_ingredient":" ","therapeutic_class":"insulin"}]}"#,
        )
        .validate()
        .unwrap();
        assert_eq!(i.diabetes_type, Some(DiabetesType::Type1));
        assert_eq!(i.medications[0].trade_name, "Lantus");
        assert_eq!(i.medications[0].active_ingredient, None);
        assert_eq!(i.medications[0].therapeutic_class.as_deref(), Some("insulin"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(input(r#"{"target_glucose":-1}"#).validate().is_err());
        assert!(input(r#"{"medications":[{"trade_name":"  "}]}"#).validate().is_err());
    }

    #[test]
    fn unknown_diabetes_type_is_rejected_by_serde() {
        assert!(serde_json::from_str::<ClinicalRecordInput>(r#"{"diabetes_type":"type9"}"#).is_err());
    }
}
