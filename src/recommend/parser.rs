use serde_json::{Map, Value};
use thiserror::Error;

use super::DerivedFields;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecommendationParseError {
    #[error("empty response")]
    Empty,

    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a non-negative integer: {value}")]
    NotAnInteger { field: &'static str, value: String },

    #[error("field `{0}` is not a string")]
    NotAString(&'static str),

    #[error("field `{0}` is not a list")]
    NotAList(&'static str),
}

/// A successfully parsed model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub foods: Vec<Value>,
    pub fields: DerivedFields,
}

// (canonical key, accepted aliases)
const FOODS: (&str, &[&str]) = ("foods", &["lista_alimentos", "alimentos"]);
const CARBS: (&str, &[&str]) = ("total_carbs", &["carboidratos", "total_carboidratos"]);
const CALORIES: (&str, &[&str]) = ("total_calories", &["calorias", "total_calorias"]);
const UNITS: (&str, &[&str]) = ("insulin_units", &["qtd_insulina", "quantidade_insulina"]);
const INSULIN: (&str, &[&str]) = ("insulin_name", &["nome_insulina"]);

pub fn parse_recommendation(raw: &str) -> Result<Recommendation, RecommendationParseError> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(RecommendationParseError::Empty);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| RecommendationParseError::Json(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or(RecommendationParseError::NotAnObject)?;

    let foods = match field(obj, FOODS)? {
        Value::Array(items) => items.clone(),
        _ => return Err(RecommendationParseError::NotAList(FOODS.0)),
    };
    let total_carbs = integer(obj, CARBS)?;
    let total_calories = integer(obj, CALORIES)?;
    let insulin_units = integer(obj, UNITS)?;
    let insulin_name = match field(obj, INSULIN)? {
        Value::String(s) => s.trim().to_string(),
        _ => return Err(RecommendationParseError::NotAString(INSULIN.0)),
    };

    Ok(Recommendation {
        foods,
        fields: DerivedFields {
            total_carbs,
            total_calories,
            insulin_units,
            insulin_name,
        },
    })
}

/// Token count from a `"<label> <number>"` usage summary; 0 when the shape doesn't match.
pub fn parse_token_usage(usage: &str) -> i32 {
    usage
        .split_whitespace()
        .nth(1)
        .and_then(|n| n.parse::<u32>().ok())
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(0)
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn field<'a>(
    obj: &'a Map<String, Value>,
    (key, aliases): (&'static str, &[&str]),
) -> Result<&'a Value, RecommendationParseError> {
    std::iter::once(key)
        .chain(aliases.iter().copied())
        .find_map(|k| obj.get(k))
        .ok_or(RecommendationParseError::MissingField(key))
}

fn integer(
    obj: &Map<String, Value>,
    key: (&'static str, &[&str]),
) -> Result<i32, RecommendationParseError> {
    let value = field(obj, key)?;
    coerce_integer(value).ok_or_else(|| RecommendationParseError::NotAnInteger {
        field: key.0,
        value: value.to_string(),
    })
}

/// Integers pass through, floats truncate toward zero, numeric strings parse.
fn coerce_integer(value: &Value) -> Option<i32> {
    let n = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => {
                let f = n.as_f64()?;
                if !f.is_finite() {
                    return None;
                }
                f.trunc() as i64
            }
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if n < 0 {
        return None;
    }
    i32::try_from(n).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "foods": ["white rice", "black beans", {"name": "chicken", "grams": 120}],
        "total_carbs": 62,
        "total_calories": 540,
        "insulin_units": 5,
        "insulin_name": "Humalog"
    }"#;

    #[test]
    fn parses_valid_reply() {
        let rec = parse_recommendation(VALID).expect("valid reply");
        assert_eq!(rec.foods.len(), 3);
        assert_eq!(rec.fields.total_carbs, 62);
        assert_eq!(rec.fields.total_calories, 540);
        assert_eq!(rec.fields.insulin_units, 5);
        assert_eq!(rec.fields.insulin_name, "Humalog");
    }

    #[test]
    fn accepts_fenced_block_and_portuguese_keys() {
        let raw = "```json\n{\"lista_alimentos\": [\"pão\"], \"carboidratos\": \"30\", \
                   \"calorias\": 250.7, \"qtd_insulina\": 2, \"nome_insulina\": \"Fiasp\"}\n```";
        let rec = parse_recommendation(raw).expect("fenced reply");
        assert_eq!(rec.fields.total_carbs, 30);
        assert_eq!(rec.fields.total_calories, 250);
        assert_eq!(rec.fields.insulin_units, 2);
        assert_eq!(rec.fields.insulin_name, "Fiasp");
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert_eq!(parse_recommendation(""), Err(RecommendationParseError::Empty));
        assert_eq!(parse_recommendation(" \t\n"), Err(RecommendationParseError::Empty));
        assert_eq!(parse_recommendation("```json\n```"), Err(RecommendationParseError::Empty));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            parse_recommendation("{\"foods\": [1, 2"),
            Err(RecommendationParseError::Json(_))
        ));
        assert_eq!(
            parse_recommendation("42"),
            Err(RecommendationParseError::NotAnObject)
        );
    }

    #[test]
    fn rejects_missing_fields() {
        let raw = r#"{"foods": [], "total_carbs": 1, "total_calories": 1, "insulin_units": 1}"#;
        assert_eq!(
            parse_recommendation(raw),
            Err(RecommendationParseError::MissingField("insulin_name"))
        );
        let raw = r#"{"total_carbs": 1, "total_calories": 1, "insulin_units": 1, "insulin_name": "x"}"#;
        assert_eq!(
            parse_recommendation(raw),
            Err(RecommendationParseError::MissingField("foods"))
        );
    }

    #[test]
    fn rejects_non_numeric_and_negative_values() {
        for bad in [r#""many""#, "null", "true", "-3", r#""-1""#, "1e20", "[1]"] {
            let raw = format!(
                r#"{{"foods": [], "total_carbs": {bad}, "total_calories": 1,
                    "insulin_units": 1, "insulin_name": "x"}}"#
            );
            assert!(
                matches!(
                    parse_recommendation(&raw),
                    Err(RecommendationParseError::NotAnInteger { field: "total_carbs", .. })
                ),
                "value {bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_wrong_shapes() {
        let raw = r#"{"foods": "rice", "total_carbs": 1, "total_calories": 1,
                      "insulin_units": 1, "insulin_name": "x"}"#;
        assert_eq!(
            parse_recommendation(raw),
            Err(RecommendationParseError::NotAList("foods"))
        );
        let raw = r#"{"foods": [], "total_carbs": 1, "total_calories": 1,
                      "insulin_units": 1, "insulin_name": null}"#;
        assert_eq!(
            parse_recommendation(raw),
            Err(RecommendationParseError::NotAString("insulin_name"))
        );
    }

    #[test]
    fn token_usage_takes_second_word() {
        assert_eq!(parse_token_usage("total_tokens: 321"), 321);
        assert_eq!(parse_token_usage("tokens 7"), 7);
        assert_eq!(parse_token_usage("tokens 7 extra"), 7);
    }

    #[test]
    fn token_usage_defaults_to_zero() {
        assert_eq!(parse_token_usage(""), 0);
        assert_eq!(parse_token_usage("321"), 0);
        assert_eq!(parse_token_usage("tokens many"), 0);
        assert_eq!(parse_token_usage("tokens -5"), 0);
        assert_eq!(parse_token_usage("tokens 99999999999"), 0);
    }
}
