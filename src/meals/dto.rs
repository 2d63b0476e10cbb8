use serde::Deserialize;

pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Body of create and update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct MealInput {
    pub description: String,
    pub current_glucose: Option<i32>,
}

impl MealInput {
    pub fn validate(mut self) -> Result<Self, String> {
        self.description = self.description.trim().to_string();
        if self.description.is_empty() {
            return Err("description is required".into());
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(format!(
                "description must be at most {MAX_DESCRIPTION_CHARS} characters"
            ));
        }
        if self.current_glucose.is_some_and(|g| g < 0) {
            return Err("current_glucose must not be negative".into());
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(description: &str, current_glucose: Option<i32>) -> MealInput {
        MealInput {
            description: description.to_string(),
            current_glucose,
        }
    }

    #[test]
    fn trims_description() {
        let i = input("  two slices of bread  ", Some(120)).validate().unwrap();
        assert_eq!(i.description, "two slices of bread");
        assert_eq!(i.current_glucose, Some(120));
    }

    #[test]
    fn rejects_blank_long_or_negative() {
        assert!(input("   ", None).validate().is_err());
        assert!(input(&"a".repeat(MAX_DESCRIPTION_CHARS + 1), None).validate().is_err());
        assert!(input(&"ã".repeat(MAX_DESCRIPTION_CHARS), None).validate().is_ok());
        assert!(input("rice", Some(-1)).validate().is_err());
    }
}
