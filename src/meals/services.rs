use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::MealInput,
    repo,
    repo_types::{MealRecord, MealWrite},
};
use crate::{
    clinical::{self, repo_types::ClinicalRecord},
    recommend::{assess, Assessment, RecommendationClient, RecommendationContext},
    state::AppState,
    web::generate_slug,
};

#[derive(Error, Debug)]
pub enum MealError {
    #[error("register your clinical data before logging meals")]
    NoClinicalRecord,

    #[error("meal record not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Ask the recommendation service about `input` in the context of `record`.
pub async fn evaluate(
    client: &dyn RecommendationClient,
    record: &ClinicalRecord,
    medications: Vec<String>,
    input: &MealInput,
) -> Assessment {
    let ctx = RecommendationContext::for_meal(
        record,
        medications,
        input.current_glucose,
        &input.description,
    );
    assess(client, &ctx).await
}

async fn evaluate_for(
    state: &AppState,
    record: &ClinicalRecord,
    input: &MealInput,
) -> Result<Assessment, MealError> {
    let medications = clinical::repo::medication_names(&state.db, record.id).await?;
    Ok(evaluate(state.recommender.as_ref(), record, medications, input).await)
}

/// Stamp the meal with the patient's clinical record, estimate it and store it.
pub async fn create_meal(
    state: &AppState,
    user_id: Uuid,
    input: &MealInput,
) -> Result<MealRecord, MealError> {
    let record = clinical::repo::first_for_user(&state.db, user_id)
        .await?
        .ok_or(MealError::NoClinicalRecord)?;

    let assessment = evaluate_for(state, &record, input).await?;
    let meal = repo::insert(
        &state.db,
        record.id,
        &generate_slug(),
        &MealWrite {
            description: &input.description,
            current_glucose: input.current_glucose,
            assessment: &assessment,
        },
    )
    .await?;

    info!(
        %user_id,
        slug = %meal.slug,
        insulin_units = meal.insulin_units,
        tokens_used = meal.tokens_used,
        "meal record created"
    );
    Ok(meal)
}

/// Every save re-runs the estimate against the current clinical record.
pub async fn update_meal(
    state: &AppState,
    user_id: Uuid,
    slug: &str,
    input: &MealInput,
) -> Result<MealRecord, MealError> {
    let existing = repo::get_for_user(&state.db, user_id, slug)
        .await?
        .ok_or(MealError::NotFound)?;
    let record = clinical::repo::get_by_id(&state.db, existing.clinical_record_id)
        .await?
        .ok_or(MealError::NotFound)?;

    let assessment = evaluate_for(state, &record, input).await?;
    let meal = repo::update(
        &state.db,
        existing.id,
        &MealWrite {
            description: &input.description,
            current_glucose: input.current_glucose,
            assessment: &assessment,
        },
    )
    .await?;

    info!(%user_id, slug = %meal.slug, insulin_units = meal.insulin_units, "meal record updated");
    Ok(meal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::{DerivedFields, MockRecommender};
    use time::OffsetDateTime;

    fn record() -> ClinicalRecord {
        ClinicalRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            diabetes_type: Some("type1".into()),
            meal_bolus: Some(10),
            correction_bolus: None,
            target_glucose: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn input() -> MealInput {
        MealInput {
            description: "feijoada with rice".into(),
            current_glucose: Some(190),
        }
    }

    #[tokio::test]
    async fn evaluate_sends_profile_with_defaults() {
        let client = MockRecommender::replying(
            r#"{"foods":["feijoada","rice"],"total_carbs":"80","total_calories":900.4,
                "insulin_units":9,"insulin_name":"Novorapid"}"#,
            "total_tokens: 410",
        );
        let out = evaluate(&client, &record(), vec!["Novorapid".into()], &input()).await;

        assert_eq!(out.fields.total_carbs, 80);
        assert_eq!(out.fields.total_calories, 900);
        assert_eq!(out.fields.insulin_units, 9);
        assert_eq!(out.fields.insulin_name, "Novorapid");
        assert_eq!(out.tokens_used, 410);

        let sent = client.seen();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].meal_bolus, 10);
        assert_eq!(sent[0].correction_bolus, 1);
        assert_eq!(sent[0].target_glucose, 100);
        assert_eq!(sent[0].current_glucose, Some(190));
        assert_eq!(sent[0].medications, vec!["Novorapid".to_string()]);
    }

    #[tokio::test]
    async fn evaluate_degrades_on_garbage() {
        let client = MockRecommender::replying("Sorry, I can't help with that.", "no usage");
        let out = evaluate(&client, &record(), vec![], &input()).await;
        assert_eq!(out.fields, DerivedFields::unavailable());
        assert_eq!(out.tokens_used, 0);
    }

    #[test]
    fn meal_error_messages() {
        assert_eq!(
            MealError::NoClinicalRecord.to_string(),
            "register your clinical data before logging meals"
        );
        let e: MealError = anyhow::anyhow!("db down").into();
        assert_eq!(e.to_string(), "db down");
    }
}
