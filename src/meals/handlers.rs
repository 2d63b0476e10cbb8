use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{error, instrument, warn};

use super::{
    dto::MealInput,
    repo,
    repo_types::MealRecord,
    services::{create_meal, update_meal, MealError},
};
use crate::{
    auth::extractors::PatientUser,
    state::AppState,
    web::{delete_outcome, internal, DeleteMessages, FlashRedirect, Pagination, Saved, SearchQuery},
};

pub const LIST_PATH: &str = "/api/v1/meals";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal_handler))
        .route(
            "/meals/:slug",
            get(get_meal).put(update_meal_handler).delete(delete_meal),
        )
}

fn meal_error(e: MealError) -> (StatusCode, String) {
    match e {
        MealError::NoClinicalRecord => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        MealError::NotFound => (StatusCode::NOT_FOUND, "Meal not found".into()),
        MealError::Storage(e) => {
            error!(error = %e, "meal save failed");
            internal(e)
        }
    }
}

fn validated(body: MealInput) -> Result<MealInput, (StatusCode, String)> {
    body.validate().map_err(|e| {
        warn!(error = %e, "invalid meal");
        (StatusCode::UNPROCESSABLE_ENTITY, e)
    })
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Query(search): Query<SearchQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<MealRecord>>, (StatusCode, String)> {
    let (limit, offset) = page.clamped();
    let pattern = search.pattern();
    let meals = repo::list_for_user(&state.db, user_id, pattern.as_deref(), limit, offset)
        .await
        .map_err(internal)?;
    Ok(Json(meals))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Path(slug): Path<String>,
) -> Result<Json<MealRecord>, (StatusCode, String)> {
    match repo::get_for_user(&state.db, user_id, &slug).await {
        Ok(Some(meal)) => Ok(Json(meal)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Meal not found".into())),
        Err(e) => {
            error!(error = %e, %user_id, %slug, "get_meal failed");
            Err(internal(e))
        }
    }
}

#[instrument(skip(state, body))]
pub async fn create_meal_handler(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Json(body): Json<MealInput>,
) -> Result<(StatusCode, HeaderMap, Json<Saved<MealRecord>>), (StatusCode, String)> {
    let input = validated(body)?;
    let meal = create_meal(&state, user_id, &input).await.map_err(meal_error)?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("{LIST_PATH}/{}", meal.slug).parse() {
        headers.insert(header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(Saved {
            message: "Meal record registered successfully.",
            record: meal,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_meal_handler(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Path(slug): Path<String>,
    Json(body): Json<MealInput>,
) -> Result<Json<Saved<MealRecord>>, (StatusCode, String)> {
    let input = validated(body)?;
    let meal = update_meal(&state, user_id, &slug, &input)
        .await
        .map_err(meal_error)?;
    Ok(Json(Saved {
        message: "Meal record updated successfully.",
        record: meal,
    }))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Path(slug): Path<String>,
) -> Result<FlashRedirect, (StatusCode, String)> {
    delete_outcome(
        repo::delete(&state.db, user_id, &slug).await,
        LIST_PATH,
        DeleteMessages {
            deleted: "Meal record removed successfully.",
            blocked: "There are records linked to this meal; it cannot be removed.",
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_errors_map_to_statuses() {
        assert_eq!(meal_error(MealError::NoClinicalRecord).0, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(meal_error(MealError::NotFound).0, StatusCode::NOT_FOUND);
        assert_eq!(
            meal_error(MealError::Storage(anyhow::anyhow!("boom"))).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
