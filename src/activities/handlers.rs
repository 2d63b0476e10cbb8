use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{dto::ActivityInput, repo, repo_types::ActivityRecord};
use crate::{
    auth::extractors::PatientUser,
    state::AppState,
    web::{
        delete_outcome, generate_slug, internal, DeleteMessages, FlashRedirect, Pagination, Saved,
        SearchQuery,
    },
};

pub const LIST_PATH: &str = "/api/v1/activities";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/activities", get(list_activities).post(create_activity))
        .route(
            "/activities/:slug",
            get(get_activity).put(update_activity).delete(delete_activity),
        )
}

fn validated(body: ActivityInput) -> Result<ActivityInput, (StatusCode, String)> {
    body.validate().map_err(|e| {
        warn!(error = %e, "invalid activity");
        (StatusCode::UNPROCESSABLE_ENTITY, e)
    })
}

#[instrument(skip(state))]
pub async fn list_activities(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Query(search): Query<SearchQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<ActivityRecord>>, (StatusCode, String)> {
    let (limit, offset) = page.clamped();
    let pattern = search.pattern();
    let rows = repo::list_for_user(&state.db, user_id, pattern.as_deref(), limit, offset)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_activity(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Path(slug): Path<String>,
) -> Result<Json<ActivityRecord>, (StatusCode, String)> {
    repo::get_for_user(&state.db, user_id, &slug)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Activity not found".into()))
}

#[instrument(skip(state, body))]
pub async fn create_activity(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Json(body): Json<ActivityInput>,
) -> Result<(StatusCode, HeaderMap, Json<Saved<ActivityRecord>>), (StatusCode, String)> {
    let input = validated(body)?;
    let row = repo::insert(&state.db, user_id, &generate_slug(), &input)
        .await
        .map_err(internal)?;
    info!(%user_id, slug = %row.slug, activity = %row.activity_type, "activity record created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("{LIST_PATH}/{}", row.slug).parse() {
        headers.insert(header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(Saved {
            message: "Activity record registered successfully.",
            record: row,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_activity(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Path(slug): Path<String>,
    Json(body): Json<ActivityInput>,
) -> Result<Json<Saved<ActivityRecord>>, (StatusCode, String)> {
    let input = validated(body)?;
    let row = repo::update(&state.db, user_id, &slug, &input)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Activity not found".to_string()))?;
    info!(%user_id, slug = %row.slug, "activity record updated");
    Ok(Json(Saved {
        message: "Activity record updated successfully.",
        record: row,
    }))
}

#[instrument(skip(state))]
pub async fn delete_activity(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Path(slug): Path<String>,
) -> Result<FlashRedirect, (StatusCode, String)> {
    delete_outcome(
        repo::delete(&state.db, user_id, &slug).await,
        LIST_PATH,
        DeleteMessages {
            deleted: "Activity record removed successfully.",
            blocked: "There are records linked to this activity; it cannot be removed.",
        },
    )
}
