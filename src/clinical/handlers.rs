use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ClinicalRecordInput, ClinicalRecordView},
    repo,
    repo_types::{ClinicalRecord, Medication},
};
use crate::{
    auth::extractors::PatientUser,
    state::AppState,
    web::{delete_outcome, internal, DeleteMessages, FlashRedirect, Pagination, Saved, SearchQuery},
};

pub const LIST_PATH: &str = "/api/v1/clinical-records";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clinical-records", get(list_records).post(create_record))
        .route(
            "/clinical-records/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
}

async fn with_medications(
    state: &AppState,
    records: Vec<ClinicalRecord>,
) -> Result<Vec<ClinicalRecordView>, (StatusCode, String)> {
    let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
    let mut by_record: HashMap<Uuid, Vec<Medication>> = HashMap::new();
    for med in repo::medications_for(&state.db, &ids).await.map_err(internal)? {
        by_record.entry(med.clinical_record_id).or_default().push(med);
    }
    Ok(records
        .into_iter()
        .map(|record| ClinicalRecordView {
            medications: by_record.remove(&record.id).unwrap_or_default(),
            record,
        })
        .collect())
}

async fn view_of(
    state: &AppState,
    record: ClinicalRecord,
) -> Result<ClinicalRecordView, (StatusCode, String)> {
    let medications = repo::medications_for(&state.db, &[record.id])
        .await
        .map_err(internal)?;
    Ok(ClinicalRecordView { record, medications })
}

#[instrument(skip(state))]
pub async fn list_records(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Query(search): Query<SearchQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<ClinicalRecordView>>, (StatusCode, String)> {
    let (limit, offset) = page.clamped();
    let pattern = search.pattern();
    let records = repo::list_for_user(&state.db, user_id, pattern.as_deref(), limit, offset)
        .await
        .map_err(internal)?;
    Ok(Json(with_medications(&state, records).await?))
}

#[instrument(skip(state))]
pub async fn get_record(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ClinicalRecordView>, (StatusCode, String)> {
    let record = repo::get_for_user(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Clinical record not found".to_string()))?;
    Ok(Json(view_of(&state, record).await?))
}

#[instrument(skip(state, body))]
pub async fn create_record(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Json(body): Json<ClinicalRecordInput>,
) -> Result<(StatusCode, HeaderMap, Json<Saved<ClinicalRecordView>>), (StatusCode, String)> {
    let input = body.validate().map_err(|e| {
        warn!(error = %e, "invalid clinical record");
        (StatusCode::UNPROCESSABLE_ENTITY, e)
    })?;

    let record = repo::create(&state.db, user_id, &input).await.map_err(internal)?;
    info!(%user_id, record_id = %record.id, medications = input.medications.len(), "clinical record created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("{LIST_PATH}/{}", record.id).parse() {
        headers.insert(header::LOCATION, location);
    }

    let view = view_of(&state, record).await?;
    Ok((
        StatusCode::CREATED,
        headers,
        Json(Saved {
            message: "Clinical data registered successfully.",
            record: view,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_record(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ClinicalRecordInput>,
) -> Result<Json<Saved<ClinicalRecordView>>, (StatusCode, String)> {
    let input = body
        .validate()
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e))?;

    let record = repo::update(&state.db, user_id, id, &input)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Clinical record not found".to_string()))?;
    info!(%user_id, record_id = %record.id, "clinical record updated");

    let view = view_of(&state, record).await?;
    Ok(Json(Saved {
        message: "Clinical data updated successfully.",
        record: view,
    }))
}

#[instrument(skip(state))]
pub async fn delete_record(
    State(state): State<AppState>,
    PatientUser(user_id): PatientUser,
    Path(id): Path<Uuid>,
) -> Result<FlashRedirect, (StatusCode, String)> {
    delete_outcome(
        repo::delete(&state.db, user_id, id).await,
        LIST_PATH,
        DeleteMessages {
            deleted: "Clinical data removed successfully.",
            blocked: "There are meal records linked to this clinical data; it cannot be removed.",
        },
    )
}
