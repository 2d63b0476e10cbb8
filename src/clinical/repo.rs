use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    dto::{ClinicalRecordInput, MedicationInput},
    repo_types::{ClinicalRecord, Medication},
};

const RECORD_COLUMNS: &str =
    "c.id, c.user_id, c.diabetes_type, c.meal_bolus, c.correction_bolus, c.target_glucose, c.created_at";

/// Owned records, newest first. `pattern` matches any medication's trade name,
/// active ingredient or therapeutic class.
pub async fn list_for_user(
    db: &PgPool,
    user_id: Uuid,
    pattern: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<ClinicalRecord>> {
    let sql = format!(
        r#"
        SELECT {RECORD_COLUMNS}
          FROM clinical_records c
         WHERE c.user_id = $1
           AND ($2::text IS NULL OR EXISTS (
                SELECT 1
                  FROM clinical_record_medications m
                 WHERE m.clinical_record_id = c.id
                   AND (m.trade_name ILIKE $2
                        OR m.active_ingredient ILIKE $2
                        OR m.therapeutic_class ILIKE $2)))
         ORDER BY c.created_at DESC
         LIMIT $3 OFFSET $4
        "#
    );
    let rows = sqlx::query_as::<_, ClinicalRecord>(&sql)
        .bind(user_id)
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list clinical records")?;
    Ok(rows)
}

pub async fn get_for_user(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Option<ClinicalRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM clinical_records c WHERE c.id = $1 AND c.user_id = $2");
    let row = sqlx::query_as::<_, ClinicalRecord>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("get clinical record")?;
    Ok(row)
}

/// The record meals are stamped with: the patient's oldest one.
pub async fn first_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<ClinicalRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM clinical_records c WHERE c.user_id = $1 ORDER BY c.created_at ASC, c.id ASC LIMIT 1"
    );
    let row = sqlx::query_as::<_, ClinicalRecord>(&sql)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("first clinical record")?;
    Ok(row)
}

pub async fn get_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ClinicalRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM clinical_records c WHERE c.id = $1");
    let row = sqlx::query_as::<_, ClinicalRecord>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
        .context("get clinical record by id")?;
    Ok(row)
}

pub async fn medications_for(db: &PgPool, record_ids: &[Uuid]) -> anyhow::Result<Vec<Medication>> {
    let rows = sqlx::query_as::<_, Medication>(
        r#"
        SELECT clinical_record_id, trade_name, active_ingredient, therapeutic_class
          FROM clinical_record_medications
         WHERE clinical_record_id = ANY($1)
         ORDER BY clinical_record_id, position ASC
        "#,
    )
    .bind(record_ids)
    .fetch_all(db)
    .await
    .context("list medications")?;
    Ok(rows)
}

/// Trade names used as recommendation context.
pub async fn medication_names(db: &PgPool, record_id: Uuid) -> anyhow::Result<Vec<String>> {
    Ok(medications_for(db, &[record_id])
        .await?
        .into_iter()
        .map(|m| m.trade_name)
        .collect())
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    input: &ClinicalRecordInput,
) -> anyhow::Result<ClinicalRecord> {
    let mut tx = db.begin().await.context("begin tx")?;
    let record = sqlx::query_as::<_, ClinicalRecord>(
        r#"
        INSERT INTO clinical_records AS c
               (id, user_id, diabetes_type, meal_bolus, correction_bolus, target_glucose)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING c.id, c.user_id, c.diabetes_type, c.meal_bolus, c.correction_bolus,
                  c.target_glucose, c.created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(input.diabetes_type.map(|t| t.as_str()))
    .bind(input.meal_bolus)
    .bind(input.correction_bolus)
    .bind(input.target_glucose)
    .fetch_one(&mut *tx)
    .await
    .context("insert clinical record")?;

    insert_medications_tx(&mut tx, record.id, &input.medications).await?;
    tx.commit().await.context("commit tx")?;
    Ok(record)
}

/// Replaces the parameters and the whole medication list.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    input: &ClinicalRecordInput,
) -> anyhow::Result<Option<ClinicalRecord>> {
    let mut tx = db.begin().await.context("begin tx")?;
    let record = sqlx::query_as::<_, ClinicalRecord>(
        r#"
        UPDATE clinical_records AS c
           SET diabetes_type = $3, meal_bolus = $4, correction_bolus = $5, target_glucose = $6
         WHERE c.id = $1 AND c.user_id = $2
        RETURNING c.id, c.user_id, c.diabetes_type, c.meal_bolus, c.correction_bolus,
                  c.target_glucose, c.created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(input.diabetes_type.map(|t| t.as_str()))
    .bind(input.meal_bolus)
    .bind(input.correction_bolus)
    .bind(input.target_glucose)
    .fetch_optional(&mut *tx)
    .await
    .context("update clinical record")?;

    let Some(record) = record else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM clinical_record_medications WHERE clinical_record_id = $1")
        .bind(record.id)
        .execute(&mut *tx)
        .await
        .context("clear medications")?;
    insert_medications_tx(&mut tx, record.id, &input.medications).await?;
    tx.commit().await.context("commit tx")?;
    Ok(Some(record))
}

/// `Ok(false)` when nothing owned matched. Errors are returned raw so callers
/// can tell a restrict violation apart.
pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM clinical_records WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

async fn insert_medications_tx(
    tx: &mut Transaction<'_, Postgres>,
    record_id: Uuid,
    medications: &[MedicationInput],
) -> anyhow::Result<()> {
    for (position, med) in medications.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO clinical_record_medications
                   (id, clinical_record_id, trade_name, active_ingredient, therapeutic_class, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record_id)
        .bind(&med.trade_name)
        .bind(&med.active_ingredient)
        .bind(&med.therapeutic_class)
        .bind(position as i32)
        .execute(&mut **tx)
        .await
        .context("insert medication")?;
    }
    Ok(())
}
