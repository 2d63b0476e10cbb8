use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{MealRecord, MealWrite};

const MEAL_SELECT: &str = r#"
    SELECT m.id, m.slug, m.clinical_record_id, u.name AS owner_name, m.description,
           m.current_glucose, m.insulin_units, m.insulin_name, m.total_carbs,
           m.total_calories, m.tokens_used, m.recorded_at
"#;

/// Meals of every clinical record the user owns, newest first. `pattern`
/// matches the owner's name or the meal description.
pub async fn list_for_user(
    db: &PgPool,
    user_id: Uuid,
    pattern: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<MealRecord>> {
    let sql = format!(
        r#"{MEAL_SELECT}
          FROM meal_records m
          JOIN clinical_records c ON c.id = m.clinical_record_id
          JOIN users u ON u.id = c.user_id
         WHERE c.user_id = $1
           AND ($2::text IS NULL OR u.name ILIKE $2 OR m.description ILIKE $2)
         ORDER BY m.recorded_at DESC
         LIMIT $3 OFFSET $4
        "#
    );
    let rows = sqlx::query_as::<_, MealRecord>(&sql)
        .bind(user_id)
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list meal records")?;
    Ok(rows)
}

pub async fn get_for_user(
    db: &PgPool,
    user_id: Uuid,
    slug: &str,
) -> anyhow::Result<Option<MealRecord>> {
    let sql = format!(
        r#"{MEAL_SELECT}
          FROM meal_records m
          JOIN clinical_records c ON c.id = m.clinical_record_id
          JOIN users u ON u.id = c.user_id
         WHERE c.user_id = $1 AND m.slug = $2
        "#
    );
    let row = sqlx::query_as::<_, MealRecord>(&sql)
        .bind(user_id)
        .bind(slug)
        .fetch_optional(db)
        .await
        .context("get meal record")?;
    Ok(row)
}

pub async fn insert(
    db: &PgPool,
    clinical_record_id: Uuid,
    slug: &str,
    w: &MealWrite<'_>,
) -> anyhow::Result<MealRecord> {
    let sql = format!(
        r#"
        WITH m AS (
            INSERT INTO meal_records
                   (id, slug, clinical_record_id, description, current_glucose,
                    insulin_units, insulin_name, total_carbs, total_calories, tokens_used)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
        )
        {MEAL_SELECT}
          FROM m
          JOIN clinical_records c ON c.id = m.clinical_record_id
          JOIN users u ON u.id = c.user_id
        "#
    );
    let fields = &w.assessment.fields;
    let row = sqlx::query_as::<_, MealRecord>(&sql)
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(clinical_record_id)
        .bind(w.description)
        .bind(w.current_glucose)
        .bind(fields.insulin_units)
        .bind(&fields.insulin_name)
        .bind(fields.total_carbs)
        .bind(fields.total_calories)
        .bind(w.assessment.tokens_used)
        .fetch_one(db)
        .await
        .context("insert meal record")?;
    Ok(row)
}

/// Rewrites input and derived columns and refreshes `recorded_at`.
pub async fn update(db: &PgPool, id: Uuid, w: &MealWrite<'_>) -> anyhow::Result<MealRecord> {
    let sql = format!(
        r#"
        WITH m AS (
            UPDATE meal_records
               SET description = $2, current_glucose = $3, insulin_units = $4,
                   insulin_name = $5, total_carbs = $6, total_calories = $7,
                   tokens_used = $8, recorded_at = now()
             WHERE id = $1
            RETURNING *
        )
        {MEAL_SELECT}
          FROM m
          JOIN clinical_records c ON c.id = m.clinical_record_id
          JOIN users u ON u.id = c.user_id
        "#
    );
    let fields = &w.assessment.fields;
    let row = sqlx::query_as::<_, MealRecord>(&sql)
        .bind(id)
        .bind(w.description)
        .bind(w.current_glucose)
        .bind(fields.insulin_units)
        .bind(&fields.insulin_name)
        .bind(fields.total_carbs)
        .bind(fields.total_calories)
        .bind(w.assessment.tokens_used)
        .fetch_one(db)
        .await
        .context("update meal record")?;
    Ok(row)
}

pub async fn delete(db: &PgPool, user_id: Uuid, slug: &str) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        r#"
        DELETE FROM meal_records m
         USING clinical_records c
         WHERE m.clinical_record_id = c.id AND c.user_id = $1 AND m.slug = $2
        "#,
    )
    .bind(user_id)
    .bind(slug)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}
