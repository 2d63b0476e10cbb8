use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::{dto::ActivityInput, repo_types::ActivityRecord};

const ACTIVITY_SELECT: &str = r#"
    SELECT a.slug, u.name AS owner_name, a.date, a.time, a.activity_type,
           a.duration_minutes, a.effort, a.avg_heart_rate, a.created_at
"#;

/// Owned activities, most recent first. `pattern` matches the owner's name or
/// the activity type.
pub async fn list_for_user(
    db: &PgPool,
    user_id: Uuid,
    pattern: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<ActivityRecord>> {
    let sql = format!(
        r#"{ACTIVITY_SELECT}
          FROM activity_records a
          JOIN users u ON u.id = a.user_id
         WHERE a.user_id = $1
           AND ($2::text IS NULL OR u.name ILIKE $2 OR a.activity_type ILIKE $2)
         ORDER BY a.date DESC, a.time DESC
         LIMIT $3 OFFSET $4
        "#
    );
    let rows = sqlx::query_as::<_, ActivityRecord>(&sql)
        .bind(user_id)
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list activity records")?;
    Ok(rows)
}

pub async fn get_for_user(
    db: &PgPool,
    user_id: Uuid,
    slug: &str,
) -> anyhow::Result<Option<ActivityRecord>> {
    let sql = format!(
        r#"{ACTIVITY_SELECT}
          FROM activity_records a
          JOIN users u ON u.id = a.user_id
         WHERE a.user_id = $1 AND a.slug = $2
        "#
    );
    let row = sqlx::query_as::<_, ActivityRecord>(&sql)
        .bind(user_id)
        .bind(slug)
        .fetch_optional(db)
        .await
        .context("get activity record")?;
    Ok(row)
}

pub async fn insert(
    db: &PgPool,
    user_id: Uuid,
    slug: &str,
    input: &ActivityInput,
) -> anyhow::Result<ActivityRecord> {
    let sql = format!(
        r#"
        WITH a AS (
            INSERT INTO activity_records
                   (id, slug, user_id, date, time, activity_type, duration_minutes, effort, avg_heart_rate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
        )
        {ACTIVITY_SELECT}
          FROM a
          JOIN users u ON u.id = a.user_id
        "#
    );
    let row = sqlx::query_as::<_, ActivityRecord>(&sql)
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(user_id)
        .bind(input.date)
        .bind(input.time)
        .bind(&input.activity_type)
        .bind(input.duration_minutes)
        .bind(input.effort.as_str())
        .bind(input.avg_heart_rate)
        .fetch_one(db)
        .await
        .context("insert activity record")?;
    Ok(row)
}

pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    slug: &str,
    input: &ActivityInput,
) -> anyhow::Result<Option<ActivityRecord>> {
    let sql = format!(
        r#"
        WITH a AS (
            UPDATE activity_records
               SET date = $3, time = $4, activity_type = $5, duration_minutes = $6,
                   effort = $7, avg_heart_rate = $8
             WHERE user_id = $1 AND slug = $2
            RETURNING *
        )
        {ACTIVITY_SELECT}
          FROM a
          JOIN users u ON u.id = a.user_id
        "#
    );
    let row = sqlx::query_as::<_, ActivityRecord>(&sql)
        .bind(user_id)
        .bind(slug)
        .bind(input.date)
        .bind(input.time)
        .bind(&input.activity_type)
        .bind(input.duration_minutes)
        .bind(input.effort.as_str())
        .bind(input.avg_heart_rate)
        .fetch_optional(db)
        .await
        .context("update activity record")?;
    Ok(row)
}

pub async fn delete(db: &PgPool, user_id: Uuid, slug: &str) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM activity_records WHERE user_id = $1 AND slug = $2")
        .bind(user_id)
        .bind(slug)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
