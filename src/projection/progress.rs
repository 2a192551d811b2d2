//! Course progress queries
//!
//! Only live (non-deleted) modules are counted, on both sides of the
//! ratio, so `completed <= total` holds even after a module is removed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::CourseProgress;

/// Number of live modules in a course
pub async fn count_live_modules<'e, E>(executor: E, course_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM modules WHERE course_id = $1 AND deleted_at IS NULL",
    )
    .bind(course_id)
    .fetch_one(executor)
    .await
}

/// Progress of one user in one course
pub async fn course_progress<'e, E>(
    executor: E,
    user_id: Uuid,
    course_id: Uuid,
) -> Result<CourseProgress, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let (total, completed, latest): (i64, i64, Option<DateTime<Utc>>) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM modules
             WHERE course_id = $2 AND deleted_at IS NULL) AS total,
            COUNT(mp.id) AS completed,
            MAX(mp.completed_at) AS latest
        FROM module_progress mp
        JOIN modules m ON m.id = mp.module_id
        WHERE mp.user_id = $1
          AND m.course_id = $2
          AND m.deleted_at IS NULL
          AND mp.deleted_at IS NULL
          AND mp.is_completed
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(executor)
    .await?;

    Ok(CourseProgress::from_counts(total, completed, latest))
}

/// Progress of one user across several courses, in one round trip
pub async fn progress_by_course<'e, E>(
    executor: E,
    user_id: Uuid,
    course_ids: &[Uuid],
) -> Result<HashMap<Uuid, CourseProgress>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    if course_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, i64, i64, Option<DateTime<Utc>>)> = sqlx::query_as(
        r#"
        SELECT
            c.id,
            (SELECT COUNT(*) FROM modules m
             WHERE m.course_id = c.id AND m.deleted_at IS NULL) AS total,
            COALESCE(done.completed, 0) AS completed,
            done.latest
        FROM courses c
        LEFT JOIN (
            SELECT m.course_id, COUNT(mp.id) AS completed, MAX(mp.completed_at) AS latest
            FROM module_progress mp
            JOIN modules m ON m.id = mp.module_id
            WHERE mp.user_id = $1
              AND m.deleted_at IS NULL
              AND mp.deleted_at IS NULL
              AND mp.is_completed
            GROUP BY m.course_id
        ) done ON done.course_id = c.id
        WHERE c.id = ANY($2)
        "#,
    )
    .bind(user_id)
    .bind(course_ids)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(course_id, total, completed, latest)| {
            (course_id, CourseProgress::from_counts(total, completed, latest))
        })
        .collect())
}

/// Completion flag per module for one user. Modules without a progress
/// row are absent from the map and read as `false`.
pub async fn completion_flags<'e, E>(
    executor: E,
    user_id: Uuid,
    module_ids: &[Uuid],
) -> Result<HashMap<Uuid, bool>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    if module_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, bool)> = sqlx::query_as(
        r#"
        SELECT module_id, is_completed
        FROM module_progress
        WHERE user_id = $1 AND module_id = ANY($2) AND deleted_at IS NULL
        "#,
    )
    .bind(user_id)
    .bind(module_ids)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().collect())
}
