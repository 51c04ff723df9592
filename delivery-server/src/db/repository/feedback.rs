//! Delivery Feedback Repository

use super::RepoResult;
use shared::models::Feedback;
use sqlx::{Executor, Sqlite};

const COLUMNS: &str = "id, delivery_id, patient_id, review, rating, points_awarded, created_at";

/// Insert feedback. UNIQUE(delivery_id) turns a second redemption into
/// `RepoError::Duplicate`.
pub async fn insert(ex: impl Executor<'_, Database = Sqlite>, fb: &Feedback) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO delivery_feedback (id, delivery_id, patient_id, review, rating, points_awarded, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(fb.id)
    .bind(fb.delivery_id)
    .bind(fb.patient_id)
    .bind(&fb.review)
    .bind(fb.rating)
    .bind(fb.points_awarded)
    .bind(fb.created_at)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn find_by_delivery(
    ex: impl Executor<'_, Database = Sqlite>,
    delivery_id: i64,
) -> RepoResult<Option<Feedback>> {
    let sql = format!("SELECT {COLUMNS} FROM delivery_feedback WHERE delivery_id = ?");
    let row = sqlx::query_as::<_, Feedback>(&sql)
        .bind(delivery_id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

/// Sum of points_awarded over all of a patient's feedback
pub async fn total_points(
    ex: impl Executor<'_, Database = Sqlite>,
    patient_id: i64,
) -> RepoResult<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(points_awarded), 0) FROM delivery_feedback WHERE patient_id = ?",
    )
    .bind(patient_id)
    .fetch_one(ex)
    .await?;
    Ok(total)
}
