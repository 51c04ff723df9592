//! Redemption Repository

use super::RepoResult;
use shared::models::{Redemption, RedemptionRecord};
use sqlx::{Executor, Sqlite};

pub async fn insert(ex: impl Executor<'_, Database = Sqlite>, r: &Redemption) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO redemption (id, patient_id, reward_id, points_redeemed, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(r.id)
    .bind(r.patient_id)
    .bind(r.reward_id)
    .bind(r.points_redeemed)
    .bind(r.created_at)
    .execute(ex)
    .await?;
    Ok(())
}

/// Sum of points_redeemed over all of a patient's redemptions
pub async fn total_redeemed(
    ex: impl Executor<'_, Database = Sqlite>,
    patient_id: i64,
) -> RepoResult<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(points_redeemed), 0) FROM redemption WHERE patient_id = ?",
    )
    .bind(patient_id)
    .fetch_one(ex)
    .await?;
    Ok(total)
}

pub async fn count_by_reward(
    ex: impl Executor<'_, Database = Sqlite>,
    reward_id: i64,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM redemption WHERE reward_id = ?")
        .bind(reward_id)
        .fetch_one(ex)
        .await?;
    Ok(count)
}

/// Redemption history with reward description, newest first
pub async fn history(
    ex: impl Executor<'_, Database = Sqlite>,
    patient_id: i64,
) -> RepoResult<Vec<RedemptionRecord>> {
    let rows = sqlx::query_as::<_, RedemptionRecord>(
        "SELECT r.id, r.reward_id, w.description AS reward_description, r.points_redeemed, r.created_at FROM redemption r JOIN loyalty_reward w ON w.id = r.reward_id WHERE r.patient_id = ? ORDER BY r.created_at DESC, r.id DESC",
    )
    .bind(patient_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}
