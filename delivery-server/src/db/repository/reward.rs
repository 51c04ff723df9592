//! Reward Repository

use super::RepoResult;
use shared::models::{Reward, RewardCreate};
use sqlx::{Executor, Sqlite};

const COLUMNS: &str = "id, program_id, description, point_value, max_redemptions, created_at";

pub async fn create(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
    data: &RewardCreate,
    now: i64,
) -> RepoResult<Reward> {
    let sql = format!(
        "INSERT INTO loyalty_reward (id, program_id, description, point_value, max_redemptions, created_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Reward>(&sql)
        .bind(id)
        .bind(data.program_id)
        .bind(&data.description)
        .bind(data.point_value)
        .bind(data.max_redemptions)
        .bind(now)
        .fetch_one(ex)
        .await?;
    Ok(row)
}

pub async fn find_by_id(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<Reward>> {
    let sql = format!("SELECT {COLUMNS} FROM loyalty_reward WHERE id = ?");
    let row = sqlx::query_as::<_, Reward>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

pub async fn find_all(
    ex: impl Executor<'_, Database = Sqlite>,
    program_id: Option<i64>,
) -> RepoResult<Vec<Reward>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM loyalty_reward WHERE (?1 IS NULL OR program_id = ?1) ORDER BY point_value ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, Reward>(&sql)
        .bind(program_id)
        .fetch_all(ex)
        .await?;
    Ok(rows)
}
