//! Loyalty Program Repository

use super::RepoResult;
use shared::models::{LoyaltyProgram, LoyaltyProgramCreate};
use sqlx::{Executor, Sqlite};

const COLUMNS: &str =
    "id, name, description, unit_point, point_rate, entry_points, is_default, created_at";

pub async fn create(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
    data: &LoyaltyProgramCreate,
    now: i64,
) -> RepoResult<LoyaltyProgram> {
    let sql = format!(
        "INSERT INTO loyalty_program (id, name, description, unit_point, point_rate, entry_points, is_default, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, LoyaltyProgram>(&sql)
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.unit_point)
        .bind(data.point_rate)
        .bind(data.entry_points)
        .bind(data.is_default)
        .bind(now)
        .fetch_one(ex)
        .await?;
    Ok(row)
}

/// Only one program carries the default flag
pub async fn clear_default(ex: impl Executor<'_, Database = Sqlite>) -> RepoResult<u64> {
    let result = sqlx::query("UPDATE loyalty_program SET is_default = 0 WHERE is_default = 1")
        .execute(ex)
        .await?;
    Ok(result.rows_affected())
}

pub async fn find_by_id(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<LoyaltyProgram>> {
    let sql = format!("SELECT {COLUMNS} FROM loyalty_program WHERE id = ?");
    let row = sqlx::query_as::<_, LoyaltyProgram>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

/// All programs in tier order (lowest entry_points first)
pub async fn find_all(ex: impl Executor<'_, Database = Sqlite>) -> RepoResult<Vec<LoyaltyProgram>> {
    let sql = format!("SELECT {COLUMNS} FROM loyalty_program ORDER BY entry_points ASC, created_at ASC");
    let rows = sqlx::query_as::<_, LoyaltyProgram>(&sql)
        .fetch_all(ex)
        .await?;
    Ok(rows)
}

pub async fn find_default(
    ex: impl Executor<'_, Database = Sqlite>,
) -> RepoResult<Option<LoyaltyProgram>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM loyalty_program WHERE is_default = 1 ORDER BY created_at ASC, id ASC LIMIT 1"
    );
    let row = sqlx::query_as::<_, LoyaltyProgram>(&sql)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}
