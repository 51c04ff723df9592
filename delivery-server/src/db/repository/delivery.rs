//! Delivery Repository
//!
//! Status changes are compare-and-set on the stored status and report the
//! number of rows they touched; zero means another writer got there first.

use super::RepoResult;
use shared::models::{Coordinates, Delivery, DeliveryStatus};
use sqlx::{Executor, Sqlite};

const COLUMNS: &str = "id, order_id, patient_id, agent_id, code, status, prescription, instruction, latitude, longitude, time_started, created_at, updated_at";

/// Row data for a freshly accepted delivery
#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub id: i64,
    pub order_id: i64,
    pub patient_id: i64,
    pub agent_id: i64,
    pub code: String,
    pub prescription: Option<String>,
    pub instruction: Option<String>,
    pub created_at: i64,
}

/// Insert a delivery in `accepted` state.
///
/// A second delivery for the same order fails with `RepoError::Duplicate`.
pub async fn insert(
    ex: impl Executor<'_, Database = Sqlite>,
    data: &NewDelivery,
) -> RepoResult<Delivery> {
    let sql = format!(
        "INSERT INTO delivery (id, order_id, patient_id, agent_id, code, status, prescription, instruction, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, 'accepted', ?6, ?7, ?8, ?8) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Delivery>(&sql)
        .bind(data.id)
        .bind(data.order_id)
        .bind(data.patient_id)
        .bind(data.agent_id)
        .bind(&data.code)
        .bind(&data.prescription)
        .bind(&data.instruction)
        .bind(data.created_at)
        .fetch_one(ex)
        .await?;
    Ok(row)
}

pub async fn find_by_id(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<Delivery>> {
    let sql = format!("SELECT {COLUMNS} FROM delivery WHERE id = ?");
    let row = sqlx::query_as::<_, Delivery>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

pub async fn find_by_order(
    ex: impl Executor<'_, Database = Sqlite>,
    order_id: i64,
) -> RepoResult<Option<Delivery>> {
    let sql = format!("SELECT {COLUMNS} FROM delivery WHERE order_id = ?");
    let row = sqlx::query_as::<_, Delivery>(&sql)
        .bind(order_id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

pub async fn find_by_code(
    ex: impl Executor<'_, Database = Sqlite>,
    code: &str,
) -> RepoResult<Option<Delivery>> {
    let sql = format!("SELECT {COLUMNS} FROM delivery WHERE code = ?");
    let row = sqlx::query_as::<_, Delivery>(&sql)
        .bind(code)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

pub async fn find_by_agent(
    ex: impl Executor<'_, Database = Sqlite>,
    agent_id: i64,
) -> RepoResult<Vec<Delivery>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM delivery WHERE agent_id = ? ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, Delivery>(&sql)
        .bind(agent_id)
        .fetch_all(ex)
        .await?;
    Ok(rows)
}

pub async fn code_exists(ex: impl Executor<'_, Database = Sqlite>, code: &str) -> RepoResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM delivery WHERE code = ? LIMIT 1")
        .bind(code)
        .fetch_optional(ex)
        .await?;
    Ok(found.is_some())
}

/// accepted → in_progress, recording the agent's position.
/// `time_started` is only set the first time.
pub async fn mark_started(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
    position: Coordinates,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE delivery SET status = 'in_progress', latitude = ?1, longitude = ?2, time_started = COALESCE(time_started, ?3), updated_at = ?3 WHERE id = ?4 AND status = 'accepted'",
    )
    .bind(position.latitude)
    .bind(position.longitude)
    .bind(now)
    .bind(id)
    .execute(ex)
    .await?;
    Ok(result.rows_affected())
}

/// Store the last known position of an in-progress delivery
pub async fn update_position(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
    position: Coordinates,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE delivery SET latitude = ?1, longitude = ?2, updated_at = ?3 WHERE id = ?4 AND status = 'in_progress'",
    )
    .bind(position.latitude)
    .bind(position.longitude)
    .bind(now)
    .bind(id)
    .execute(ex)
    .await?;
    Ok(result.rows_affected())
}

/// Compare-and-set status transition
pub async fn set_status(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
    from: DeliveryStatus,
    to: DeliveryStatus,
    now: i64,
) -> RepoResult<u64> {
    let result =
        sqlx::query("UPDATE delivery SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4")
            .bind(to)
            .bind(now)
            .bind(id)
            .bind(from)
            .execute(ex)
            .await?;
    Ok(result.rows_affected())
}
