//! Order Repository

use super::RepoResult;
use shared::models::{Order, OrderCreate};
use sqlx::{Executor, Sqlite};

const COLUMNS: &str = "id, patient_id, appointment_id, delivery_mode, time_slot, latitude, longitude, address, reach_out_phone, date_of_depletion, created_at, updated_at";

pub async fn create(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
    patient_id: i64,
    data: &OrderCreate,
    now: i64,
) -> RepoResult<Order> {
    let sql = format!(
        "INSERT INTO delivery_order (id, patient_id, appointment_id, delivery_mode, time_slot, latitude, longitude, address, reach_out_phone, date_of_depletion, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11) RETURNING {COLUMNS}"
    );
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .bind(patient_id)
        .bind(data.appointment_id)
        .bind(&data.delivery_mode)
        .bind(&data.time_slot)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(&data.address)
        .bind(&data.reach_out_phone)
        .bind(&data.date_of_depletion)
        .bind(now)
        .fetch_one(ex)
        .await?;
    Ok(order)
}

pub async fn find_by_id(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<Order>> {
    let sql = format!("SELECT {COLUMNS} FROM delivery_order WHERE id = ?");
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

pub async fn find_by_patient(
    ex: impl Executor<'_, Database = Sqlite>,
    patient_id: i64,
) -> RepoResult<Vec<Order>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM delivery_order WHERE patient_id = ? ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(patient_id)
        .fetch_all(ex)
        .await?;
    Ok(rows)
}

/// Orders nobody has accepted yet, newest first
pub async fn find_unclaimed(
    ex: impl Executor<'_, Database = Sqlite>,
    delivery_mode: Option<&str>,
    limit: i64,
) -> RepoResult<Vec<Order>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM delivery_order o WHERE NOT EXISTS (SELECT 1 FROM delivery d WHERE d.order_id = o.id) AND (?1 IS NULL OR o.delivery_mode = ?1) ORDER BY o.created_at DESC, o.id DESC LIMIT ?2"
    );
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(delivery_mode)
        .bind(limit)
        .fetch_all(ex)
        .await?;
    Ok(rows)
}
