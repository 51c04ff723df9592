//! Program Enrollment Repository
//!
//! The partial unique index on (patient_id) WHERE is_current = 1 rejects a
//! second current enrollment, so promotions demote first.

use super::RepoResult;
use shared::models::ProgramEnrollment;
use sqlx::{Executor, Sqlite};

const COLUMNS: &str = "id, patient_id, program_id, is_current, created_at, updated_at";

pub async fn find_current(
    ex: impl Executor<'_, Database = Sqlite>,
    patient_id: i64,
) -> RepoResult<Option<ProgramEnrollment>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM program_enrollment WHERE patient_id = ? AND is_current = 1 ORDER BY updated_at DESC, id DESC LIMIT 1"
    );
    let row = sqlx::query_as::<_, ProgramEnrollment>(&sql)
        .bind(patient_id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

/// Most recently created enrollment, current or not
pub async fn find_latest(
    ex: impl Executor<'_, Database = Sqlite>,
    patient_id: i64,
) -> RepoResult<Option<ProgramEnrollment>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM program_enrollment WHERE patient_id = ? ORDER BY created_at DESC, id DESC LIMIT 1"
    );
    let row = sqlx::query_as::<_, ProgramEnrollment>(&sql)
        .bind(patient_id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

pub async fn find_by_program(
    ex: impl Executor<'_, Database = Sqlite>,
    patient_id: i64,
    program_id: i64,
) -> RepoResult<Option<ProgramEnrollment>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM program_enrollment WHERE patient_id = ? AND program_id = ?"
    );
    let row = sqlx::query_as::<_, ProgramEnrollment>(&sql)
        .bind(patient_id)
        .bind(program_id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

pub async fn find_by_patient(
    ex: impl Executor<'_, Database = Sqlite>,
    patient_id: i64,
) -> RepoResult<Vec<ProgramEnrollment>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM program_enrollment WHERE patient_id = ? ORDER BY created_at ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, ProgramEnrollment>(&sql)
        .bind(patient_id)
        .fetch_all(ex)
        .await?;
    Ok(rows)
}

pub async fn insert(
    ex: impl Executor<'_, Database = Sqlite>,
    id: i64,
    patient_id: i64,
    program_id: i64,
    is_current: bool,
    now: i64,
) -> RepoResult<ProgramEnrollment> {
    let sql = format!(
        "INSERT INTO program_enrollment (id, patient_id, program_id, is_current, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?5) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProgramEnrollment>(&sql)
        .bind(id)
        .bind(patient_id)
        .bind(program_id)
        .bind(is_current)
        .bind(now)
        .fetch_one(ex)
        .await?;
    Ok(row)
}

/// Clear the current flag on every enrollment of the patient
pub async fn demote_all(
    ex: impl Executor<'_, Database = Sqlite>,
    patient_id: i64,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE program_enrollment SET is_current = 0, updated_at = ? WHERE patient_id = ? AND is_current = 1",
    )
    .bind(now)
    .bind(patient_id)
    .execute(ex)
    .await?;
    Ok(result.rows_affected())
}

pub async fn mark_current(
    ex: impl Executor<'_, Database = Sqlite>,
    enrollment_id: i64,
    now: i64,
) -> RepoResult<u64> {
    let result =
        sqlx::query("UPDATE program_enrollment SET is_current = 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(enrollment_id)
            .execute(ex)
            .await?;
    Ok(result.rows_affected())
}
