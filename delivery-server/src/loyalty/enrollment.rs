//! Program enrollment resolution & tier advancement
//!
//! "当前等级" 的解析规则（按序）：
//!
//! 1. 已有 `is_current` 的注册 → 直接返回
//! 2. 有任意注册 → 把最近创建的标为当前
//! 3. 有默认计划 → 新建一条当前注册
//! 4. 否则无注册
//!
//! 所有写入都在 writer 连接的事务里完成；`idx_enrollment_current`
//! 部分唯一索引保证每个患者至多一条当前注册。

use shared::models::{CurrentEnrollment, LoyaltyProgram, ProgramEnrollment, PromotionOutcome};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqliteConnection;

use crate::db::DbService;
use crate::db::repository::{enrollment, feedback, program};

use super::error::{LoyaltyError, LoyaltyResult};

/// 在 `programs` 中挑出 `entry_points <= total_points` 的最高等级
///
/// 同门槛时取最早创建的。
pub fn select_tier(programs: &[LoyaltyProgram], total_points: i64) -> Option<&LoyaltyProgram> {
    programs
        .iter()
        .filter(|p| p.entry_points <= total_points)
        .max_by(|a, b| {
            a.entry_points
                .cmp(&b.entry_points)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        })
}

/// 只升不降：目标门槛严格高于当前等级时才晋级
pub fn should_promote(current: Option<&LoyaltyProgram>, best: &LoyaltyProgram) -> bool {
    match current {
        None => true,
        Some(current) => best.entry_points > current.entry_points,
    }
}

#[derive(Clone)]
pub struct EnrollmentResolver {
    db: DbService,
}

impl EnrollmentResolver {
    pub fn new(db: DbService) -> Self {
        Self { db }
    }

    /// 解析当前注册（可能写库），在调用方的事务内执行
    pub async fn resolve_current(
        conn: &mut SqliteConnection,
        patient_id: i64,
        now: i64,
    ) -> LoyaltyResult<Option<CurrentEnrollment>> {
        if let Some(current) = enrollment::find_current(&mut *conn, patient_id).await? {
            return Ok(Some(attach_program(&mut *conn, current).await?));
        }

        if let Some(mut latest) = enrollment::find_latest(&mut *conn, patient_id).await? {
            enrollment::mark_current(&mut *conn, latest.id, now).await?;
            latest.is_current = true;
            latest.updated_at = now;
            tracing::info!(
                patient_id,
                enrollment_id = latest.id,
                "Restored missing current enrollment"
            );
            return Ok(Some(attach_program(&mut *conn, latest).await?));
        }

        let Some(default) = program::find_default(&mut *conn).await? else {
            return Ok(None);
        };
        let created =
            enrollment::insert(&mut *conn, snowflake_id(), patient_id, default.id, true, now)
                .await?;
        tracing::info!(
            patient_id,
            program_id = default.id,
            "Enrolled patient into default program"
        );
        Ok(Some(CurrentEnrollment {
            enrollment: created,
            program: default,
        }))
    }

    /// 把患者的当前等级切到 `target`，其余注册全部降为非当前
    pub async fn promote(
        conn: &mut SqliteConnection,
        patient_id: i64,
        target: &LoyaltyProgram,
        now: i64,
    ) -> LoyaltyResult<ProgramEnrollment> {
        enrollment::demote_all(&mut *conn, patient_id, now).await?;

        match enrollment::find_by_program(&mut *conn, patient_id, target.id).await? {
            Some(mut existing) => {
                enrollment::mark_current(&mut *conn, existing.id, now).await?;
                existing.is_current = true;
                existing.updated_at = now;
                Ok(existing)
            }
            None => Ok(enrollment::insert(
                &mut *conn,
                snowflake_id(),
                patient_id,
                target.id,
                true,
                now,
            )
            .await?),
        }
    }

    /// 按累计积分推进等级（事务内）
    pub async fn advance_in(
        conn: &mut SqliteConnection,
        patient_id: i64,
        now: i64,
    ) -> LoyaltyResult<PromotionOutcome> {
        let total = feedback::total_points(&mut *conn, patient_id).await?;
        let programs = program::find_all(&mut *conn).await?;

        let Some(best) = select_tier(&programs, total) else {
            return Ok(PromotionOutcome::Unchanged);
        };

        let current = Self::resolve_current(&mut *conn, patient_id, now).await?;
        let current_program = current.as_ref().map(|c| &c.program);
        if !should_promote(current_program, best) {
            return Ok(PromotionOutcome::Unchanged);
        }

        let from_program_id = current_program.map(|p| p.id);
        Self::promote(&mut *conn, patient_id, best, now).await?;
        tracing::info!(
            patient_id,
            total_points = total,
            from_program_id,
            to_program_id = best.id,
            "Patient promoted to a higher loyalty tier"
        );
        Ok(PromotionOutcome::Promoted {
            from_program_id,
            to_program_id: best.id,
        })
    }

    /// 签收后的晋级步骤，独立事务，失败可单独重试
    pub async fn advance_tier(&self, patient_id: i64) -> LoyaltyResult<PromotionOutcome> {
        let mut tx = self.db.writer.begin().await?;
        let outcome = Self::advance_in(&mut *tx, patient_id, now_millis()).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// 当前注册（必要时自愈 / 建档）
    pub async fn current(&self, patient_id: i64) -> LoyaltyResult<Option<CurrentEnrollment>> {
        let mut tx = self.db.writer.begin().await?;
        let current = Self::resolve_current(&mut *tx, patient_id, now_millis()).await?;
        tx.commit().await?;
        Ok(current)
    }
}

async fn attach_program(
    conn: &mut SqliteConnection,
    enrollment: ProgramEnrollment,
) -> LoyaltyResult<CurrentEnrollment> {
    let program = program::find_by_id(&mut *conn, enrollment.program_id)
        .await?
        .ok_or(LoyaltyError::ProgramNotFound(enrollment.program_id))?;
    Ok(CurrentEnrollment {
        enrollment,
        program,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(id: i64, entry_points: i64, created_at: i64) -> LoyaltyProgram {
        LoyaltyProgram {
            id,
            name: format!("tier-{id}"),
            description: None,
            unit_point: 50,
            point_rate: 1.0,
            entry_points,
            is_default: entry_points == 0,
            created_at,
        }
    }

    #[test]
    fn select_highest_affordable_tier() {
        let programs = vec![tier(1, 0, 1), tier(2, 100, 2), tier(3, 500, 3)];
        assert_eq!(select_tier(&programs, 0).map(|p| p.id), Some(1));
        assert_eq!(select_tier(&programs, 150).map(|p| p.id), Some(2));
        assert_eq!(select_tier(&programs, 500).map(|p| p.id), Some(3));
    }

    #[test]
    fn select_none_when_nothing_affordable() {
        let programs = vec![tier(1, 10, 1)];
        assert!(select_tier(&programs, 5).is_none());
        assert!(select_tier(&[], 1000).is_none());
    }

    #[test]
    fn ties_pick_earliest_created() {
        let programs = vec![tier(9, 100, 20), tier(4, 100, 10)];
        assert_eq!(select_tier(&programs, 100).map(|p| p.id), Some(4));
    }

    #[test]
    fn promotion_is_monotonic() {
        let bronze = tier(1, 0, 1);
        let silver = tier(2, 100, 2);
        assert!(should_promote(None, &bronze));
        assert!(should_promote(Some(&bronze), &silver));
        assert!(!should_promote(Some(&silver), &bronze));
        assert!(!should_promote(Some(&silver), &silver));
    }
}
