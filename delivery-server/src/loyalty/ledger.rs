//! LoyaltyLedger: 积分账本
//!
//! 不存余额列，所有数值每次从事件表重算：
//!
//! - `total_points` = Σ feedback.points_awarded
//! - `total_redeemed_points` = Σ redemption.points_redeemed
//! - `balance` = total_points - total_redeemed_points
//!
//! 兑换在 writer 事务内校验余额并写入，写事务串行，因此并发兑换不会透支。

use shared::models::{
    LoyaltyProgram, LoyaltyProgramCreate, PointsSummary, Redemption, Reward, RewardCreate,
};
use shared::util::{now_millis, snowflake_id};

use crate::db::DbService;
use crate::db::repository::{feedback, program, redemption, reward};

use super::enrollment::EnrollmentResolver;
use super::error::{LoyaltyError, LoyaltyResult};

/// 兑换前置校验
///
/// - 余额不低于奖励价格
/// - 奖励属于患者当前等级
/// - 未超过奖励的兑换次数上限
pub fn check_redemption(
    balance: i64,
    reward: &Reward,
    current_program_id: i64,
    redeemed_count: i64,
) -> LoyaltyResult<()> {
    if reward.program_id != current_program_id {
        return Err(LoyaltyError::ProgramMismatch {
            reward_program: reward.program_id,
            current_program: current_program_id,
        });
    }
    if balance < reward.point_value {
        return Err(LoyaltyError::InsufficientPoints {
            balance,
            required: reward.point_value,
        });
    }
    if let Some(limit) = reward.max_redemptions
        && redeemed_count >= limit
    {
        return Err(LoyaltyError::RewardLimitReached(reward.id));
    }
    Ok(())
}

#[derive(Clone)]
pub struct LoyaltyLedger {
    db: DbService,
}

impl LoyaltyLedger {
    pub fn new(db: DbService) -> Self {
        Self { db }
    }

    pub async fn total_points(&self, patient_id: i64) -> LoyaltyResult<i64> {
        Ok(feedback::total_points(&self.db.pool, patient_id).await?)
    }

    pub async fn total_redeemed_points(&self, patient_id: i64) -> LoyaltyResult<i64> {
        Ok(redemption::total_redeemed(&self.db.pool, patient_id).await?)
    }

    pub async fn balance(&self, patient_id: i64) -> LoyaltyResult<i64> {
        let earned = self.total_points(patient_id).await?;
        let redeemed = self.total_redeemed_points(patient_id).await?;
        Ok(earned - redeemed)
    }

    /// 积分概览
    ///
    /// 当前等级与签收、兑换走同一套解析（可能补建默认注册），所以在 writer 事务内执行。
    /// 无积分、无等级时返回零值，不报错。
    pub async fn summary(&self, patient_id: i64) -> LoyaltyResult<PointsSummary> {
        let now = now_millis();
        let mut tx = self.db.writer.begin().await?;
        let current_enrollment =
            EnrollmentResolver::resolve_current(&mut *tx, patient_id, now).await?;
        let total_points = feedback::total_points(&mut *tx, patient_id).await?;
        let total_redeemed_points = redemption::total_redeemed(&mut *tx, patient_id).await?;
        let redemptions = redemption::history(&mut *tx, patient_id).await?;
        tx.commit().await?;

        let balance = total_points - total_redeemed_points;
        let point_rate = current_enrollment
            .as_ref()
            .map(|c| c.program.point_rate)
            .unwrap_or(0.0);

        Ok(PointsSummary {
            patient_id,
            total_points,
            total_redeemed_points,
            redeem_count: redemptions.len() as i64,
            balance,
            balance_value: balance as f64 * point_rate,
            current_enrollment,
            redemptions,
        })
    }

    /// 兑换奖励
    pub async fn redeem(&self, patient_id: i64, reward_id: i64) -> LoyaltyResult<Redemption> {
        let now = now_millis();
        let mut tx = self.db.writer.begin().await?;

        let reward = reward::find_by_id(&mut *tx, reward_id)
            .await?
            .ok_or(LoyaltyError::RewardNotFound(reward_id))?;
        let current = EnrollmentResolver::resolve_current(&mut *tx, patient_id, now)
            .await?
            .ok_or(LoyaltyError::NoActiveEnrollment(patient_id))?;

        let earned = feedback::total_points(&mut *tx, patient_id).await?;
        let redeemed = redemption::total_redeemed(&mut *tx, patient_id).await?;
        let redeemed_count = redemption::count_by_reward(&mut *tx, reward_id).await?;
        check_redemption(earned - redeemed, &reward, current.program.id, redeemed_count)?;

        let record = Redemption {
            id: snowflake_id(),
            patient_id,
            reward_id,
            points_redeemed: reward.point_value,
            created_at: now,
        };
        redemption::insert(&mut *tx, &record).await?;
        tx.commit().await?;

        tracing::info!(
            patient_id,
            reward_id,
            points = reward.point_value,
            balance = earned - redeemed - reward.point_value,
            "Reward redeemed"
        );
        Ok(record)
    }

    // ========== 计划 / 奖励管理 ==========

    pub async fn create_program(&self, data: LoyaltyProgramCreate) -> LoyaltyResult<LoyaltyProgram> {
        validate_program(&data)?;

        let mut tx = self.db.writer.begin().await?;
        if data.is_default {
            // 默认计划唯一
            program::clear_default(&mut *tx).await?;
        }
        let created = program::create(&mut *tx, snowflake_id(), &data, now_millis()).await?;
        tx.commit().await?;

        tracing::info!(
            program_id = created.id,
            name = %created.name,
            entry_points = created.entry_points,
            is_default = created.is_default,
            "Loyalty program created"
        );
        Ok(created)
    }

    pub async fn list_programs(&self) -> LoyaltyResult<Vec<LoyaltyProgram>> {
        Ok(program::find_all(&self.db.pool).await?)
    }

    pub async fn create_reward(&self, data: RewardCreate) -> LoyaltyResult<Reward> {
        if data.description.trim().is_empty() {
            return Err(LoyaltyError::Invalid("Reward description is required".into()));
        }
        if data.point_value <= 0 {
            return Err(LoyaltyError::Invalid(
                "Reward point_value must be positive".into(),
            ));
        }
        if matches!(data.max_redemptions, Some(n) if n <= 0) {
            return Err(LoyaltyError::Invalid(
                "max_redemptions must be positive when set".into(),
            ));
        }

        let mut tx = self.db.writer.begin().await?;
        if program::find_by_id(&mut *tx, data.program_id).await?.is_none() {
            return Err(LoyaltyError::ProgramNotFound(data.program_id));
        }
        let created = reward::create(&mut *tx, snowflake_id(), &data, now_millis()).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn list_rewards(&self, program_id: Option<i64>) -> LoyaltyResult<Vec<Reward>> {
        Ok(reward::find_all(&self.db.pool, program_id).await?)
    }
}

fn validate_program(data: &LoyaltyProgramCreate) -> LoyaltyResult<()> {
    if data.name.trim().is_empty() {
        return Err(LoyaltyError::Invalid("Program name is required".into()));
    }
    if data.unit_point < 0 || data.entry_points < 0 {
        return Err(LoyaltyError::Invalid(
            "unit_point and entry_points must not be negative".into(),
        ));
    }
    if !data.point_rate.is_finite() || data.point_rate < 0.0 {
        return Err(LoyaltyError::Invalid("point_rate must be a non-negative number".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reward(program_id: i64, point_value: i64, max_redemptions: Option<i64>) -> Reward {
        Reward {
            id: 10,
            program_id,
            description: "Free consultation".into(),
            point_value,
            max_redemptions,
            created_at: 0,
        }
    }

    #[test]
    fn insufficient_balance_rejected() {
        let err = check_redemption(40, &reward(1, 50, None), 1, 0).unwrap_err();
        assert!(matches!(
            err,
            LoyaltyError::InsufficientPoints {
                balance: 40,
                required: 50
            }
        ));
    }

    #[test]
    fn exact_balance_allowed() {
        assert!(check_redemption(50, &reward(1, 50, None), 1, 0).is_ok());
    }

    #[test]
    fn reward_must_match_current_program() {
        let err = check_redemption(500, &reward(2, 50, None), 1, 0).unwrap_err();
        assert!(matches!(err, LoyaltyError::ProgramMismatch { .. }));
    }

    #[test]
    fn redemption_limit_enforced() {
        assert!(check_redemption(500, &reward(1, 50, Some(2)), 1, 1).is_ok());
        let err = check_redemption(500, &reward(1, 50, Some(2)), 1, 2).unwrap_err();
        assert!(matches!(err, LoyaltyError::RewardLimitReached(10)));
    }

    #[test]
    fn program_validation() {
        let mut data = LoyaltyProgramCreate {
            name: "Bronze".into(),
            description: None,
            unit_point: 50,
            point_rate: 0.5,
            entry_points: 0,
            is_default: true,
        };
        assert!(validate_program(&data).is_ok());
        data.point_rate = f64::NAN;
        assert!(validate_program(&data).is_err());
        data.point_rate = 1.0;
        data.name = "  ".into();
        assert!(validate_program(&data).is_err());
    }
}
