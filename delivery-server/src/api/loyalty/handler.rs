//! Loyalty API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use shared::error::AppResult;
use shared::models::{
    LoyaltyProgram, LoyaltyProgramCreate, PointsSummary, PromotionOutcome, Redemption, Reward,
    RewardCreate,
};

#[derive(Debug, Deserialize)]
pub struct RewardQuery {
    pub program_id: Option<i64>,
}

/// GET /api/loyalty/summary - 我的积分概览
pub async fn summary(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<PointsSummary>> {
    let patient_id = user.require_patient()?;
    let summary = state.ledger.summary(patient_id).await?;
    Ok(Json(summary))
}

/// GET /api/loyalty/programs - 等级列表（按门槛升序）
pub async fn list_programs(
    State(state): State<ServerState>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<LoyaltyProgram>>> {
    let programs = state.ledger.list_programs().await?;
    Ok(Json(programs))
}

/// POST /api/loyalty/programs - 创建等级 (staff)
pub async fn create_program(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<LoyaltyProgramCreate>,
) -> AppResult<Json<LoyaltyProgram>> {
    user.require_staff()?;
    let program = state.ledger.create_program(payload).await?;
    Ok(Json(program))
}

/// GET /api/loyalty/rewards?program_id=xxx - 奖励列表
pub async fn list_rewards(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Query(query): Query<RewardQuery>,
) -> AppResult<Json<Vec<Reward>>> {
    let rewards = state.ledger.list_rewards(query.program_id).await?;
    Ok(Json(rewards))
}

/// POST /api/loyalty/rewards - 创建奖励 (staff)
pub async fn create_reward(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<RewardCreate>,
) -> AppResult<Json<Reward>> {
    user.require_staff()?;
    let reward = state.ledger.create_reward(payload).await?;
    Ok(Json(reward))
}

/// POST /api/loyalty/rewards/:id/redeem - 兑换奖励
pub async fn redeem_reward(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Redemption>> {
    let patient_id = user.require_patient()?;
    let redemption = state.ledger.redeem(patient_id, id).await?;
    Ok(Json(redemption))
}

/// POST /api/loyalty/patients/:id/recompute - 重新执行晋级 (staff)
///
/// 签收后的自动晋级失败时用于补偿。
pub async fn recompute(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(patient_id): Path<i64>,
) -> AppResult<Json<PromotionOutcome>> {
    user.require_staff()?;
    let outcome = state.resolver.advance_tier(patient_id).await?;
    tracing::info!(patient_id, staff_id = user.id, ?outcome, "Manual tier recompute");
    Ok(Json(outcome))
}
