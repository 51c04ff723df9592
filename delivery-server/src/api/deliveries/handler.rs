//! Delivery API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use shared::error::AppResult;
use shared::live::PositionUpdate;
use shared::models::{CompletedDelivery, Coordinates, Delivery, Order, RedeemCode};

#[derive(Debug, Deserialize)]
pub struct RequestsQuery {
    pub delivery_mode: Option<String>,
}

/// GET /api/deliveries/requests?delivery_mode=xxx - 可认领订单
pub async fn list_requests(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<RequestsQuery>,
) -> AppResult<Json<Vec<Order>>> {
    user.require_approved_agent()?;
    let mode = query.delivery_mode.as_deref().filter(|m| !m.is_empty());
    let orders = state.coordinator.list_unclaimed(mode).await?;
    Ok(Json(orders))
}

/// GET /api/deliveries/:id - 配送单详情
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Delivery>> {
    let delivery = state.coordinator.delivery_detail(&user, id).await?;
    Ok(Json(delivery))
}

/// POST /api/deliveries/:id/start - 出发（带当前位置）
pub async fn start(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(position): Json<Coordinates>,
) -> AppResult<Json<Delivery>> {
    let agent_id = user.require_agent()?;
    let delivery = state.coordinator.start(agent_id, id, position).await?;
    Ok(Json(delivery))
}

/// POST /api/deliveries/:id/cancel - 取消配送
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Delivery>> {
    let agent_id = user.require_agent()?;
    let delivery = state.coordinator.cancel(agent_id, id).await?;
    Ok(Json(delivery))
}

/// POST /api/deliveries/:id/position - 上报位置
pub async fn publish_position(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(position): Json<Coordinates>,
) -> AppResult<Json<PositionUpdate>> {
    let agent_id = user.require_agent()?;
    let update = state
        .coordinator
        .publish_position(agent_id, id, position)
        .await?;
    Ok(Json(update))
}

/// POST /api/deliveries/redeem - 患者提交配送码
pub async fn redeem(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<RedeemCode>,
) -> AppResult<Json<CompletedDelivery>> {
    let patient_id = user.require_patient()?;
    let completed = state.coordinator.redeem_code(patient_id, payload).await?;
    Ok(Json(completed))
}
