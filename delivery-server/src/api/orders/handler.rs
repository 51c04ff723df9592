//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use shared::error::AppResult;
use shared::models::{Delivery, Order, OrderCreate, OrderDetail};

/// POST /api/orders - 患者发起配送请求
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<Order>> {
    let patient_id = user.require_patient()?;
    let order = state.coordinator.create_order(patient_id, payload).await?;
    Ok(Json(order))
}

/// GET /api/orders - 我的订单（患者：我下的；配送员：我接的）
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<OrderDetail>>> {
    let orders = state.coordinator.orders_for(&user).await?;
    Ok(Json(orders))
}

/// GET /api/orders/:id - 订单详情（含派生状态）
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let detail = state.coordinator.order_detail(&user, id).await?;
    Ok(Json(detail))
}

/// POST /api/orders/:id/accept - 配送员接单
pub async fn accept(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Delivery>> {
    let agent_id = user.require_approved_agent()?;
    let delivery = state.coordinator.accept(agent_id, id).await?;
    Ok(Json(delivery))
}
