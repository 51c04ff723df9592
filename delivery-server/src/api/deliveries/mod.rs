//! Delivery API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/deliveries/requests | GET | 可认领订单 |
//! | /api/deliveries/redeem | POST | 患者提交配送码签收 |
//! | /api/deliveries/{id} | GET | 配送单详情 |
//! | /api/deliveries/{id}/start | POST | 出发 |
//! | /api/deliveries/{id}/cancel | POST | 取消 |
//! | /api/deliveries/{id}/position | POST | 上报位置 |
//! | /api/deliveries/{id}/stream | GET (WS) | 实时位置 |

mod handler;
mod stream;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/deliveries", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/requests", get(handler::list_requests))
        .route("/redeem", post(handler::redeem))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/start", post(handler::start))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/position", post(handler::publish_position))
        .route("/{id}/stream", get(stream::handle_stream_ws))
}
