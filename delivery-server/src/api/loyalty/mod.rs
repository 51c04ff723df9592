//! Loyalty API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/loyalty", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/summary", get(handler::summary))
        .route(
            "/programs",
            get(handler::list_programs).post(handler::create_program),
        )
        .route(
            "/rewards",
            get(handler::list_rewards).post(handler::create_reward),
        )
        .route("/rewards/{id}/redeem", post(handler::redeem_reward))
        .route("/patients/{id}/recompute", post(handler::recompute))
}
