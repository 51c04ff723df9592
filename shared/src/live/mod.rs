//! Live position stream protocol
//!
//! Server → Client: LiveMessage (推送)
//! Client → Server: LiveCommand (agent 上报位置 / 心跳)

use serde::{Deserialize, Serialize};

use crate::models::Coordinates;

/// Server → Client 推送消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LiveMessage {
    /// 握手完成，携带当前已存储的位置（迟到的订阅者以此为起点）
    Ready {
        delivery_id: i64,
        position: Option<Coordinates>,
    },

    /// Agent 位置更新
    Position {
        delivery_id: i64,
        latitude: f64,
        longitude: f64,
        at: i64,
    },

    Pong,

    Error { message: String },
}

/// Client → Server 命令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LiveCommand {
    /// 仅限被指派的 agent
    Position { latitude: f64, longitude: f64 },
    Ping,
}

/// One published position, as fanned out to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub delivery_id: i64,
    pub coordinates: Coordinates,
    pub at: i64,
}

impl From<PositionUpdate> for LiveMessage {
    fn from(update: PositionUpdate) -> Self {
        LiveMessage::Position {
            delivery_id: update.delivery_id,
            latitude: update.coordinates.latitude,
            longitude: update.coordinates.longitude,
            at: update.at,
        }
    }
}
