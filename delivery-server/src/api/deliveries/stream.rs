//! Live position WebSocket endpoint
//!
//! GET /api/deliveries/{id}/stream?token=<JWT>
//! Auth: `Authorization` header 或 query parameter（浏览器 WebSocket 不支持自定义 headers）
//!
//! 协议:
//! - Server → Client: LiveMessage (Ready, Position, Pong, Error)
//! - Client → Server: LiveCommand (Position 仅限指派的配送员, Ping)

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use http::HeaderMap;
use serde::Deserialize;
use shared::error::AppError;
use shared::live::{LiveCommand, LiveMessage};
use shared::models::Coordinates;
use tokio::time::Duration;

use crate::auth::{CurrentUser, JwtService, Role};
use crate::core::ServerState;
use crate::delivery::DeliveryResult;
use crate::live::{RecvError, Subscription};

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
}

/// GET /api/deliveries/:id/stream?token=<JWT>
pub async fn handle_stream_ws(
    State(state): State<ServerState>,
    Path(delivery_id): Path<i64>,
    Query(query): Query<WsAuthQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let header_token = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(JwtService::extract_from_header);
    let token = header_token
        .or(query.token.as_deref())
        .ok_or_else(AppError::unauthorized)?;

    let user = state.jwt_service.authenticate(token).map_err(|e| {
        tracing::debug!(delivery_id, "Stream WS JWT validation failed: {e}");
        AppError::from(e)
    })?;

    // 升级前完成权限与状态校验，失败直接返回 HTTP 错误
    let (subscription, position) = state.coordinator.join_stream(&user, delivery_id).await?;

    Ok(ws.on_upgrade(move |socket| stream_session(socket, state, user, subscription, position)))
}

async fn stream_session(
    socket: WebSocket,
    state: ServerState,
    user: CurrentUser,
    mut subscription: Subscription,
    position: Option<Coordinates>,
) {
    let delivery_id = subscription.delivery_id();
    let (mut sink, mut stream) = socket.split();

    tracing::info!(
        delivery_id,
        user_id = user.id,
        connection_id = subscription.connection_id(),
        "Stream WS connected"
    );

    let ready = LiveMessage::Ready {
        delivery_id,
        position,
    };
    if send_message(&mut sink, &ready).await.is_err() {
        return;
    }

    let mut ping_interval =
        tokio::time::interval(Duration::from_secs(state.config.ws_ping_interval_secs));
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            update = subscription.recv() => {
                match update {
                    Ok(update) => {
                        if send_message(&mut sink, &LiveMessage::from(update)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(delivery_id, lagged = n, "Stream subscriber lagged, resending stored position");
                        let position = lag_snapshot(&state, delivery_id).await;
                        let msg = LiveMessage::Ready { delivery_id, position };
                        if send_message(&mut sink, &msg).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<LiveCommand>(&text) {
                            Ok(cmd) => handle_command(&state, &user, delivery_id, cmd).await,
                            Err(e) => Some(LiveMessage::Error {
                                message: format!("Invalid command: {e}"),
                            }),
                        };
                        if let Some(reply) = reply
                            && send_message(&mut sink, &reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    tracing::info!(delivery_id, user_id = user.id, "Stream WS disconnected");
}

/// 处理客户端命令，返回需要回给该连接的消息
async fn handle_command(
    state: &ServerState,
    user: &CurrentUser,
    delivery_id: i64,
    cmd: LiveCommand,
) -> Option<LiveMessage> {
    match cmd {
        LiveCommand::Ping => Some(LiveMessage::Pong),
        LiveCommand::Position {
            latitude,
            longitude,
        } => {
            if user.role != Role::Agent {
                return Some(LiveMessage::Error {
                    message: "Only the assigned agent can publish positions".into(),
                });
            }
            let position = Coordinates::new(latitude, longitude);
            match state
                .coordinator
                .publish_position(user.id, delivery_id, position)
                .await
            {
                // 广播已经回送给本连接
                Ok(_) => None,
                Err(e) => Some(LiveMessage::Error {
                    message: e.to_string(),
                }),
            }
        }
    }
}

/// 订阅者落后时重发的位置快照，读库失败记录后按无位置处理
async fn lag_snapshot(state: &ServerState, delivery_id: i64) -> Option<Coordinates> {
    position_or_none(delivery_id, state.coordinator.stored_position(delivery_id).await)
}

fn position_or_none(
    delivery_id: i64,
    stored: DeliveryResult<Option<Coordinates>>,
) -> Option<Coordinates> {
    stored.unwrap_or_else(|e| {
        tracing::warn!(delivery_id, error = %e, "Failed to load stored position for lag resync");
        None
    })
}

async fn send_message<S>(sink: &mut S, msg: &LiveMessage) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}
