//! LocationHub: 配送位置实时分发
//!
//! 每个进行中的配送一个 topic，首个订阅者加入时创建，最后一个离开时回收。
//! topic 不落库，只是路由状态；最新位置写在 `delivery` 表上。
//!
//! ```text
//! Agent (HTTP / WS)
//!       │ publish(delivery_id, PositionUpdate)
//!       ▼
//! LocationHub
//!   └── topics: delivery_id → Topic
//!         ├── tx: broadcast::Sender<PositionUpdate>
//!         └── subscribers: {connection_id}
//!               │
//!               ▼
//!   Viewer WS handler (Subscription::recv → LiveMessage)
//! ```
//!
//! 单 topic 单发布者时，订阅者收到的顺序与发布顺序一致；跨 topic 无序。

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use shared::live::PositionUpdate;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::RecvError;

/// Broadcast channel 容量
pub const DEFAULT_CAPACITY: usize = 256;

pub type ConnectionId = u64;

struct Topic {
    tx: broadcast::Sender<PositionUpdate>,
    subscribers: HashSet<ConnectionId>,
}

/// delivery_id → topic 注册表
#[derive(Clone)]
pub struct LocationHub {
    topics: Arc<DashMap<i64, Topic>>,
    next_connection: Arc<AtomicU64>,
    capacity: usize,
}

impl Default for LocationHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LocationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            next_connection: Arc::new(AtomicU64::new(1)),
            capacity: capacity.max(1),
        }
    }

    /// 订阅某个配送的位置
    ///
    /// 不校验配送状态；调用方（协调器）负责确认配送处于进行中。
    pub fn join(&self, delivery_id: i64) -> Subscription {
        let connection_id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let rx = {
            let mut topic = self.topics.entry(delivery_id).or_insert_with(|| {
                let (tx, _) = broadcast::channel(self.capacity);
                Topic {
                    tx,
                    subscribers: HashSet::new(),
                }
            });
            topic.subscribers.insert(connection_id);
            topic.tx.subscribe()
        };

        tracing::debug!(delivery_id, connection_id, "Viewer joined location topic");

        Subscription {
            hub: self.clone(),
            delivery_id,
            connection_id,
            rx,
        }
    }

    /// 取消订阅，topic 为空时回收
    pub fn leave(&self, delivery_id: i64, connection_id: ConnectionId) {
        if let Some(mut topic) = self.topics.get_mut(&delivery_id) {
            topic.subscribers.remove(&connection_id);
        }
        let removed = self
            .topics
            .remove_if(&delivery_id, |_, topic| topic.subscribers.is_empty())
            .is_some();

        tracing::debug!(delivery_id, connection_id, removed, "Viewer left location topic");
    }

    /// 原样转发给该 topic 的所有订阅者，返回接收者数量
    pub fn publish(&self, update: PositionUpdate) -> usize {
        match self.topics.get(&update.delivery_id) {
            // 无订阅者时 send 返回 Err，安全忽略
            Some(topic) => topic.tx.send(update).unwrap_or(0),
            None => 0,
        }
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn subscriber_count(&self, delivery_id: i64) -> usize {
        self.topics
            .get(&delivery_id)
            .map(|t| t.subscribers.len())
            .unwrap_or(0)
    }
}

/// 一个 viewer 连接在某个 topic 上的订阅；drop 时自动 leave
pub struct Subscription {
    hub: LocationHub,
    delivery_id: i64,
    connection_id: ConnectionId,
    rx: broadcast::Receiver<PositionUpdate>,
}

impl Subscription {
    pub fn delivery_id(&self) -> i64 {
        self.delivery_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// 等待下一条位置
    ///
    /// `Err(RecvError::Lagged(n))` 表示丢了 n 条，接收端已跳到最旧的保留消息。
    pub async fn recv(&mut self) -> Result<PositionUpdate, RecvError> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.leave(self.delivery_id, self.connection_id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("delivery_id", &self.delivery_id)
            .field("connection_id", &self.connection_id)
            .finish()
    }
}
