//! Order Model

use serde::{Deserialize, Serialize};

use super::delivery::{Coordinates, DeliveryStatus};

/// Refill delivery request (配送订单)
///
/// Immutable once a delivery exists for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// Requesting patient (user id)
    pub patient_id: i64,
    pub appointment_id: Option<i64>,
    pub delivery_mode: Option<String>,
    pub time_slot: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub reach_out_phone: Option<String>,
    /// Date (YYYY-MM-DD) the patient runs out of medication
    pub date_of_depletion: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn destination(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub appointment_id: Option<i64>,
    pub delivery_mode: Option<String>,
    pub time_slot: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub reach_out_phone: Option<String>,
    pub date_of_depletion: Option<String>,
}

/// Lifecycle state of an order, derived from its delivery row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Order exists, no delivery yet
    Requested,
    Accepted,
    InProgress,
    Delivered,
    Canceled,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Canceled)
    }
}

impl From<Option<DeliveryStatus>> for OrderState {
    fn from(status: Option<DeliveryStatus>) -> Self {
        match status {
            None => Self::Requested,
            Some(DeliveryStatus::Accepted) => Self::Accepted,
            Some(DeliveryStatus::InProgress) => Self::InProgress,
            Some(DeliveryStatus::Delivered) => Self::Delivered,
            Some(DeliveryStatus::Canceled) => Self::Canceled,
        }
    }
}

/// Patient-facing delivery info (no redemption code)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySummary {
    pub id: i64,
    pub agent_id: i64,
    pub status: DeliveryStatus,
    pub instruction: Option<String>,
    pub position: Option<Coordinates>,
    pub time_started: Option<i64>,
}

/// Order with its derived lifecycle state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub state: OrderState,
    pub delivery: Option<DeliverySummary>,
}
