//! Delivery & Feedback Models

use serde::{Deserialize, Serialize};

use super::loyalty::PromotionOutcome;

/// WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and within [-90, 90] x [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Stored delivery status, the single source of truth for the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum DeliveryStatus {
    Accepted,
    InProgress,
    Delivered,
    Canceled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }
}

/// Delivery entity (配送单), one per order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Delivery {
    pub id: i64,
    pub order_id: i64,
    pub patient_id: i64,
    pub agent_id: i64,
    /// Opaque proof-of-delivery code (32 hex chars)
    pub code: String,
    pub status: DeliveryStatus,
    /// JSON snapshot of the prescription taken at acceptance
    pub prescription: Option<String>,
    pub instruction: Option<String>,
    /// Agent's last known position
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time_started: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Delivery {
    pub fn position(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// Prescription / regimen snapshot fetched from the EMR at acceptance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionSnapshot {
    pub prescription_id: String,
    pub regimen: String,
    pub instruction: Option<String>,
    pub doctor: Option<String>,
    pub prescribed_at: Option<String>,
}

/// Feedback entity (签收反馈), one per delivery
///
/// Its existence marks the delivery as delivered. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Feedback {
    pub id: i64,
    pub delivery_id: i64,
    pub patient_id: i64,
    pub review: String,
    pub rating: i32,
    pub points_awarded: i64,
    pub created_at: i64,
}

/// Redeem delivery code payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemCode {
    pub code: String,
    #[serde(default)]
    pub review: String,
    pub rating: i32,
}

/// Result of a successful code redemption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedDelivery {
    pub feedback: Feedback,
    pub promotion: PromotionOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_range_check() {
        assert!(Coordinates::new(-1.2921, 36.8219).is_valid());
        assert!(Coordinates::new(90.0, -180.0).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, 180.5).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn delivery_status_wire_names() {
        assert_eq!(DeliveryStatus::InProgress.as_str(), "in_progress");
        let json = serde_json::to_string(&DeliveryStatus::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
    }

    #[test]
    fn redeem_code_review_defaults_to_empty() {
        let req: RedeemCode = serde_json::from_str(r#"{"code":"abc123","rating":5}"#).unwrap();
        assert_eq!(req.review, "");
        assert_eq!(req.rating, 5);
    }
}
