//! Loyalty Program, Enrollment & Redemption Models

use serde::{Deserialize, Serialize};

/// Loyalty program entity (积分等级)
///
/// Programs form a tier ladder ordered by `entry_points`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct LoyaltyProgram {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Points awarded per completed delivery
    pub unit_point: i64,
    /// Currency value of one point
    pub point_rate: f64,
    /// Cumulative points needed to reach this tier
    pub entry_points: i64,
    pub is_default: bool,
    pub created_at: i64,
}

/// Create program payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyProgramCreate {
    pub name: String,
    pub description: Option<String>,
    pub unit_point: i64,
    #[serde(default)]
    pub point_rate: f64,
    #[serde(default)]
    pub entry_points: i64,
    #[serde(default)]
    pub is_default: bool,
}

/// Reward entity (积分兑换奖励)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Reward {
    pub id: i64,
    pub program_id: i64,
    pub description: String,
    pub point_value: i64,
    /// None = unlimited
    pub max_redemptions: Option<i64>,
    pub created_at: i64,
}

/// Create reward payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardCreate {
    pub program_id: i64,
    pub description: String,
    pub point_value: i64,
    pub max_redemptions: Option<i64>,
}

/// Patient membership in a program
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProgramEnrollment {
    pub id: i64,
    pub patient_id: i64,
    pub program_id: i64,
    pub is_current: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Current enrollment joined with its program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentEnrollment {
    pub enrollment: ProgramEnrollment,
    pub program: LoyaltyProgram,
}

/// Redemption entity (兑换记录)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Redemption {
    pub id: i64,
    pub patient_id: i64,
    pub reward_id: i64,
    /// Copied from the reward's point cost at redemption time
    pub points_redeemed: i64,
    pub created_at: i64,
}

/// Redemption history row with reward description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RedemptionRecord {
    pub id: i64,
    pub reward_id: i64,
    pub reward_description: String,
    pub points_redeemed: i64,
    pub created_at: i64,
}

/// Points summary for a patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsSummary {
    pub patient_id: i64,
    pub total_points: i64,
    pub total_redeemed_points: i64,
    pub redeem_count: i64,
    pub balance: i64,
    /// balance × current program point_rate
    pub balance_value: f64,
    pub current_enrollment: Option<CurrentEnrollment>,
    pub redemptions: Vec<RedemptionRecord>,
}

/// Outcome of the post-commit tier advancement step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PromotionOutcome {
    Unchanged,
    Promoted {
        from_program_id: Option<i64>,
        to_program_id: i64,
    },
    /// Recompute failed; the completed delivery is unaffected
    Failed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_outcome_wire_format() {
        let json = serde_json::to_value(PromotionOutcome::Promoted {
            from_program_id: Some(1),
            to_program_id: 2,
        })
        .unwrap();
        assert_eq!(json["outcome"], "promoted");
        assert_eq!(json["to_program_id"], 2);

        let json = serde_json::to_value(PromotionOutcome::Unchanged).unwrap();
        assert_eq!(json["outcome"], "unchanged");
    }

    #[test]
    fn program_create_defaults() {
        let req: LoyaltyProgramCreate =
            serde_json::from_str(r#"{"name":"Bronze","description":null,"unit_point":50}"#)
                .unwrap();
        assert_eq!(req.entry_points, 0);
        assert!(!req.is_default);
        assert_eq!(req.point_rate, 0.0);
    }
}
