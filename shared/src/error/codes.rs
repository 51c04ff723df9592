//! Unified error codes for the delivery engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order / delivery errors
//! - 5xxx: Loyalty errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Agent account is not approved
    AgentNotApproved = 2003,
    /// Caller is not the agent assigned to the delivery
    NotAssignedAgent = 2004,
    /// Caller does not own the order
    NotOrderOwner = 2005,

    // ==================== 4xxx: Order / Delivery ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order already has a delivery
    OrderAlreadyAccepted = 4002,
    /// Delivery not found
    DeliveryNotFound = 4003,
    /// Delivery has been accepted but not started
    DeliveryNotStarted = 4004,
    /// Delivery is not in progress
    DeliveryNotInProgress = 4005,
    /// Delivery has been canceled
    DeliveryCanceled = 4006,
    /// Delivery code does not match any delivery
    DeliveryCodeNotFound = 4007,
    /// Delivery code has already been used
    DeliveryCodeUsed = 4008,
    /// Coordinates out of range
    InvalidCoordinates = 4009,
    /// Rating out of range
    InvalidRating = 4010,

    // ==================== 5xxx: Loyalty ====================
    /// Balance lower than reward cost
    InsufficientPoints = 5001,
    /// Reward belongs to another program
    ProgramMismatch = 5002,
    /// Patient has no current enrollment
    NoActiveEnrollment = 5003,
    /// Reward not found
    RewardNotFound = 5004,
    /// Reward redemption limit reached
    RewardLimitReached = 5005,
    /// Loyalty program not found
    ProgramNotFound = 5006,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Delivery code retry budget exhausted
    CodeSpaceExhausted = 9101,
    /// Remote EMR unavailable
    EmrUnavailable = 9201,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Specific role is required",
            ErrorCode::AgentNotApproved => "Agent account is not approved",
            ErrorCode::NotAssignedAgent => "Delivery is assigned to another agent",
            ErrorCode::NotOrderOwner => "Order belongs to another patient",

            // Order / Delivery
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyAccepted => "Order has already been accepted",
            ErrorCode::DeliveryNotFound => "Delivery not found",
            ErrorCode::DeliveryNotStarted => "Delivery has not been started",
            ErrorCode::DeliveryNotInProgress => "Delivery is not in progress",
            ErrorCode::DeliveryCanceled => "Delivery has been canceled",
            ErrorCode::DeliveryCodeNotFound => {
                "Invalid code, please scan again or type manually"
            }
            ErrorCode::DeliveryCodeUsed => "Invalid code, the code has been used",
            ErrorCode::InvalidCoordinates => "Coordinates are out of range",
            ErrorCode::InvalidRating => "Rating must be between 1 and 5",

            // Loyalty
            ErrorCode::InsufficientPoints => "Insufficient points",
            ErrorCode::ProgramMismatch => "Reward is not available in your current program",
            ErrorCode::NoActiveEnrollment => "No active loyalty program enrollment",
            ErrorCode::RewardNotFound => "Reward not found",
            ErrorCode::RewardLimitReached => "Reward limit reached",
            ErrorCode::ProgramNotFound => "Loyalty program not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::CodeSpaceExhausted => "Unable to issue a unique delivery code",
            ErrorCode::EmrUnavailable => "EMR service unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::AgentNotApproved),
            2004 => Ok(ErrorCode::NotAssignedAgent),
            2005 => Ok(ErrorCode::NotOrderOwner),

            // Order / Delivery
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyAccepted),
            4003 => Ok(ErrorCode::DeliveryNotFound),
            4004 => Ok(ErrorCode::DeliveryNotStarted),
            4005 => Ok(ErrorCode::DeliveryNotInProgress),
            4006 => Ok(ErrorCode::DeliveryCanceled),
            4007 => Ok(ErrorCode::DeliveryCodeNotFound),
            4008 => Ok(ErrorCode::DeliveryCodeUsed),
            4009 => Ok(ErrorCode::InvalidCoordinates),
            4010 => Ok(ErrorCode::InvalidRating),

            // Loyalty
            5001 => Ok(ErrorCode::InsufficientPoints),
            5002 => Ok(ErrorCode::ProgramMismatch),
            5003 => Ok(ErrorCode::NoActiveEnrollment),
            5004 => Ok(ErrorCode::RewardNotFound),
            5005 => Ok(ErrorCode::RewardLimitReached),
            5006 => Ok(ErrorCode::ProgramNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9101 => Ok(ErrorCode::CodeSpaceExhausted),
            9201 => Ok(ErrorCode::EmrUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
