//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::DeliveryNotFound
            | Self::DeliveryCodeNotFound
            | Self::RewardNotFound
            | Self::ProgramNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::OrderAlreadyAccepted
            | Self::DeliveryCodeUsed
            | Self::DeliveryCanceled => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::PermissionDenied
            | Self::RoleRequired
            | Self::AgentNotApproved
            | Self::NotAssignedAgent
            | Self::NotOrderOwner => StatusCode::FORBIDDEN,

            // 503 Service Unavailable (EMR 暂不可用，客户端可重试)
            Self::EmrUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError
            | Self::DatabaseError
            | Self::CodeSpaceExhausted
            | Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_status() {
        assert_eq!(
            ErrorCode::OrderAlreadyAccepted.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::DeliveryCodeUsed.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(
            ErrorCode::DeliveryCodeNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ErrorCode::RewardNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_status() {
        assert_eq!(
            ErrorCode::InsufficientPoints.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InvalidCoordinates.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::DeliveryNotInProgress.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_forbidden_and_system_status() {
        assert_eq!(
            ErrorCode::NotAssignedAgent.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ErrorCode::CodeSpaceExhausted.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::EmrUnavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
