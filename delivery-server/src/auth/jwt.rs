//! JWT 令牌服务
//!
//! 处理 JWT 令牌的生成、验证和解析。账户与登录由外部身份服务负责，
//! 这里只消费其签发的令牌。

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use shared::error::AppError;
use thiserror::Error;

/// 开发环境密钥，生产环境拒绝启动
const DEV_SECRET: &str = "delivery-server-development-secret-change-me!";

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// JWT 密钥 (应至少 32 字节)
    pub secret: String,
    /// 令牌过期时间 (分钟)
    pub expiration_minutes: i64,
    pub issuer: String,
    pub audience: String,
}

impl JwtConfig {
    /// | 环境变量 | 默认值 |
    /// |----------|--------|
    /// | JWT_SECRET | 开发密钥 |
    /// | JWT_EXPIRATION_MINUTES | 1440 |
    /// | JWT_ISSUER | delivery-server |
    /// | JWT_AUDIENCE | delivery-clients |
    pub fn from_env() -> Self {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) if s.len() >= 32 => s,
            Ok(_) => {
                tracing::warn!("JWT_SECRET shorter than 32 characters, using development secret");
                DEV_SECRET.to_string()
            }
            Err(_) => {
                tracing::warn!("JWT_SECRET not set, using development secret");
                DEV_SECRET.to_string()
            }
        };

        Self {
            secret,
            expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1440), // 默认 24 小时
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "delivery-server".to_string()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "delivery-clients".to_string()),
        }
    }

    pub fn is_dev_secret(&self) -> bool {
        self.secret == DEV_SECRET
    }
}

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Agent,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Agent => "agent",
            Role::Staff => "staff",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "agent" => Ok(Role::Agent),
            "staff" => Ok(Role::Staff),
            other => Err(JwtError::InvalidToken(format!("unknown role: {other}"))),
        }
    }
}

/// 存储在令牌中的 JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 ID (Subject)
    pub sub: String,
    pub name: String,
    /// patient | agent | staff
    pub role: String,
    /// 配送员审核状态
    #[serde(default)]
    pub approved: bool,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("无效令牌: {0}")]
    InvalidToken(String),

    #[error("令牌已过期")]
    ExpiredToken,

    #[error("无效签名")]
    InvalidSignature,

    #[error("令牌生成失败: {0}")]
    GenerationFailed(String),
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::ExpiredToken => AppError::token_expired(),
            JwtError::GenerationFailed(msg) => AppError::internal(msg),
            other => AppError::invalid_token(other.to_string()),
        }
    }
}

/// JWT 令牌服务
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish()
    }
}

impl JwtService {
    /// 使用指定配置创建新的 JWT 服务
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为用户生成新令牌 (测试与运维工具使用)
    pub fn generate_token(
        &self,
        user_id: i64,
        name: &str,
        role: Role,
        approved: bool,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            name: name.to_string(),
            role: role.as_str().to_string(),
            approved,
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// 验证并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// 验证令牌并解析为 [`CurrentUser`]
    pub fn authenticate(&self, token: &str) -> Result<CurrentUser, JwtError> {
        CurrentUser::try_from(self.validate_token(token)?)
    }

    /// 从 Authorization 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

/// 当前用户上下文 (从 JWT Claims 解析)
///
/// ```ignore
/// async fn handler(user: CurrentUser) -> AppResult<Json<()>> {
///     let patient_id = user.require_patient()?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub role: Role,
    pub approved: bool,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| JwtError::InvalidToken(format!("invalid subject: {}", claims.sub)))?;
        Ok(Self {
            id,
            name: claims.name,
            role: claims.role.parse()?,
            approved: claims.approved,
        })
    }
}

impl CurrentUser {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    /// 要求患者身份，返回 patient_id
    pub fn require_patient(&self) -> Result<i64, AppError> {
        match self.role {
            Role::Patient => Ok(self.id),
            _ => Err(AppError::with_message(
                shared::error::ErrorCode::RoleRequired,
                "Patient role required",
            )),
        }
    }

    /// 要求配送员身份（不检查审核状态）
    pub fn require_agent(&self) -> Result<i64, AppError> {
        match self.role {
            Role::Agent => Ok(self.id),
            _ => Err(AppError::with_message(
                shared::error::ErrorCode::RoleRequired,
                "Agent role required",
            )),
        }
    }

    /// 要求已审核的配送员
    pub fn require_approved_agent(&self) -> Result<i64, AppError> {
        let agent_id = self.require_agent()?;
        if !self.approved {
            return Err(AppError::with_message(
                shared::error::ErrorCode::AgentNotApproved,
                format!("Agent {} is not approved", agent_id),
            ));
        }
        Ok(agent_id)
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::with_message(
                shared::error::ErrorCode::RoleRequired,
                "Staff role required",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::with_config(JwtConfig {
            secret: "test-secret-that-is-at-least-32-bytes-long".into(),
            expiration_minutes: 60,
            issuer: "test-issuer".into(),
            audience: "test-audience".into(),
        })
    }

    #[test]
    fn token_round_trip_yields_current_user() {
        let jwt = service();
        let token = jwt.generate_token(42, "Wanjiru", Role::Agent, true).unwrap();
        let user = jwt.authenticate(&token).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.role, Role::Agent);
        assert!(user.approved);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = service()
            .generate_token(1, "p", Role::Patient, false)
            .unwrap();
        let other = JwtService::with_config(JwtConfig {
            secret: "another-secret-that-is-at-least-32-bytes".into(),
            ..service().config
        });
        assert!(matches!(
            other.validate_token(&token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn unknown_role_is_malformed() {
        let claims = Claims {
            sub: "1".into(),
            name: "x".into(),
            role: "doctor".into(),
            approved: false,
            exp: 0,
            iat: 0,
            iss: String::new(),
            aud: String::new(),
        };
        assert!(CurrentUser::try_from(claims).is_err());
    }

    #[test]
    fn role_guards() {
        let patient = CurrentUser {
            id: 7,
            name: "p".into(),
            role: Role::Patient,
            approved: false,
        };
        assert_eq!(patient.require_patient().unwrap(), 7);
        assert!(patient.require_agent().is_err());
        assert!(patient.require_staff().is_err());

        let pending = CurrentUser {
            id: 8,
            name: "a".into(),
            role: Role::Agent,
            approved: false,
        };
        assert_eq!(pending.require_agent().unwrap(), 8);
        let err = pending.require_approved_agent().unwrap_err();
        assert_eq!(err.code, shared::error::ErrorCode::AgentNotApproved);
    }

    #[test]
    fn extract_bearer() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }
}
