//! Delivery code generation
//!
//! 128 位随机数 hex 编码为 32 字符配送码。与已签发的码冲突时重新采样，
//! 超过重试上限视为熵源故障。

use async_trait::async_trait;
use rand::RngCore;
use sqlx::SqliteConnection;

use crate::db::repository::{self, RepoResult};

use super::error::{DeliveryError, DeliveryResult};

/// Default retry budget before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// 已签发配送码的查询接口
#[async_trait]
pub trait IssuedCodes: Send {
    async fn is_issued(&mut self, code: &str) -> RepoResult<bool>;
}

#[async_trait]
impl IssuedCodes for SqliteConnection {
    async fn is_issued(&mut self, code: &str) -> RepoResult<bool> {
        repository::delivery::code_exists(&mut *self, code).await
    }
}

/// 16 random bytes, hex-encoded
pub fn random_code() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    max_attempts: u32,
    sampler: fn() -> String,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl CodeGenerator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            sampler: random_code,
        }
    }

    /// Replace the random source (tests pin codes like `"abc123"`)
    pub fn with_sampler(mut self, sampler: fn() -> String) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 生成一个未被签发过的配送码
    ///
    /// 调用方需在同一事务内插入 delivery；`delivery.code` 上的唯一约束兜底。
    pub async fn generate<S>(&self, issued: &mut S) -> DeliveryResult<String>
    where
        S: IssuedCodes + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let code = (self.sampler)();
            if !issued.is_issued(&code).await? {
                return Ok(code);
            }
            tracing::warn!(attempt, "Delivery code collision, resampling");
        }

        tracing::error!(
            attempts = self.max_attempts,
            "Delivery code space exhausted, entropy source is broken"
        );
        Err(DeliveryError::CodeSpaceExhausted(self.max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[async_trait]
    impl IssuedCodes for HashSet<String> {
        async fn is_issued(&mut self, code: &str) -> RepoResult<bool> {
            Ok(self.contains(code))
        }
    }

    fn fixed() -> String {
        "abc123".to_string()
    }

    #[test]
    fn random_code_is_32_hex_chars() {
        let code = random_code();
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(code, random_code());
    }

    #[tokio::test]
    async fn returns_fresh_code() {
        let mut issued = HashSet::new();
        let code = CodeGenerator::default()
            .with_sampler(fixed)
            .generate(&mut issued)
            .await
            .unwrap();
        assert_eq!(code, "abc123");
    }

    #[tokio::test]
    async fn resamples_on_collision() {
        let mut issued: HashSet<String> = (0..4).map(|_| random_code()).collect();
        let code = CodeGenerator::new(10).generate(&mut issued).await.unwrap();
        assert!(!issued.contains(&code));
    }

    #[tokio::test]
    async fn exhausted_budget_is_fatal() {
        let mut issued: HashSet<String> = [fixed()].into_iter().collect();
        let err = CodeGenerator::new(5)
            .with_sampler(fixed)
            .generate(&mut issued)
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::CodeSpaceExhausted(5)));
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Fatal);
    }
}
