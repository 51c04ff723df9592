use std::path::PathBuf;

use crate::auth::JwtConfig;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖（启动时先加载 `.env`）：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | DATABASE_FILE | delivery.db | 数据库文件名 |
/// | HTTP_PORT | 8080 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 未设置 RUST_LOG 时的日志级别 |
/// | LOG_DIR | - | 设置后启用按天滚动的文件日志 |
/// | EMR_BASE_URL | - | EMR 地址，未设置则不拉取处方 |
/// | EMR_TIMEOUT_MS | 5000 | EMR 请求超时(毫秒) |
/// | CODE_MAX_ATTEMPTS | 1000 | 配送码重采样上限 |
/// | LIVE_CHANNEL_CAPACITY | 256 | 每个位置 topic 的缓冲 |
/// | WS_PING_INTERVAL_SECS | 30 | WebSocket 心跳间隔 |
///
/// JWT 相关变量见 [`JwtConfig`]。
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/delivery HTTP_PORT=9000 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub database_file: String,
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub jwt: JwtConfig,
    pub emr_base_url: Option<String>,
    pub emr_timeout_ms: u64,
    pub code_max_attempts: u32,
    pub live_channel_capacity: usize,
    pub ws_ping_interval_secs: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            database_file: std::env::var("DATABASE_FILE")
                .unwrap_or_else(|_| "delivery.db".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            jwt: JwtConfig::from_env(),
            emr_base_url: std::env::var("EMR_BASE_URL").ok().filter(|u| !u.is_empty()),
            emr_timeout_ms: std::env::var("EMR_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            code_max_attempts: std::env::var("CODE_MAX_ATTEMPTS")
                .ok()
                .and_then(|p| p.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(1000),
            live_channel_capacity: std::env::var("LIVE_CHANNEL_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(256),
            ws_ping_interval_secs: std::env::var("WS_PING_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(30),
        }
    }

    /// 测试用配置：指定工作目录，其余取默认值
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// 数据库文件完整路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.database_file)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 启动前检查
    pub fn validate(&self) -> Result<(), super::ServerError> {
        if self.is_production() && self.jwt.is_dev_secret() {
            return Err(super::ServerError::Config(
                "JWT_SECRET must be set in production".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
