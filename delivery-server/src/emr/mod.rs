//! EMR integration (read-only)
//!
//! 接单时抓取患者当前处方快照。远端 EMR 的数据模型不归本服务管，
//! 这里只约定 [`PrescriptionSource`] 这一个接口。
//!
//! - 未配置 EMR / 患者无处方 → `Ok(None)`，接单继续
//! - 网络失败 / 响应无法解析 → `Err(EmrError)`，接单失败且不写库

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use shared::models::PrescriptionSnapshot;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmrError {
    #[error("EMR unavailable: {0}")]
    Unavailable(String),

    #[error("EMR returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PrescriptionSource: Send + Sync {
    async fn current_prescription(
        &self,
        patient_id: i64,
    ) -> Result<Option<PrescriptionSnapshot>, EmrError>;
}

/// EMR_BASE_URL 未设置时使用
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledEmr;

#[async_trait]
impl PrescriptionSource for DisabledEmr {
    async fn current_prescription(
        &self,
        _patient_id: i64,
    ) -> Result<Option<PrescriptionSnapshot>, EmrError> {
        Ok(None)
    }
}

/// HTTP client for the remote EMR
///
/// `GET {base}/patients/{id}/prescriptions/current`, 404 表示无处方。
#[derive(Debug, Clone)]
pub struct RemoteEmr {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteEmr {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EmrError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmrError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PrescriptionSource for RemoteEmr {
    async fn current_prescription(
        &self,
        patient_id: i64,
    ) -> Result<Option<PrescriptionSnapshot>, EmrError> {
        let url = format!(
            "{}/patients/{}/prescriptions/current",
            self.base_url, patient_id
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EmrError::Unavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(EmrError::Unavailable(format!(
                "EMR responded with {}",
                resp.status()
            )));
        }

        let snapshot = resp
            .json::<PrescriptionSnapshot>()
            .await
            .map_err(|e| EmrError::InvalidResponse(e.to_string()))?;
        Ok(Some(snapshot))
    }
}

/// In-memory prescription source for tests and local runs
#[derive(Debug, Default, Clone)]
pub struct StaticPrescriptionSource {
    prescriptions: Arc<DashMap<i64, PrescriptionSnapshot>>,
    failing: Arc<AtomicBool>,
}

impl StaticPrescriptionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, patient_id: i64, snapshot: PrescriptionSnapshot) {
        self.prescriptions.insert(patient_id, snapshot);
    }

    /// 模拟 EMR 宕机
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PrescriptionSource for StaticPrescriptionSource {
    async fn current_prescription(
        &self,
        patient_id: i64,
    ) -> Result<Option<PrescriptionSnapshot>, EmrError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmrError::Unavailable("static source marked failing".into()));
        }
        Ok(self.prescriptions.get(&patient_id).map(|p| p.value().clone()))
    }
}

/// 按配置选择实现
pub fn from_config(
    base_url: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn PrescriptionSource>, EmrError> {
    match base_url {
        Some(url) => {
            tracing::info!(url, "EMR prescription lookup enabled");
            Ok(Arc::new(RemoteEmr::new(url, timeout)?))
        }
        None => {
            tracing::info!("EMR_BASE_URL not set, prescriptions will not be snapshotted");
            Ok(Arc::new(DisabledEmr))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> PrescriptionSnapshot {
        PrescriptionSnapshot {
            prescription_id: "rx-1".into(),
            regimen: "TDF/3TC/DTG".into(),
            instruction: Some("Once daily".into()),
            doctor: None,
            prescribed_at: None,
        }
    }

    #[tokio::test]
    async fn static_source_returns_inserted_snapshot() {
        let source = StaticPrescriptionSource::new();
        source.insert(7, snapshot());
        assert_eq!(source.current_prescription(7).await.unwrap(), Some(snapshot()));
        assert_eq!(source.current_prescription(8).await.unwrap(), None);
    }

    #[tokio::test]
    async fn static_source_can_fail() {
        let source = StaticPrescriptionSource::new();
        source.set_failing(true);
        assert!(matches!(
            source.current_prescription(1).await,
            Err(EmrError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn disabled_source_has_nothing() {
        assert!(DisabledEmr.current_prescription(1).await.unwrap().is_none());
    }

    #[test]
    fn remote_trims_trailing_slash() {
        let emr = RemoteEmr::new("http://emr.local/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(emr.base_url, "http://emr.local/api");
    }
}
