//! 모니터링 파이프라인 설정
//!
//! [`MonitorConfig`]는 core의 [`WatchtowerConfig`](watchtower_core::config::WatchtowerConfig)를
//! 기반으로 파이프라인 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use watchtower_core::config::WatchtowerConfig;
//! use watchtower_pipeline::config::MonitorConfig;
//!
//! let core_config = WatchtowerConfig::default();
//! let config = MonitorConfig::from_core(&core_config);
//! ```

use serde::{Deserialize, Serialize};

use watchtower_core::config::{MAX_INTERVAL_SECS, MIN_INTERVAL_SECS, WatchtowerConfig};

use crate::error::PipelineError;

/// 모니터링 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// 로그 소스 디렉토리
    pub log_dir: String,
    /// 탐지 규칙 디렉토리
    pub rule_dir: String,
    /// 이벤트/알림 저장소 디렉토리
    pub data_dir: String,
    /// 패스 간 대기 시간 (초)
    pub interval_secs: u64,
    /// 알림 질의 기본 최대 건수
    pub query_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_dir: "data/logs".to_owned(),
            rule_dir: "rules".to_owned(),
            data_dir: "data".to_owned(),
            interval_secs: 2,
            query_limit: 500,
        }
    }
}

impl MonitorConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &WatchtowerConfig) -> Self {
        Self {
            log_dir: core.monitor.log_dir.clone(),
            rule_dir: core.monitor.rule_dir.clone(),
            data_dir: core.general.data_dir.clone(),
            interval_secs: core.monitor.interval_secs,
            query_limit: core.monitor.query_limit,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.log_dir.is_empty() {
            return Err(PipelineError::Config {
                field: "log_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.rule_dir.is_empty() {
            return Err(PipelineError::Config {
                field: "rule_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.data_dir.is_empty() {
            return Err(PipelineError::Config {
                field: "data_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.interval_secs < MIN_INTERVAL_SECS || self.interval_secs > MAX_INTERVAL_SECS {
            return Err(PipelineError::Config {
                field: "interval_secs".to_owned(),
                reason: format!("must be {MIN_INTERVAL_SECS}-{MAX_INTERVAL_SECS}"),
            });
        }

        if self.query_limit == 0 {
            return Err(PipelineError::Config {
                field: "query_limit".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 모니터링 설정 빌더
#[derive(Default)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 로그 소스 디렉토리를 설정합니다.
    pub fn log_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    /// 규칙 디렉토리를 설정합니다.
    pub fn rule_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.rule_dir = dir.into();
        self
    }

    /// 저장소 디렉토리를 설정합니다.
    pub fn data_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// 패스 간 대기 시간(초)을 설정합니다.
    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.config.interval_secs = secs;
        self
    }

    /// 질의 최대 건수를 설정합니다.
    pub fn query_limit(mut self, limit: usize) -> Self {
        self.config.query_limit = limit;
        self
    }

    /// 설정을 검증하고 `MonitorConfig`를 생성합니다.
    pub fn build(self) -> Result<MonitorConfig, PipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
