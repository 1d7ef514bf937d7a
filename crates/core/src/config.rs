//! 설정 관리 — watchtower.toml 파싱 및 런타임 설정
//!
//! [`WatchtowerConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`WATCHTOWER_MONITOR_INTERVAL_SECS=5` 형식)
//! 2. 설정 파일 (`watchtower.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), watchtower_core::error::WatchtowerError> {
//! use watchtower_core::config::WatchtowerConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = WatchtowerConfig::load("watchtower.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = WatchtowerConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, WatchtowerError};

/// 모니터링 간격 하한 (초)
pub const MIN_INTERVAL_SECS: u64 = 1;
/// 모니터링 간격 상한 (초)
pub const MAX_INTERVAL_SECS: u64 = 10;

/// Watchtower 통합 설정
///
/// `watchtower.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchtowerConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 모니터링 파이프라인 설정
    #[serde(default)]
    pub monitor: MonitorSection,
}

impl WatchtowerConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, WatchtowerError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, WatchtowerError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WatchtowerError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                WatchtowerError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, WatchtowerError> {
        toml::from_str(toml_str).map_err(|e| {
            WatchtowerError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `WATCHTOWER_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "WATCHTOWER_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "WATCHTOWER_GENERAL_LOG_FORMAT",
        );
        override_string(&mut self.general.data_dir, "WATCHTOWER_GENERAL_DATA_DIR");

        // Monitor
        override_string(&mut self.monitor.log_dir, "WATCHTOWER_MONITOR_LOG_DIR");
        override_string(&mut self.monitor.rule_dir, "WATCHTOWER_MONITOR_RULE_DIR");
        override_u64(
            &mut self.monitor.interval_secs,
            "WATCHTOWER_MONITOR_INTERVAL_SECS",
        );
        override_usize(
            &mut self.monitor.query_limit,
            "WATCHTOWER_MONITOR_QUERY_LIMIT",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), WatchtowerError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.monitor.interval_secs < MIN_INTERVAL_SECS
            || self.monitor.interval_secs > MAX_INTERVAL_SECS
        {
            return Err(ConfigError::InvalidValue {
                field: "monitor.interval_secs".to_owned(),
                reason: format!("must be {MIN_INTERVAL_SECS}-{MAX_INTERVAL_SECS}"),
            }
            .into());
        }

        if self.monitor.query_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "monitor.query_limit".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 이벤트/알림 저장소 디렉토리
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            data_dir: "data".to_owned(),
        }
    }
}

/// 모니터링 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// 로그 소스 디렉토리
    pub log_dir: String,
    /// 탐지 규칙 디렉토리
    pub rule_dir: String,
    /// 패스 간 대기 시간 (초, 1-10)
    pub interval_secs: u64,
    /// 알림 질의 기본 최대 건수
    pub query_limit: usize,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            log_dir: "data/logs".to_owned(),
            rule_dir: "rules".to_owned(),
            interval_secs: 2,
            query_limit: 500,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}
