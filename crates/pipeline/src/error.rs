//! 파이프라인 에러 타입
//!
//! [`PipelineError`]는 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<PipelineError> for WatchtowerError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 규칙 파일이나 정규식 패턴의 문제는 에러가 아니라 경고
//! ([`RuleWarning`](crate::rule::RuleWarning))로 수집됩니다.
//! 여기의 에러는 소스 읽기 실패, 저장소 실패, 설정 오류처럼
//! 호출자에게 전파되어야 하는 경우만 다룹니다.

use watchtower_core::error::{StorageError, WatchtowerError};

/// 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 로그 소스 읽기 실패 (존재하지 않는 파일은 에러가 아님)
    #[error("source error: {path}: {reason}")]
    Source {
        /// 소스 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 저장소 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PipelineError> for WatchtowerError {
    fn from(err: PipelineError) -> Self {
        WatchtowerError::Pipeline(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_display() {
        let err = PipelineError::Source {
            path: "/var/log/auth.log".to_owned(),
            reason: "permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("auth.log"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn config_error_display() {
        let err = PipelineError::Config {
            field: "interval_secs".to_owned(),
            reason: "must be 1-10".to_owned(),
        };
        assert!(err.to_string().contains("interval_secs"));
    }

    #[test]
    fn converts_to_watchtower_error() {
        let err = PipelineError::Source {
            path: "x".to_owned(),
            reason: "y".to_owned(),
        };
        let top: WatchtowerError = err.into();
        assert!(matches!(top, WatchtowerError::Pipeline(_)));
    }

    #[test]
    fn storage_error_wraps() {
        let storage = StorageError::Append {
            path: "alerts.jsonl".to_owned(),
            reason: "disk full".to_owned(),
        };
        let err: PipelineError = storage.into();
        assert!(matches!(err, PipelineError::Storage(_)));
    }
}
