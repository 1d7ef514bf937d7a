//! 에러 타입 — 도메인별 에러 정의

/// Watchtower 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum WatchtowerError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러 (watchtower-pipeline에서 변환)
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스토리지 에러
///
/// append는 호출 단위로 실패를 전파해야 하므로 (한 건의 유실도 조용히
/// 넘어가지 않도록) 경로와 사유를 함께 담습니다.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 레코드 추가 실패
    #[error("append failed: {path}: {reason}")]
    Append { path: String, reason: String },

    /// 질의 실패
    #[error("query failed: {path}: {reason}")]
    Query { path: String, reason: String },

    /// 레코드 직렬화 실패
    #[error("serialize failed: {0}")]
    Serialize(String),
}
