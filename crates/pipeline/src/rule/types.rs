//! 탐지 규칙 데이터 타입
//!
//! YAML 규칙 파일에서 역직렬화되는 구조체들을 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 탐지 규칙 -- 하나의 YAML 규칙 파일에 대응합니다.
///
/// # YAML 스키마
/// ```yaml
/// id: ssh_failed_password
/// description: Detects failed SSH password attempts
/// severity: high
/// log_type: auth
/// match_type: contains
/// pattern: "Failed password"
/// ```
///
/// `id`, `log_type`, `match_type`는 필수입니다. 필수 필드가 빠진
/// 레코드는 로드 시점에 거부되며, 매칭 중에 조용히 건너뛰지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRule {
    /// 규칙 고유 ID
    pub id: String,
    /// 규칙 설명 (알림에 표시)
    #[serde(default)]
    pub description: String,
    /// 심각도 -- 자유 형식 문자열, 하류에서 대소문자 무시 비교
    #[serde(default = "default_severity")]
    pub severity: String,
    /// 적용 대상 소스 키 -- 다른 소스의 이벤트에는 절대 매칭되지 않음
    pub log_type: String,
    /// 비교 전략
    pub match_type: MatchKind,
    /// 비교 페이로드 -- 의미는 `match_type`에 따름, 비어있으면 매칭 안 함
    #[serde(default)]
    pub pattern: String,
}

fn default_severity() -> String {
    "low".to_owned()
}

impl DetectionRule {
    /// 규칙의 유효성을 검증합니다.
    ///
    /// serde가 필드 누락을 걸러낸 뒤에도 빈 문자열이 남을 수 있으므로
    /// 여기서 한 번 더 확인합니다.
    pub fn validate(&self) -> Result<(), RuleWarning> {
        if self.id.is_empty() {
            return Err(RuleWarning::new("(empty)", "rule id must not be empty"));
        }

        if self.id.len() > 256 {
            return Err(RuleWarning::new(
                &self.id,
                "rule id must not exceed 256 characters",
            ));
        }

        if self.log_type.is_empty() {
            return Err(RuleWarning::new(&self.id, "log_type must not be empty"));
        }

        Ok(())
    }
}

/// 비교 전략 -- 닫힌 열거형
///
/// 문자열 비교가 매칭 로직 곳곳에 흩어지지 않도록 명시적 enum으로
/// 디스패치합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// `pattern`이 `raw` 어딘가에 부분 문자열로 등장 (대소문자 구분, 리터럴)
    Contains,
    /// 양끝 공백을 제거한 `raw`와 `pattern`이 정확히 일치
    Equals,
    /// `pattern`을 정규식으로 컴파일하여 `raw`에서 검색
    Regex,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains => write!(f, "contains"),
            Self::Equals => write!(f, "equals"),
            Self::Regex => write!(f, "regex"),
        }
    }
}

/// 규칙 경고 -- 로딩/컴파일 중 발견된 비치명적 문제
///
/// 문제가 된 레코드는 제외하고 나머지 로딩은 계속합니다.
/// print 스트림이 아니라 구조화된 목록으로 반환되어
/// 표현 계층이 그대로 렌더링할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWarning {
    /// 문제의 출처 (파일 경로 또는 규칙 ID)
    pub origin: String,
    /// 문제 사유
    pub reason: String,
}

impl RuleWarning {
    /// 새 경고를 생성합니다.
    pub fn new(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RuleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.reason)
    }
}
