//! 도메인 타입 — 파이프라인 전역에서 사용되는 공통 타입
//!
//! 로그 한 줄이 정규화된 [`Event`], 규칙 매칭으로 생성된 [`Alert`],
//! 그리고 저장소에 기록되는 [`StoredAlert`]를 정의합니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- action 분류 상수 ---

/// 로그인 실패 이벤트
pub const ACTION_LOGIN_FAILED: &str = "login_failed";
/// 로그인 성공 이벤트
pub const ACTION_LOGIN_SUCCESS: &str = "login_success";
/// 웹 로그 이벤트
pub const ACTION_WEB_EVENT: &str = "web_event";

/// 정규화된 로그 이벤트
///
/// 하나의 물리적 로그 라인에 1:1로 대응합니다.
/// `raw`는 항상 비어있지 않으며 생성 이후 변경되지 않습니다.
/// `action` / `user` / `src_ip`는 추출에 실패한 경우 빈 문자열입니다
/// (null과 빈 값의 구분이 없도록 Option을 사용하지 않습니다).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// 이벤트 고유 ID (UUID v4)
    pub id: String,
    /// 관측 시각 — 로그가 정규화된 시점이며, 라인 내용에서 파싱하지 않습니다
    pub timestamp: DateTime<Utc>,
    /// 논리적 소스 키 (예: "auth", "web")
    pub source: String,
    /// 원본 로그 라인 (개행 제거 외 원문 그대로)
    pub raw: String,
    /// 분류 결과 (login_failed, login_success, web_event, 미분류 시 빈 문자열)
    pub action: String,
    /// 추출된 사용자명 (없으면 빈 문자열)
    pub user: String,
    /// 추출된 출발지 IP (없으면 빈 문자열)
    pub src_ip: String,
}

impl Event {
    /// 분류되지 않은 이벤트를 생성합니다.
    ///
    /// `action` / `user` / `src_ip`는 빈 문자열로 시작하며,
    /// 정규화기가 추출에 성공한 필드만 채웁니다.
    pub fn new(source: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            source: source.into(),
            raw: raw.into(),
            action: String::new(),
            user: String::new(),
            src_ip: String::new(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] action={} user={} src_ip={}",
            self.source, self.action, self.user, self.src_ip,
        )
    }
}

/// 보안 알림
///
/// 하나의 규칙이 하나의 이벤트에 매칭된 결과입니다.
/// 같은 이벤트에 여러 규칙이 매칭되면 독립적인 Alert가 규칙 순서대로 생성됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 고유 ID (UUID v4)
    pub id: String,
    /// 생성 시각
    pub timestamp: DateTime<Utc>,
    /// 매칭된 규칙 ID (참조 무결성은 강제하지 않음)
    pub rule_id: String,
    /// 규칙 설명
    pub description: String,
    /// 심각도 — 자유 형식 문자열, 비교는 항상 대소문자 무시
    pub severity: String,
    /// 트리거한 이벤트 전체
    pub event: Event,
}

impl Alert {
    /// 규칙 메타데이터와 트리거 이벤트로 알림을 생성합니다.
    pub fn new(
        rule_id: impl Into<String>,
        description: impl Into<String>,
        severity: impl Into<String>,
        event: Event,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            rule_id: rule_id.into(),
            description: description.into(),
            severity: severity.into(),
            event,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] rule={} source={}",
            self.severity, self.rule_id, self.event.source,
        )
    }
}

/// 저장소에 기록된 알림 레코드
///
/// 질의 표면이 반환하는 형태입니다. 원본 구현은 저장 시 `source` 필드를
/// 유실했지만, 여기서는 유지합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAlert {
    /// 저장 순번 — 단조 증가, 최신순 정렬의 기준
    pub seq: u64,
    /// 알림 생성 시각
    pub timestamp: DateTime<Utc>,
    /// 매칭된 규칙 ID
    pub rule_id: String,
    /// 심각도 (자유 형식)
    pub severity: String,
    /// 이벤트 소스 키
    pub source: String,
    /// 출발지 IP (없으면 빈 문자열)
    pub src_ip: String,
    /// 사용자명 (없으면 빈 문자열)
    pub user: String,
    /// 트리거한 원본 로그 라인
    pub message: String,
}

impl fmt::Display for StoredAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] rule={} {}",
            self.seq, self.severity, self.rule_id, self.message,
        )
    }
}
