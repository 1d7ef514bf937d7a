//! 이벤트 정규화기 -- (소스 키, 원시 라인)을 [`Event`]로 변환합니다.
//!
//! 소스별 추출 규칙을 적용하되, 어떤 규칙에도 걸리지 않는 라인도
//! 버리지 않고 미분류 이벤트로 내보냅니다. 원문 검색 가능성을 위해
//! 추출 실패는 "분류 없음"일 뿐 "이벤트 없음"이 아닙니다.
//!
//! 빈 라인과 `#` 주석 라인만 건너뜁니다.

use std::sync::LazyLock;

use regex::Regex;

use watchtower_core::types::{
    ACTION_LOGIN_FAILED, ACTION_LOGIN_SUCCESS, ACTION_WEB_EVENT, Event,
};

/// sshd 로그인 실패 패턴
///
/// `invalid user` 마커는 선택이며, 사용자명 토큰과 IPv4 주소를 캡처합니다.
static AUTH_FAILED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Failed password for (invalid user )?(?P<user>\S+) from (?P<src_ip>\d+\.\d+\.\d+\.\d+)")
        .expect("hard-coded auth-failed pattern compiles")
});

/// sshd 로그인 성공 패턴
static AUTH_ACCEPTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Accepted password for (?P<user>\S+) from (?P<src_ip>\d+\.\d+\.\d+\.\d+)")
        .expect("hard-coded auth-accepted pattern compiles")
});

/// 웹 로그에서 첫 IPv4 형태 부분 문자열
static WEB_IP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+\.\d+").expect("hard-coded ip pattern compiles"));

/// 이벤트 정규화기
///
/// 상태가 없고 재진입 가능합니다. 타임스탬프는 라인 내용이 아니라
/// 정규화 시점의 벽시계 시각(관측 시각)입니다.
#[derive(Debug, Default, Clone)]
pub struct Normalizer;

impl Normalizer {
    /// 새 정규화기를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// 원시 라인 하나를 이벤트로 정규화합니다.
    ///
    /// 빈 라인(공백뿐 포함)과 `#`으로 시작하는 주석 라인은 `None`을
    /// 반환합니다. 그 외에는 소스 키에 따라:
    /// - `"auth"`: 로그인 실패/성공 패턴을 순서대로 시도하고, 둘 다
    ///   실패하면 미분류 이벤트를 생성합니다.
    /// - `"web"`: 첫 IPv4 부분 문자열을 `src_ip`로 추출하며, 성공 여부와
    ///   무관하게 항상 `web_event`로 분류합니다.
    /// - 그 외 키: `timestamp`/`source`/`raw`만 채운 이벤트를 생성합니다.
    pub fn normalize(&self, source_key: &str, raw: &str) -> Option<Event> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        let mut event = Event::new(source_key, raw);

        match source_key {
            "auth" => {
                if let Some(caps) = AUTH_FAILED_RE.captures(raw) {
                    event.action = ACTION_LOGIN_FAILED.to_owned();
                    event.user = caps["user"].to_owned();
                    event.src_ip = caps["src_ip"].to_owned();
                } else if let Some(caps) = AUTH_ACCEPTED_RE.captures(raw) {
                    event.action = ACTION_LOGIN_SUCCESS.to_owned();
                    event.user = caps["user"].to_owned();
                    event.src_ip = caps["src_ip"].to_owned();
                }
                // 알 수 없는 auth 라인도 미분류 상태로 보존
            }
            "web" => {
                event.action = ACTION_WEB_EVENT.to_owned();
                if let Some(m) = WEB_IP_RE.find(raw) {
                    event.src_ip = m.as_str().to_owned();
                }
            }
            _ => {}
        }

        Some(event)
    }
}
