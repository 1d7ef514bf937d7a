//! 탐지 규칙 엔진 -- 불변 규칙 스냅샷과 이벤트 매칭
//!
//! YAML 규칙을 로드하여 [`RuleSet`] 스냅샷으로 컴파일하고,
//! [`Event`]에 대해 모든 규칙을 순서대로 평가합니다.
//!
//! # 규칙 형식
//! ```yaml
//! id: ssh_failed_password
//! description: Failed SSH password attempts
//! severity: high
//! log_type: auth
//! match_type: contains
//! pattern: "Failed password"
//! ```
//!
//! # 아키텍처
//! - [`RuleSet`]: 불변 스냅샷 + 매칭 코디네이터. "리로드"는 기존
//!   스냅샷을 변경하는 것이 아니라 새 스냅샷을 만들어 통째로 교체하는
//!   것이므로, 읽는 쪽이 절반만 갱신된 규칙 목록을 볼 수 없습니다.
//! - [`loader`]: YAML 파일 로딩 및 유효성 검증
//! - [`types`]: 규칙 데이터 구조 정의

pub mod loader;
pub mod types;

pub use loader::{RuleLoadReport, RuleLoader};
pub use types::{DetectionRule, MatchKind, RuleWarning};

use std::collections::HashMap;

use regex::Regex;

use watchtower_core::types::{Alert, Event};

/// 불변 규칙 스냅샷 -- 컴파일된 규칙 집합과 평가 로직
///
/// 정규식 패턴은 스냅샷 생성 시 한 번만 컴파일합니다. 컴파일에 실패한
/// 패턴은 경고로 기록되고 해당 규칙은 어떤 이벤트에도 매칭되지 않지만,
/// 다른 규칙의 평가를 중단시키지 않습니다.
///
/// 빈 스냅샷은 유효합니다 (규칙 0개, 알림 0개, 에러 아님).
pub struct RuleSet {
    /// 규칙 목록 -- 벡터 순서가 곧 평가 순서이자 알림 순서
    rules: Vec<DetectionRule>,
    /// 컴파일된 정규식 캐시: 규칙 인덱스 -> Regex
    regexes: HashMap<usize, Regex>,
    /// 컴파일 중 발견된 경고
    warnings: Vec<RuleWarning>,
}

impl RuleSet {
    /// 규칙 없는 빈 스냅샷을 생성합니다.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            regexes: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// 규칙 목록을 스냅샷으로 컴파일합니다.
    ///
    /// regex 타입 규칙의 패턴을 미리 컴파일하여 평가 시 재컴파일
    /// 오버헤드를 제거합니다. 컴파일 실패는 경고로만 남습니다.
    pub fn compile(rules: Vec<DetectionRule>) -> Self {
        let mut regexes = HashMap::new();
        let mut warnings = Vec::new();

        for (idx, rule) in rules.iter().enumerate() {
            if rule.match_type != MatchKind::Regex || rule.pattern.is_empty() {
                continue;
            }
            match Regex::new(&rule.pattern) {
                Ok(regex) => {
                    regexes.insert(idx, regex);
                }
                Err(e) => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        error = %e,
                        "invalid regex pattern, rule will never match"
                    );
                    warnings.push(RuleWarning::new(
                        &rule.id,
                        format!("invalid regex pattern: {e}"),
                    ));
                }
            }
        }

        Self {
            rules,
            regexes,
            warnings,
        }
    }

    /// 현재 스냅샷의 규칙 수를 반환합니다.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 규칙 목록을 평가 순서대로 반환합니다.
    pub fn rules(&self) -> &[DetectionRule] {
        &self.rules
    }

    /// 컴파일 중 수집된 경고를 반환합니다.
    pub fn warnings(&self) -> &[RuleWarning] {
        &self.warnings
    }

    /// 이벤트에 대해 모든 규칙을 평가하고 알림을 규칙 순서대로 반환합니다.
    ///
    /// 규칙 간 우선순위나 중복 제거는 없습니다. 같은 스냅샷에 대한
    /// 재평가는 결정적이며 동일한 알림 시퀀스를 생성합니다.
    pub fn evaluate(&self, event: &Event) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for (idx, rule) in self.rules.iter().enumerate() {
            // 소스 키 불일치는 정확한 (대소문자 구분) 비교
            if rule.log_type != event.source {
                continue;
            }

            // 빈 패턴은 매칭하지 않음 (contains의 빈 문자열 전부-매칭 방지)
            if rule.pattern.is_empty() {
                continue;
            }

            let matched = match rule.match_type {
                MatchKind::Contains => event.raw.contains(&rule.pattern),
                MatchKind::Equals => event.raw.trim() == rule.pattern.trim(),
                MatchKind::Regex => self
                    .regexes
                    .get(&idx)
                    .is_some_and(|regex| regex.is_match(&event.raw)),
            };

            if matched {
                alerts.push(Alert::new(
                    rule.id.clone(),
                    rule.description.clone(),
                    rule.severity.clone(),
                    event.clone(),
                ));
            }
        }

        alerts
    }
}
