//! 규칙 파일 로더 -- YAML 규칙 파일을 디스크에서 로드합니다.
//!
//! 규칙 디렉토리 내의 `.yml`/`.yaml` 파일을 스캔하고 파싱합니다.
//! 개별 파일의 문제는 치명적이지 않습니다: 해당 레코드를 제외하고
//! [`RuleWarning`]으로 보고한 뒤 나머지 로딩을 계속합니다.
//! 규칙 디렉토리가 없는 것도 에러가 아니라 "규칙 없음"입니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::types::{DetectionRule, RuleWarning};

/// 규칙 파일 최대 크기 (바이트)
const MAX_RULE_FILE_SIZE: u64 = 1024 * 1024; // 1MB

/// 규칙 로드 결과 -- 유효한 규칙과 구조화된 경고 목록
///
/// 경고는 로그 스트림이 아니라 값으로 반환되므로 표현 계층이
/// 그대로 보여줄 수 있습니다.
#[derive(Debug, Default)]
pub struct RuleLoadReport {
    /// 검증을 통과한 규칙 (파일 경로 사전순)
    pub rules: Vec<DetectionRule>,
    /// 제외된 레코드에 대한 경고
    pub warnings: Vec<RuleWarning>,
}

impl RuleLoadReport {
    /// 경고 없이 로드되었는지 여부
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// 규칙 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// 디렉토리에서 모든 YAML 규칙 파일을 로드합니다.
    ///
    /// `.yml` 또는 `.yaml` 확장자를 가진 파일만 처리하며,
    /// 경로 사전순으로 방문하므로 규칙 순서(따라서 알림 순서)가
    /// 결정적입니다. 어떤 실패도 로딩 전체를 중단시키지 않습니다.
    pub async fn load_directory(dir: impl AsRef<Path>) -> RuleLoadReport {
        let dir = dir.as_ref();
        let mut report = RuleLoadReport::default();

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %dir.display(), "rule directory does not exist");
                return report;
            }
            Err(e) => {
                report.warnings.push(RuleWarning::new(
                    dir.display().to_string(),
                    format!("failed to read rule directory: {e}"),
                ));
                return report;
            }
        };

        let mut paths: Vec<PathBuf> = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    let is_yaml = path
                        .extension()
                        .is_some_and(|ext| ext == "yml" || ext == "yaml");
                    if is_yaml {
                        paths.push(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    report.warnings.push(RuleWarning::new(
                        dir.display().to_string(),
                        format!("failed to read directory entry: {e}"),
                    ));
                    break;
                }
            }
        }

        // 파일 시스템의 반환 순서는 플랫폼마다 다르므로 정렬로 고정
        paths.sort();

        let mut seen_ids = HashSet::new();
        for path in paths {
            let rule = match Self::load_file(&path).await {
                Ok(rule) => rule,
                Err(warning) => {
                    tracing::warn!(
                        path = %path.display(),
                        reason = %warning.reason,
                        "skipping rule file"
                    );
                    report.warnings.push(warning);
                    continue;
                }
            };

            if !seen_ids.insert(rule.id.clone()) {
                tracing::warn!(
                    rule_id = %rule.id,
                    path = %path.display(),
                    "duplicate rule id, skipping"
                );
                report.warnings.push(RuleWarning::new(
                    path.display().to_string(),
                    format!("duplicate rule id '{}'", rule.id),
                ));
                continue;
            }

            report.rules.push(rule);
        }

        tracing::info!(
            dir = %dir.display(),
            rules = report.rules.len(),
            warnings = report.warnings.len(),
            "loaded detection rules"
        );

        report
    }

    /// 단일 YAML 파일에서 규칙을 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<DetectionRule, RuleWarning> {
        let path = path.as_ref();
        let origin = path.display().to_string();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| RuleWarning::new(&origin, format!("failed to read file metadata: {e}")))?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(RuleWarning::new(
                &origin,
                format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            ));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RuleWarning::new(&origin, format!("failed to read file: {e}")))?;

        Self::parse_yaml(&content, &origin)
    }

    /// YAML 문자열을 파싱하여 규칙을 생성합니다.
    pub fn parse_yaml(yaml_str: &str, origin: &str) -> Result<DetectionRule, RuleWarning> {
        let rule: DetectionRule = serde_yaml::from_str(yaml_str)
            .map_err(|e| RuleWarning::new(origin, format!("YAML parse error: {e}")))?;

        rule.validate()?;

        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MatchKind;

    #[test]
    fn parse_valid_yaml() {
        let yaml = r#"
id: test_rule
description: Test rule
severity: medium
log_type: auth
match_type: contains
pattern: "Failed password"
"#;
        let rule = RuleLoader::parse_yaml(yaml, "test.yml").unwrap();
        assert_eq!(rule.id, "test_rule");
        assert_eq!(rule.match_type, MatchKind::Contains);
    }

    #[test]
    fn parse_invalid_yaml_returns_warning() {
        let yaml = "not: [valid: yaml: {{{";
        let result = RuleLoader::parse_yaml(yaml, "bad.yml");
        let warning = result.unwrap_err();
        assert_eq!(warning.origin, "bad.yml");
        assert!(warning.reason.contains("YAML parse error"));
    }

    #[test]
    fn parse_yaml_missing_required_field_returns_warning() {
        let yaml = r#"
id: no_log_type
match_type: contains
pattern: "x"
"#;
        assert!(RuleLoader::parse_yaml(yaml, "missing.yml").is_err());
    }

    #[tokio::test]
    async fn load_nonexistent_directory_is_empty_not_error() {
        let report = RuleLoader::load_directory("/nonexistent/path/rules").await;
        assert!(report.rules.is_empty());
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn load_directory_collects_rules_and_warnings() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("a_good.yaml"),
            "id: good\nlog_type: auth\nmatch_type: contains\npattern: x\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join("b_broken.yaml"), "{{{not yaml").unwrap();
        std::fs::write(
            tmp.path().join("c_missing.yaml"),
            "id: incomplete\npattern: x\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let report = RuleLoader::load_directory(tmp.path()).await;
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.rules[0].id, "good");
        assert_eq!(report.warnings.len(), 2);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn load_directory_orders_rules_by_path() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("20_second.yaml"),
            "id: second\nlog_type: auth\nmatch_type: contains\npattern: x\n",
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("10_first.yaml"),
            "id: first\nlog_type: auth\nmatch_type: contains\npattern: x\n",
        )
        .unwrap();

        let report = RuleLoader::load_directory(tmp.path()).await;
        let ids: Vec<&str> = report.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn duplicate_rule_id_keeps_first_and_warns() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("1.yaml"),
            "id: dup\ndescription: first\nlog_type: auth\nmatch_type: contains\npattern: x\n",
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("2.yaml"),
            "id: dup\ndescription: second\nlog_type: auth\nmatch_type: contains\npattern: x\n",
        )
        .unwrap();

        let report = RuleLoader::load_directory(tmp.path()).await;
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.rules[0].description, "first");
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].reason.contains("duplicate"));
    }

    #[tokio::test]
    async fn empty_directory_loads_zero_rules() {
        let tmp = tempfile::tempdir().unwrap();
        let report = RuleLoader::load_directory(tmp.path()).await;
        assert!(report.rules.is_empty());
        assert!(report.is_clean());
    }
}
