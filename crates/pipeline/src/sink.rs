//! JSONL 알림 저장소 -- append-only 이벤트/알림 영속화
//!
//! [`JsonlAlertSink`]는 데이터 디렉토리 아래 두 개의 JSONL 파일을
//! 관리합니다: `events.jsonl` (정규화된 모든 이벤트),
//! `alerts.jsonl` (규칙 매칭 결과). 레코드는 한 줄에 하나씩 직렬화되며,
//! append 호출이 반환되기 전에 flush + fsync로 내구성을 보장합니다.
//!
//! 갱신/삭제 연산은 없습니다. 질의는 severity 필터(대소문자 무시)와
//! 최신순 limit만 지원합니다.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use watchtower_core::error::StorageError;
use watchtower_core::pipeline::AlertSink;
use watchtower_core::types::{Alert, Event, StoredAlert};

/// JSONL 기반 알림 저장소
///
/// 파이프라인에서 유일하게 공유되는 가변 자원입니다. 패스는 한 번에
/// 하나만 실행되므로 (단일 승인 규칙) 내부 잠금은 두지 않고,
/// 순번 카운터만 원자적으로 관리합니다.
pub struct JsonlAlertSink {
    /// 이벤트 파일 경로
    events_path: PathBuf,
    /// 알림 파일 경로
    alerts_path: PathBuf,
    /// 이벤트 저장 순번 (마지막으로 발급된 값)
    event_seq: AtomicU64,
    /// 알림 저장 순번 (마지막으로 발급된 값)
    alert_seq: AtomicU64,
}

impl JsonlAlertSink {
    /// 데이터 디렉토리를 준비하고 저장소를 엽니다.
    ///
    /// 기존 파일이 있으면 레코드 수를 세어 순번을 이어갑니다.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StorageError::Append {
                path: dir.display().to_string(),
                reason: format!("failed to create data directory: {e}"),
            })?;

        let events_path = dir.join("events.jsonl");
        let alerts_path = dir.join("alerts.jsonl");

        let event_seq = count_records(&events_path).await?;
        let alert_seq = count_records(&alerts_path).await?;

        tracing::debug!(
            events = event_seq,
            alerts = alert_seq,
            dir = %dir.display(),
            "alert sink opened"
        );

        Ok(Self {
            events_path,
            alerts_path,
            event_seq: AtomicU64::new(event_seq),
            alert_seq: AtomicU64::new(alert_seq),
        })
    }

    /// 알림 파일 경로를 반환합니다.
    pub fn alerts_path(&self) -> &Path {
        &self.alerts_path
    }

    /// 한 줄을 파일 끝에 추가하고 내구성 있게 기록합니다.
    async fn append_line(path: &Path, line: &str) -> Result<(), StorageError> {
        let to_storage = |e: std::io::Error| StorageError::Append {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(to_storage)?;

        file.write_all(line.as_bytes()).await.map_err(to_storage)?;
        file.write_all(b"\n").await.map_err(to_storage)?;
        file.flush().await.map_err(to_storage)?;
        // append가 반환되기 전에 디스크 도달을 보장
        file.sync_data().await.map_err(to_storage)?;
        Ok(())
    }
}

impl AlertSink for JsonlAlertSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn append_event(&self, event: &Event) -> Result<u64, StorageError> {
        let line =
            serde_json::to_string(event).map_err(|e| StorageError::Serialize(e.to_string()))?;
        Self::append_line(&self.events_path, &line).await?;
        Ok(self.event_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn append_alert(&self, alert: &Alert) -> Result<u64, StorageError> {
        let seq = self.alert_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = StoredAlert {
            seq,
            timestamp: alert.timestamp,
            rule_id: alert.rule_id.clone(),
            severity: alert.severity.clone(),
            source: alert.event.source.clone(),
            src_ip: alert.event.src_ip.clone(),
            user: alert.event.user.clone(),
            message: alert.event.raw.clone(),
        };
        let line =
            serde_json::to_string(&stored).map_err(|e| StorageError::Serialize(e.to_string()))?;
        Self::append_line(&self.alerts_path, &line).await?;
        Ok(seq)
    }

    async fn query_alerts(
        &self,
        severity: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredAlert>, StorageError> {
        let file = match fs::File::open(&self.alerts_path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::Query {
                    path: self.alerts_path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut matching = Vec::new();

        while let Some(line) = lines.next_line().await.map_err(|e| StorageError::Query {
            path: self.alerts_path.display().to_string(),
            reason: e.to_string(),
        })? {
            let record: StoredAlert = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping corrupt alert record");
                    continue;
                }
            };

            let keep = match severity {
                Some(filter) => record.severity.eq_ignore_ascii_case(filter),
                None => true,
            };
            if keep {
                matching.push(record);
            }
        }

        // append 순서 = 오래된 것부터이므로, 끝에서 limit개를 취해 뒤집는다
        let skip = matching.len().saturating_sub(limit);
        let mut recent: Vec<StoredAlert> = matching.into_iter().skip(skip).collect();
        recent.reverse();
        Ok(recent)
    }
}

/// JSONL 파일의 레코드 수를 셉니다. 파일이 없으면 0입니다.
async fn count_records(path: &Path) -> Result<u64, StorageError> {
    let file = match fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(StorageError::Query {
                path: path.display().to_string(),
                reason: e.to_string(),
            });
        }
    };

    let reader = BufReader::new(file);
    let mut lines = reader.lines();
    let mut count = 0u64;
    while let Some(line) = lines.next_line().await.map_err(|e| StorageError::Query {
        path: path.display().to_string(),
        reason: e.to_string(),
    })? {
        if !line.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchtower_core::types::Event;

    fn alert_for(severity: &str, raw: &str) -> Alert {
        let mut event = Event::new("auth", raw);
        event.user = "root".to_owned();
        event.src_ip = "192.168.1.10".to_owned();
        Alert::new("test_rule", "test description", severity, event)
    }

    #[tokio::test]
    async fn append_event_returns_monotonic_seq() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonlAlertSink::open(tmp.path()).await.unwrap();

        let first = sink.append_event(&Event::new("auth", "line 1")).await.unwrap();
        let second = sink.append_event(&Event::new("auth", "line 2")).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn append_alert_and_query_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonlAlertSink::open(tmp.path()).await.unwrap();

        sink.append_alert(&alert_for("high", "Failed password for root"))
            .await
            .unwrap();

        let results = sink.query_alerts(None, 500).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_id, "test_rule");
        assert_eq!(results[0].source, "auth");
        assert_eq!(results[0].user, "root");
        assert_eq!(results[0].message, "Failed password for root");
    }

    #[tokio::test]
    async fn query_on_empty_store_returns_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonlAlertSink::open(tmp.path()).await.unwrap();
        let results = sink.query_alerts(None, 500).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn severity_filter_is_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonlAlertSink::open(tmp.path()).await.unwrap();

        sink.append_alert(&alert_for("HIGH", "a")).await.unwrap();
        sink.append_alert(&alert_for("low", "b")).await.unwrap();
        sink.append_alert(&alert_for("High", "c")).await.unwrap();

        let results = sink.query_alerts(Some("high"), 500).await.unwrap();
        assert_eq!(results.len(), 2);
        for record in &results {
            assert!(record.severity.eq_ignore_ascii_case("high"));
        }
    }

    #[tokio::test]
    async fn query_returns_newest_first_and_honors_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonlAlertSink::open(tmp.path()).await.unwrap();

        for i in 0..5 {
            sink.append_alert(&alert_for("medium", &format!("line {i}")))
                .await
                .unwrap();
        }

        let results = sink.query_alerts(None, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].message, "line 4");
        assert_eq!(results[1].message, "line 3");
        assert!(results[0].seq > results[1].seq);
    }

    #[tokio::test]
    async fn absent_filter_returns_all_severities() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonlAlertSink::open(tmp.path()).await.unwrap();

        sink.append_alert(&alert_for("low", "a")).await.unwrap();
        sink.append_alert(&alert_for("urgent", "b")).await.unwrap();

        let results = sink.query_alerts(None, 500).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn reopen_resumes_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let sink = JsonlAlertSink::open(tmp.path()).await.unwrap();
            sink.append_alert(&alert_for("low", "before reopen"))
                .await
                .unwrap();
        }

        let sink = JsonlAlertSink::open(tmp.path()).await.unwrap();
        let seq = sink
            .append_alert(&alert_for("low", "after reopen"))
            .await
            .unwrap();
        assert_eq!(seq, 2);

        let results = sink.query_alerts(None, 500).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].message, "after reopen");
    }

    #[tokio::test]
    async fn corrupt_record_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonlAlertSink::open(tmp.path()).await.unwrap();
        sink.append_alert(&alert_for("low", "good")).await.unwrap();

        // 손상된 라인을 직접 끼워넣는다
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(sink.alerts_path())
            .unwrap();
        writeln!(file, "{{not valid json").unwrap();

        let results = sink.query_alerts(None, 500).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message, "good");
    }

    #[tokio::test]
    async fn free_form_severity_is_preserved() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonlAlertSink::open(tmp.path()).await.unwrap();
        sink.append_alert(&alert_for("Urgent", "x")).await.unwrap();

        let results = sink.query_alerts(Some("URGENT"), 500).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].severity, "Urgent");
    }
}
