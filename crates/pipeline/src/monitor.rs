//! 모니터링 스케줄러 -- 파이프라인 패스의 단발/반복 실행을 관리합니다.
//!
//! [`Monitor`]는 Idle/Running 두 상태를 가집니다. `start`는 백그라운드
//! tokio 태스크 하나를 스폰하여 패스를 반복하고, `stop`은 취소 토큰으로
//! 루프를 중단시킵니다. 패스 사이의 대기는 `tokio::select!`로 취소
//! 가능하므로 정지 지연은 sleep 해상도가 아니라 select 응답으로
//! 제한됩니다.
//!
//! 취소는 협조적입니다: 진행 중인 패스는 중단하지 않고, 루프 선두와
//! 대기 중에만 취소를 관찰합니다.
//!
//! # 알려진 비용
//! 패스마다 규칙 스냅샷을 새로 로드하고 모든 소스를 처음부터 다시
//! 읽습니다 (오프셋 추적 없음). 따라서 같은 라인이 패스마다 다시
//! 전달되어 알림이 반복 생성될 수 있으며, 하류 소비자는 이를 감내해야
//! 합니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use watchtower_core::config::{MAX_INTERVAL_SECS, MIN_INTERVAL_SECS};
use watchtower_core::pipeline::AlertSink;
use watchtower_core::types::StoredAlert;

use crate::config::MonitorConfig;
use crate::error::PipelineError;
use crate::normalize::Normalizer;
use crate::rule::{RuleLoader, RuleSet, RuleWarning};
use crate::source::SourceReader;

/// 파이프라인 패스 하나의 실행 결과
#[derive(Debug, Clone, Default)]
pub struct PassSummary {
    /// 정규화된 이벤트 수
    pub events: u64,
    /// 생성된 알림 수 (표현 계층의 runOnce 반환값)
    pub alerts: u64,
    /// 저장 실패 건수 -- 실패해도 패스는 계속되지만 조용히 넘기지 않음
    pub append_failures: u64,
    /// 이 패스에 사용된 규칙 수
    pub rule_count: usize,
    /// 규칙 로딩/컴파일 경고
    pub warnings: Vec<RuleWarning>,
}

/// 모니터 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorState {
    /// 대기 (초기 상태)
    Idle,
    /// 연속 모니터링 실행 중
    Running,
}

/// 패스 실행에 필요한 구성 요소 묶음
///
/// 백그라운드 태스크로 복제되어 들어갑니다. 정규화기와 소스 리더는
/// 상태가 없으므로 동기 호출자와 백그라운드 루프 어느 쪽에서든 안전하게
/// 사용할 수 있습니다.
struct PassContext<S> {
    reader: SourceReader,
    normalizer: Normalizer,
    rule_dir: String,
    sink: Arc<S>,
}

impl<S> Clone for PassContext<S> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            normalizer: self.normalizer.clone(),
            rule_dir: self.rule_dir.clone(),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S: AlertSink> PassContext<S> {
    /// 전체 파이프라인 패스를 1회 수행합니다.
    ///
    /// 규칙 스냅샷을 새로 로드한 뒤 모든 소스의 모든 라인을
    /// 정규화 -> 매칭 -> 저장 순으로 흘립니다. 저장 실패는 해당 호출에
    /// 한해 기록하고 나머지 이벤트 처리를 계속합니다.
    async fn run_pass(&self) -> Result<PassSummary, PipelineError> {
        let report = RuleLoader::load_directory(&self.rule_dir).await;
        let rule_set = RuleSet::compile(report.rules);

        let mut summary = PassSummary {
            rule_count: rule_set.rule_count(),
            ..Default::default()
        };
        summary.warnings.extend(report.warnings);
        summary.warnings.extend(rule_set.warnings().to_vec());

        for source in self.reader.sources().await? {
            for line in self.reader.read_lines(&source).await? {
                let Some(event) = self.normalizer.normalize(source.key, &line) else {
                    continue;
                };
                summary.events += 1;

                if let Err(e) = self.sink.append_event(&event).await {
                    tracing::error!(error = %e, source = source.key, "failed to persist event");
                    summary.append_failures += 1;
                }

                for alert in rule_set.evaluate(&event) {
                    summary.alerts += 1;
                    if let Err(e) = self.sink.append_alert(&alert).await {
                        tracing::error!(
                            error = %e,
                            rule_id = %alert.rule_id,
                            "failed to persist alert"
                        );
                        summary.append_failures += 1;
                    }
                }
            }
        }

        Ok(summary)
    }
}

/// 모니터링 스케줄러
///
/// 표현 계층에 노출되는 연산은 네 가지뿐입니다:
/// [`run_once`](Self::run_once), [`start`](Self::start),
/// [`stop`](Self::stop), [`recent_alerts`](Self::recent_alerts).
///
/// `start`는 단일 승인입니다: 이미 Running이면 두 번째 루프를 만들지
/// 않고 `false`를 반환합니다. 백그라운드 루프는 최대 하나만 존재하며,
/// 단발 패스는 호출자 컨텍스트에서 동기적으로 실행됩니다.
pub struct Monitor<S> {
    ctx: PassContext<S>,
    query_limit: usize,
    state: MonitorState,
    /// 패스 간 대기 시간 (초) -- 패스 사이에 변경 가능, 다음 대기부터 적용
    interval_secs: Arc<AtomicU64>,
    cancel: Option<CancellationToken>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl<S: AlertSink + 'static> Monitor<S> {
    /// 설정을 검증하고 모니터를 생성합니다.
    pub fn new(config: MonitorConfig, sink: S) -> Result<Self, PipelineError> {
        config.validate()?;
        tracing::debug!(
            sink = sink.name(),
            log_dir = %config.log_dir,
            rule_dir = %config.rule_dir,
            "monitor created"
        );
        Ok(Self {
            ctx: PassContext {
                reader: SourceReader::new(config.log_dir.clone()),
                normalizer: Normalizer::new(),
                rule_dir: config.rule_dir.clone(),
                sink: Arc::new(sink),
            },
            query_limit: config.query_limit,
            state: MonitorState::Idle,
            interval_secs: Arc::new(AtomicU64::new(config.interval_secs)),
            cancel: None,
            task: None,
        })
    }

    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            MonitorState::Idle => "idle",
            MonitorState::Running => "running",
        }
    }

    /// 연속 모니터링이 실행 중인지 여부
    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    /// 현재 패스 간 대기 시간(초)을 반환합니다.
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::Relaxed)
    }

    /// 패스 간 대기 시간을 변경합니다. 다음 대기부터 적용됩니다.
    ///
    /// 허용 범위를 벗어나면 경계로 잘라내고 적용된 값을 반환합니다.
    pub fn set_interval_secs(&self, secs: u64) -> u64 {
        let effective = secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS);
        if effective != secs {
            tracing::warn!(
                requested = secs,
                effective,
                "interval out of bounds, clamped"
            );
        }
        self.interval_secs.store(effective, Ordering::Relaxed);
        effective
    }

    /// 파이프라인 패스를 1회 동기 실행합니다.
    ///
    /// Running/Idle 상태와 무관하게 호출할 수 있습니다.
    pub async fn run_once(&self) -> Result<PassSummary, PipelineError> {
        self.ctx.run_pass().await
    }

    /// 연속 모니터링을 시작합니다.
    ///
    /// 이미 실행 중이면 두 번째 루프를 스폰하지 않고 `false`를
    /// 반환합니다. 루프는 즉시 첫 패스를 수행한 뒤 설정된 간격으로
    /// 반복합니다.
    pub fn start(&mut self) -> bool {
        if self.state == MonitorState::Running {
            tracing::warn!("monitoring already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let ctx = self.ctx.clone();
        let interval = Arc::clone(&self.interval_secs);
        let loop_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            tracing::info!("monitoring loop started");
            loop {
                // 취소는 패스 경계에서만 관찰 (패스 중단 없음)
                if loop_cancel.is_cancelled() {
                    break;
                }

                match ctx.run_pass().await {
                    Ok(summary) => {
                        tracing::info!(
                            events = summary.events,
                            alerts = summary.alerts,
                            rules = summary.rule_count,
                            "monitoring pass complete"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "monitoring pass failed");
                    }
                }

                let wait = Duration::from_secs(interval.load(Ordering::Relaxed));
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            tracing::info!("monitoring loop stopped");
        });

        self.cancel = Some(cancel);
        self.task = Some(task);
        self.state = MonitorState::Running;
        true
    }

    /// 연속 모니터링을 정지합니다.
    ///
    /// Idle 상태에서는 아무 일도 하지 않고 `false`를 반환합니다.
    /// 진행 중인 패스가 있으면 끝날 때까지 기다린 뒤 반환합니다.
    pub async fn stop(&mut self) -> bool {
        if self.state != MonitorState::Running {
            tracing::debug!("stop requested but monitoring is idle");
            return false;
        }

        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "monitoring task join failed");
            }
        }

        self.state = MonitorState::Idle;
        true
    }

    /// 최근 알림을 최신순으로 조회합니다.
    ///
    /// `severity`는 대소문자 무시 동등 비교이며, 반환 건수는 설정의
    /// `query_limit`으로 제한됩니다.
    pub async fn recent_alerts(
        &self,
        severity: Option<&str>,
    ) -> Result<Vec<StoredAlert>, PipelineError> {
        self.ctx
            .sink
            .query_alerts(severity, self.query_limit)
            .await
            .map_err(Into::into)
    }

    /// 저장소에 대한 참조를 반환합니다.
    pub fn sink(&self) -> &S {
        &self.ctx.sink
    }
}

impl<S> Drop for Monitor<S> {
    fn drop(&mut self) {
        // 모니터가 버려져도 백그라운드 루프가 남지 않도록
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfigBuilder;
    use crate::sink::JsonlAlertSink;
    use std::time::Instant;

    const FAILED_LINE: &str =
        "Jan  1 10:15:32 server1 sshd[12345]: Failed password for invalid user admin \
         from 192.168.1.10 port 54321 ssh2";

    async fn fixture(root: &std::path::Path) -> Monitor<JsonlAlertSink> {
        let log_dir = root.join("logs");
        let rule_dir = root.join("rules");
        let data_dir = root.join("data");
        std::fs::create_dir_all(&log_dir).unwrap();
        std::fs::create_dir_all(&rule_dir).unwrap();

        std::fs::write(
            log_dir.join("auth.log"),
            format!("{FAILED_LINE}\n# comment line\nAccepted password for bob from 10.0.0.5\n"),
        )
        .unwrap();
        std::fs::write(
            rule_dir.join("ssh_failed.yaml"),
            "id: ssh_failed\ndescription: Failed SSH password\nseverity: high\n\
             log_type: auth\nmatch_type: contains\npattern: \"Failed password\"\n",
        )
        .unwrap();

        let config = MonitorConfigBuilder::new()
            .log_dir(log_dir.display().to_string())
            .rule_dir(rule_dir.display().to_string())
            .data_dir(data_dir.display().to_string())
            .interval_secs(1)
            .build()
            .unwrap();
        let sink = JsonlAlertSink::open(&data_dir).await.unwrap();
        Monitor::new(config, sink).unwrap()
    }

    #[tokio::test]
    async fn run_once_counts_events_and_alerts() {
        let tmp = tempfile::tempdir().unwrap();
        let monitor = fixture(tmp.path()).await;

        let summary = monitor.run_once().await.unwrap();
        // 주석 라인은 이벤트가 되지 않는다
        assert_eq!(summary.events, 2);
        assert_eq!(summary.alerts, 1);
        assert_eq!(summary.rule_count, 1);
        assert_eq!(summary.append_failures, 0);
        assert!(summary.warnings.is_empty());

        let alerts = monitor.recent_alerts(None).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule_id, "ssh_failed");
        assert_eq!(alerts[0].user, "admin");
        assert_eq!(alerts[0].src_ip, "192.168.1.10");
    }

    #[tokio::test]
    async fn run_once_with_no_sources_is_empty_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let config = MonitorConfigBuilder::new()
            .log_dir(tmp.path().join("logs").display().to_string())
            .rule_dir(tmp.path().join("rules").display().to_string())
            .data_dir(tmp.path().join("data").display().to_string())
            .build()
            .unwrap();
        let sink = JsonlAlertSink::open(tmp.path().join("data")).await.unwrap();
        let monitor = Monitor::new(config, sink).unwrap();

        let summary = monitor.run_once().await.unwrap();
        assert_eq!(summary.events, 0);
        assert_eq!(summary.alerts, 0);
        assert_eq!(summary.rule_count, 0);
    }

    #[tokio::test]
    async fn rerun_redelivers_same_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let monitor = fixture(tmp.path()).await;

        monitor.run_once().await.unwrap();
        monitor.run_once().await.unwrap();

        // 오프셋 추적이 없으므로 같은 라인이 다시 알림을 만든다
        let alerts = monitor.recent_alerts(None).await.unwrap();
        assert_eq!(alerts.len(), 2);
    }

    #[tokio::test]
    async fn run_once_reports_rule_warnings() {
        let tmp = tempfile::tempdir().unwrap();
        let monitor = fixture(tmp.path()).await;
        std::fs::write(tmp.path().join("rules").join("broken.yaml"), "{{{").unwrap();
        std::fs::write(
            tmp.path().join("rules").join("bad_regex.yaml"),
            "id: bad_regex\nlog_type: auth\nmatch_type: regex\npattern: \"[oops\"\n",
        )
        .unwrap();

        let summary = monitor.run_once().await.unwrap();
        assert_eq!(summary.warnings.len(), 2);
        // 경고가 있어도 유효한 규칙은 정상 동작
        assert_eq!(summary.alerts, 1);
    }

    #[tokio::test]
    async fn start_is_single_admission() {
        let tmp = tempfile::tempdir().unwrap();
        let mut monitor = fixture(tmp.path()).await;

        assert!(monitor.start());
        assert!(monitor.is_running());
        // 두 번째 start는 새 루프를 만들지 않는다
        assert!(!monitor.start());
        assert_eq!(monitor.state_name(), "running");

        assert!(monitor.stop().await);
        assert_eq!(monitor.state_name(), "idle");
    }

    #[tokio::test]
    async fn stop_while_idle_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let mut monitor = fixture(tmp.path()).await;
        assert!(!monitor.stop().await);
    }

    #[tokio::test]
    async fn monitoring_loop_runs_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut monitor = fixture(tmp.path()).await;

        monitor.start();
        // 첫 패스는 시작 직후 수행된다
        tokio::time::sleep(Duration::from_millis(300)).await;
        monitor.stop().await;

        let alerts = monitor.recent_alerts(None).await.unwrap();
        assert!(!alerts.is_empty());
    }

    #[tokio::test]
    async fn stop_latency_is_bounded_by_select_not_sleep() {
        let tmp = tempfile::tempdir().unwrap();
        let mut monitor = fixture(tmp.path()).await;
        monitor.set_interval_secs(10);

        monitor.start();
        // 첫 패스가 끝나고 10초 대기에 들어갈 시간을 준다
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = Instant::now();
        monitor.stop().await;
        // 대기 중 취소가 즉시 관찰되어야 한다
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn interval_is_clamped_to_bounds() {
        let tmp = tempfile::tempdir().unwrap();
        let monitor = fixture(tmp.path()).await;

        assert_eq!(monitor.set_interval_secs(0), 1);
        assert_eq!(monitor.set_interval_secs(99), 10);
        assert_eq!(monitor.set_interval_secs(5), 5);
        assert_eq!(monitor.interval_secs(), 5);
    }

    #[tokio::test]
    async fn restart_after_stop_works() {
        let tmp = tempfile::tempdir().unwrap();
        let mut monitor = fixture(tmp.path()).await;

        assert!(monitor.start());
        assert!(monitor.stop().await);
        assert!(monitor.start());
        assert!(monitor.stop().await);
    }
}
