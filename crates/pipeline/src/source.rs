//! 로그 소스 리더 -- 설정된 디렉토리에서 원시 로그 라인을 읽습니다.
//!
//! 고정된 파일명 테이블로 논리 소스 키를 식별합니다
//! (`auth.log` -> "auth", `web.log` -> "web"). 테이블에 없는 파일은
//! 무시합니다. 상태를 갖지 않으며 호출할 때마다 파일 전체를 처음부터
//! 다시 읽습니다 (오프셋 추적 없음).

use std::path::PathBuf;

use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::PipelineError;

/// 지원 소스 테이블: 파일명 -> 논리 소스 키
///
/// 열거 순서가 곧 패스 내 처리 순서입니다.
const SUPPORTED_SOURCES: &[(&str, &str)] = &[("auth.log", "auth"), ("web.log", "web")];

/// 로그 소스 디스크립터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    /// 논리 소스 키 (예: "auth")
    pub key: &'static str,
    /// 소스 파일 경로
    pub path: PathBuf,
}

/// 파일 기반 로그 소스 리더
///
/// 디렉토리가 없으면 생성하고, 소스가 하나도 없으면 빈 목록을
/// 반환합니다 (에러 아님).
#[derive(Debug, Clone)]
pub struct SourceReader {
    /// 로그 소스 디렉토리
    log_dir: PathBuf,
}

impl SourceReader {
    /// 새 소스 리더를 생성합니다.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    /// 현재 존재하는 소스 목록을 테이블 순서대로 반환합니다.
    ///
    /// 디렉토리가 없으면 만들고, 빠진 파일은 목록에서 제외합니다.
    pub async fn sources(&self) -> Result<Vec<LogSource>, PipelineError> {
        fs::create_dir_all(&self.log_dir)
            .await
            .map_err(|e| PipelineError::Source {
                path: self.log_dir.display().to_string(),
                reason: format!("failed to create log directory: {e}"),
            })?;

        let mut sources = Vec::new();
        for (file_name, key) in SUPPORTED_SOURCES {
            let path = self.log_dir.join(file_name);
            if fs::try_exists(&path).await.unwrap_or(false) {
                sources.push(LogSource { key, path });
            }
        }
        Ok(sources)
    }

    /// 소스 파일의 라인을 처음부터 끝까지 읽습니다.
    ///
    /// 끝의 개행만 제거하며 나머지 내용(둘러싼 공백 포함)은 보존합니다.
    /// 공백뿐인 라인은 결과에서 제외합니다. 파일이 사라진 경우
    /// 빈 목록을 반환합니다.
    pub async fn read_lines(&self, source: &LogSource) -> Result<Vec<String>, PipelineError> {
        let file = match fs::File::open(&source.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PipelineError::Source {
                    path: source.path.display().to_string(),
                    reason: format!("failed to open source file: {e}"),
                });
            }
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut out = Vec::new();

        while let Some(line) = lines.next_line().await.map_err(|e| PipelineError::Source {
            path: source.path.display().to_string(),
            reason: format!("failed to read line: {e}"),
        })? {
            if line.trim().is_empty() {
                continue;
            }
            out.push(line);
        }

        Ok(out)
    }
}
