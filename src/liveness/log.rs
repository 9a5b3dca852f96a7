//! Tab-separated diagnostic log of probe outcomes
//!
//! The file is truncated once per run and then appended to by the control
//! task after each source batch, so rows from concurrent probes never
//! interleave.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::errors::AppResult;
use crate::models::ProbedCandidate;

pub const LOG_HEADER: &str =
    "source_id\tchannel_name\turl\tresult\tstatus_code\treason\tattempts\terror";

#[derive(Debug, Clone)]
pub struct LivenessLog {
    path: PathBuf,
}

impl LivenessLog {
    /// Truncate (or create) the log file and write the header row
    pub async fn create(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        tokio::fs::write(&path, format!("{LOG_HEADER}\n")).await?;
        Ok(Self { path })
    }

    /// Append one row per probed candidate. Failures are logged, not returned.
    pub async fn append(&self, rows: &[ProbedCandidate]) {
        if rows.is_empty() {
            return;
        }

        let mut buffer = String::new();
        for row in rows {
            buffer.push_str(&format_row(row));
            buffer.push('\n');
        }

        if let Err(e) = self.write_all(buffer.as_bytes()).await {
            warn!(
                "Failed to append {} rows to liveness log {}: {}",
                rows.len(),
                self.path.display(),
                e
            );
        }
    }

    async fn write_all(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
}

pub fn format_row(row: &ProbedCandidate) -> String {
    let outcome = &row.outcome;
    let status = outcome
        .status_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "-".to_string());

    [
        clean_field(&row.candidate.source_label),
        clean_field(&row.candidate.channel_name),
        clean_field(&row.candidate.url),
        (if outcome.is_live { "LIVE" } else { "DEAD" }).to_string(),
        status,
        outcome.reason.to_string(),
        outcome.attempts.to_string(),
        clean_field(&outcome.error),
    ]
    .join("\t")
}

fn clean_field(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}
