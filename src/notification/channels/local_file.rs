//! 本地文件渠道 - 将所有通知写入 JSONL 文件

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::build::BuildOutcome;
use crate::notification::channel::{MessageKind, NotificationChannel, NotificationMessage, SendResult};

/// 投递记录（JSONL 格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// ISO8601 时间戳
    pub ts: DateTime<Utc>,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BuildOutcome>,
    /// 完整消息内容
    pub content: String,
}

/// 本地文件渠道 - 记录所有通知到本地文件
pub struct LocalFileChannel {
    path: PathBuf,
}

impl LocalFileChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加记录（带文件锁）
    fn append(&self, record: &DeliveryRecord) -> Result<()> {
        use fs2::FileExt;

        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;

        file.lock_exclusive()?;
        let written = writeln!(file, "{}", serde_json::to_string(record)?);
        file.unlock()?;
        written?;

        Ok(())
    }

    /// 读取最近 N 条记录（带共享锁）；文件不存在时为空
    pub fn read_recent(&self, n: usize) -> Vec<DeliveryRecord> {
        use fs2::FileExt;

        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };
        if let Err(e) = file.lock_shared() {
            warn!(path = %self.path.display(), error = %e, "Failed to lock delivery log");
        }

        let records: Vec<DeliveryRecord> = BufReader::new(&file)
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();
        let _ = file.unlock();

        let start = records.len().saturating_sub(n);
        records[start..].to_vec()
    }
}

impl NotificationChannel for LocalFileChannel {
    fn name(&self) -> &str {
        "local_file"
    }

    fn should_send(&self, _message: &NotificationMessage) -> bool {
        // 记录所有通知
        true
    }

    fn send(&self, message: &NotificationMessage) -> Result<SendResult> {
        let record = DeliveryRecord {
            ts: message.metadata.timestamp.unwrap_or_else(Utc::now),
            kind: message.kind,
            project: message.metadata.project.clone(),
            build_number: message.metadata.build_number,
            outcome: message.metadata.outcome,
            content: message.content.clone(),
        };

        match self.append(&record) {
            Ok(()) => {
                debug!(
                    channel = "local_file",
                    path = %self.path.display(),
                    "Notification recorded to local file"
                );
                Ok(SendResult::Sent)
            }
            Err(e) => {
                warn!(
                    channel = "local_file",
                    error = %e,
                    "Failed to write notification to local file"
                );
                Ok(SendResult::Failed(e.to_string()))
            }
        }
    }
}
