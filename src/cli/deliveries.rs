//! deliveries 命令 - 查看本地投递日志

use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::notification::channels::LocalFileChannel;
use crate::notification::NotifyConfig;

/// 打印最近 N 条投递记录
pub fn handle_deliveries(config: Option<PathBuf>, limit: usize, json: bool) -> Result<()> {
    let config = NotifyConfig::load(config.as_deref())?;
    let path = config
        .log_file
        .ok_or_else(|| anyhow!("logFile is not configured; no delivery log to read"))?;
    let channel = LocalFileChannel::new(path);
    let records = channel.read_recent(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No deliveries recorded in {}", channel.path().display());
        return Ok(());
    }

    for record in records {
        let target = match (&record.project, record.build_number) {
            (Some(project), Some(number)) => format!("{} #{}", project, number),
            (Some(project), None) => project.clone(),
            _ => "-".to_string(),
        };
        println!(
            "{} [{}] {}\n  {}",
            record.ts.format("%Y-%m-%d %H:%M:%S"),
            record.kind.as_str(),
            target,
            record.content.replace('\n', "\n  ")
        );
    }
    Ok(())
}
