//! started / completed / preview 命令处理
//!
//! 从历史文件中找到目标构建，评估并投递（或仅打印）通知消息。

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::build::{BuildHistory, BuildRecord, InMemoryHistory};
use crate::notification::{
    LifecycleEvent, NotificationBuilder, NotificationDispatcher, NotifyConfig, SendResult,
};
use crate::notifier::BuildNotifier;

/// 生命周期事件命令参数
#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// 构建历史 JSON 文件
    #[arg(long)]
    pub history: PathBuf,

    /// 项目名
    #[arg(long, short)]
    pub project: String,

    /// 构建号（默认: 项目的最新构建）
    #[arg(long, short)]
    pub build: Option<u32>,

    /// 配置文件（默认: ~/.config/build-notifier/config.json）
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 只记录，不实际发送
    #[arg(long)]
    pub dry_run: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct DeliveryOutput<'a> {
    kind: &'static str,
    content: &'a str,
    channels: Vec<ChannelOutput<'a>>,
}

#[derive(Serialize)]
struct ChannelOutput<'a> {
    channel: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

/// 查找目标构建
pub fn find_build<'h>(history: &'h InMemoryHistory, args: &EventArgs) -> Result<&'h BuildRecord> {
    let found = match args.build {
        Some(number) => history.build(&args.project, number),
        None => history.last_build(&args.project),
    };
    found.ok_or_else(|| match args.build {
        Some(number) => anyhow!("Build {}#{} not found in history", args.project, number),
        None => anyhow!("Project {} has no builds in history", args.project),
    })
}

/// 处理 started / completed 事件并投递
pub fn handle_event(event: LifecycleEvent, args: EventArgs) -> Result<()> {
    let config = NotifyConfig::load(args.config.as_deref())?;
    let history = InMemoryHistory::from_file(&args.history)?;
    let build = find_build(&history, &args)?;

    let dispatcher = NotificationBuilder::new(&config).dry_run(args.dry_run).build()?;
    let notifier = BuildNotifier::new(config, dispatcher);

    info!(project = %build.project, build = build.number, ?event, "Handling build event");
    let deliveries = match event {
        LifecycleEvent::Started => notifier.started(build, &history)?,
        LifecycleEvent::Completed => notifier.completed(build, &history)?,
    };

    if deliveries.is_empty() {
        println!("No notification for {} {}", build.project_display_name(), build.display_name());
        return Ok(());
    }

    let output: Vec<DeliveryOutput> = deliveries
        .iter()
        .map(|d| DeliveryOutput {
            kind: d.message.kind.as_str(),
            content: &d.message.content,
            channels: d
                .results
                .iter()
                .map(|(name, result)| {
                    let (status, detail) = match result {
                        SendResult::Sent => ("sent", None),
                        SendResult::Skipped(r) => ("skipped", Some(r.as_str())),
                        SendResult::Failed(r) => ("failed", Some(r.as_str())),
                    };
                    ChannelOutput {
                        channel: name,
                        status,
                        detail,
                    }
                })
                .collect(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for delivery in &output {
            println!("[{}] {}", delivery.kind, delivery.content);
            for channel in &delivery.channels {
                match channel.detail {
                    Some(detail) => println!("  -> {}: {} ({})", channel.channel, channel.status, detail),
                    None => println!("  -> {}: {}", channel.channel, channel.status),
                }
            }
        }
    }

    if deliveries.iter().any(|d| d.has_failures()) {
        return Err(anyhow!("Failed to publish one or more notifications"));
    }
    Ok(())
}

/// 打印将要发送的消息，不投递
pub fn handle_preview(event: LifecycleEvent, args: EventArgs) -> Result<()> {
    let config = NotifyConfig::load(args.config.as_deref())?;
    let history = InMemoryHistory::from_file(&args.history)?;
    let build = find_build(&history, &args)?;

    let notifier = BuildNotifier::new(config, NotificationDispatcher::new());
    let messages = notifier.preview(event, build, &history);

    if args.json {
        let contents: Vec<_> = messages
            .iter()
            .map(|m| serde_json::json!({"kind": m.kind, "content": m.content}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&contents)?);
    } else if messages.is_empty() {
        println!("No notification for {} {}", build.project_display_name(), build.display_name());
    } else {
        for message in messages {
            println!("[{}]\n{}\n", message.kind.as_str(), message.content);
        }
    }
    Ok(())
}

/// 打印生效的配置
pub fn handle_show_config(config: Option<PathBuf>) -> Result<()> {
    let config = NotifyConfig::load(config.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
