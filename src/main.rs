//! Build Notifier CLI
//!
//! 构建开始/完成时生成状态消息并发送到聊天 webhook

use anyhow::Result;
use build_notifier::cli::{
    handle_deliveries, handle_event, handle_preview, handle_show_config, EventArgs,
};
use build_notifier::notification::LifecycleEvent;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "build-notify")]
#[command(about = "Build Notifier - 构建状态聊天通知")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum EventKind {
    Started,
    Completed,
}

impl From<EventKind> for LifecycleEvent {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Started => LifecycleEvent::Started,
            EventKind::Completed => LifecycleEvent::Completed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// 构建开始：发送开始通知
    Started(EventArgs),
    /// 构建完成：按配置决定是否发送状态通知
    Completed(EventArgs),
    /// 预览将要发送的消息（不发送）
    Preview {
        /// 生命周期事件
        #[arg(long, value_enum, default_value = "completed")]
        event: EventKind,
        #[command(flatten)]
        args: EventArgs,
    },
    /// 查看最近的投递记录（需要配置 logFile）
    Deliveries {
        /// 配置文件
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// 显示条数
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 打印生效的配置
    Config {
        /// 配置文件
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug build-notify completed ...
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("build_notifier=info,build_notify=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Started(args) => handle_event(LifecycleEvent::Started, args)?,
        Commands::Completed(args) => handle_event(LifecycleEvent::Completed, args)?,
        Commands::Preview { event, args } => handle_preview(event.into(), args)?,
        Commands::Deliveries { config, limit, json } => handle_deliveries(config, limit, json)?,
        Commands::Config { config } => handle_show_config(config)?,
    }

    Ok(())
}
