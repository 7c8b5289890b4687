//! 通知系统构建器 - 根据配置注册渠道

use super::channels::{LocalFileChannel, WebhookChannel};
use super::config::NotifyConfig;
use super::dispatcher::NotificationDispatcher;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 通知系统构建器
pub struct NotificationBuilder<'a> {
    config: &'a NotifyConfig,
    dry_run: bool,
}

impl<'a> NotificationBuilder<'a> {
    pub fn new(config: &'a NotifyConfig) -> Self {
        Self {
            config,
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 构建 NotificationDispatcher
    pub fn build(self) -> Result<NotificationDispatcher> {
        let mut dispatcher = NotificationDispatcher::new().with_dry_run(self.dry_run);

        if !self.config.transport.webhook_url.is_empty() {
            info!(channel = "webhook", target = ?self.config.transport.channel, "Configured webhook channel");
            let channel = WebhookChannel::new(self.config.transport.clone())?;
            dispatcher.register_channel(Arc::new(channel));
        }

        if let Some(path) = &self.config.log_file {
            info!(channel = "local_file", path = %path.display(), "Configured delivery log");
            dispatcher.register_channel(Arc::new(LocalFileChannel::new(path.clone())));
        }

        if dispatcher.channel_count() == 0 {
            warn!("No notification channel configured, messages will be dropped");
        } else {
            debug!(channels = ?dispatcher.channel_names(), dry_run = self.dry_run, "Dispatcher ready");
        }

        Ok(dispatcher)
    }
}
