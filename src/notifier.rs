//! 构建生命周期通知 - 决策 → 渲染 → 投递

use anyhow::Result;
use tracing::info;

use crate::build::{BuildEnvironment, BuildHistory, BuildRecord, EnvironmentProvider};
use crate::notification::{
    ComposedMessage, LifecycleEvent, MessageFormatter, MessageMetadata, NotificationDispatcher,
    NotificationMessage, NotificationPolicy, NotifyConfig, SendResult,
};

/// 单条消息的投递结果
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub message: ComposedMessage,
    /// 各渠道的发送结果
    pub results: Vec<(String, SendResult)>,
}

impl Delivery {
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|(_, r)| r.is_failed())
    }
}

/// 构建通知器
pub struct BuildNotifier {
    config: NotifyConfig,
    dispatcher: NotificationDispatcher,
    environment: Box<dyn EnvironmentProvider>,
}

impl BuildNotifier {
    pub fn new(config: NotifyConfig, dispatcher: NotificationDispatcher) -> Self {
        let environment = BuildEnvironment::new(config.build_server_url.clone())
            .with_process_env(config.include_process_env);
        Self {
            config,
            dispatcher,
            environment: Box::new(environment),
        }
    }

    /// 渲染将要发送的消息（不投递）
    pub fn preview(
        &self,
        event: LifecycleEvent,
        build: &BuildRecord,
        history: &dyn BuildHistory,
    ) -> Vec<ComposedMessage> {
        let policy = NotificationPolicy::new(&self.config);
        let Some(intent) = policy.evaluate(event, build, history) else {
            return Vec::new();
        };
        MessageFormatter::new(&self.config, history, self.environment.as_ref()).compose(&intent, build)
    }

    /// 构建开始
    pub fn started(&self, build: &BuildRecord, history: &dyn BuildHistory) -> Result<Vec<Delivery>> {
        self.notify(LifecycleEvent::Started, build, history)
    }

    /// 构建完成
    pub fn completed(&self, build: &BuildRecord, history: &dyn BuildHistory) -> Result<Vec<Delivery>> {
        info!(project = %build.project, build = build.number, outcome = %build.outcome, "Build completed, checking notifiers");
        self.notify(LifecycleEvent::Completed, build, history)
    }

    fn notify(
        &self,
        event: LifecycleEvent,
        build: &BuildRecord,
        history: &dyn BuildHistory,
    ) -> Result<Vec<Delivery>> {
        let messages = self.preview(event, build, history);
        let mut deliveries = Vec::with_capacity(messages.len());

        for composed in messages {
            let message = NotificationMessage::new(composed.content.clone(), composed.kind)
                .with_metadata(MessageMetadata::for_build(build));
            let results = self.dispatcher.send_sync(&message)?;
            deliveries.push(Delivery {
                message: composed,
                results,
            });
        }

        Ok(deliveries)
    }
}
