//! Build Notifier - 构建生命周期聊天通知
//!
//! 根据构建结果和历史决定是否通知，并渲染状态消息投递到聊天渠道。

pub mod build;
pub mod cli;
pub mod notification;
pub mod notifier;

pub use build::{
    BuildEnvironment, BuildHistory, BuildOutcome, BuildRecord, CauseInfo, ChangeSetEntry,
    EnvironmentProvider, InMemoryHistory, TestSummary,
};
pub use notification::{
    CommitInfoChoice, LifecycleEvent, MessageFormatter, NotificationBuilder, NotificationIntent,
    NotificationPolicy, NotifyConfig, SendResult, StatusLabel,
};
pub use notifier::{BuildNotifier, Delivery};
