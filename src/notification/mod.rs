//! 通知层 - 决策、渲染、投递
//!
//! # 流程
//! 1. `NotificationPolicy` 根据构建结果和历史决定是否通知
//! 2. `MessageFormatter` 渲染消息文本
//! 3. `NotificationDispatcher` 把消息发到所有已注册的渠道
//!
//! # 使用示例
//! ```ignore
//! use build_notifier::notification::{NotificationBuilder, NotifyConfig};
//!
//! let config = NotifyConfig::load(None)?;
//! let dispatcher = NotificationBuilder::new(&config).build()?;
//! ```

pub mod builder;
pub mod channel;
pub mod channels;
pub mod config;
pub mod dispatcher;
pub mod duration;
pub mod formatter;
pub mod policy;

pub use builder::NotificationBuilder;
pub use channel::{MessageKind, MessageMetadata, NotificationChannel, NotificationMessage, SendResult};
pub use config::{CommitInfoChoice, NotifyConfig, TransportConfig};
pub use dispatcher::NotificationDispatcher;
pub use duration::format_time_span;
pub use formatter::{escape, status_label, ComposedMessage, MessageFormatter, StatusLabel};
pub use policy::{IntentKind, LifecycleEvent, NotificationIntent, NotificationPolicy, Trigger};
