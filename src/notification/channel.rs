//! 通知渠道 trait 定义

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::build::{BuildOutcome, BuildRecord};

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// 构建开始
    Start,
    /// 构建完成状态
    Status,
    /// 提交列表
    CommitList,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Start => "start",
            MessageKind::Status => "status",
            MessageKind::CommitList => "commit_list",
        }
    }
}

/// 通知消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// 消息内容（已格式化、已转义）
    pub content: String,
    pub kind: MessageKind,
    /// 消息元数据
    pub metadata: MessageMetadata,
}

impl NotificationMessage {
    /// 创建简单消息
    pub fn new(content: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            content: content.into(),
            kind,
            metadata: MessageMetadata::default(),
        }
    }

    /// 设置元数据
    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// 消息元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// 项目名
    pub project: Option<String>,
    /// 构建号
    pub build_number: Option<u32>,
    /// 构建结果
    pub outcome: Option<BuildOutcome>,
    /// 时间戳
    pub timestamp: Option<DateTime<Utc>>,
}

impl MessageMetadata {
    pub fn for_build(build: &BuildRecord) -> Self {
        Self {
            project: Some(build.project.clone()),
            build_number: Some(build.number),
            outcome: Some(build.outcome),
            timestamp: Some(Utc::now()),
        }
    }
}

/// 发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（不符合渠道过滤条件）
    Skipped(String),
    /// 发送失败
    Failed(String),
}

impl SendResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, SendResult::Failed(_))
    }
}

/// 通知渠道 trait
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称（用于日志和配置）
    fn name(&self) -> &str;

    /// 是否应该发送此消息
    fn should_send(&self, message: &NotificationMessage) -> bool;

    /// 发送消息；投递失败以 `SendResult::Failed` 返回
    fn send(&self, message: &NotificationMessage) -> Result<SendResult>;
}
