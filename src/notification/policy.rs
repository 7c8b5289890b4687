//! 通知决策 - 根据构建结果和历史决定是否发送通知
//!
//! 无状态：所有历史都来自外部提供的 `BuildHistory`。

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::NotifyConfig;
use crate::build::{BuildHistory, BuildOutcome, BuildRecord, CauseInfo};

/// 构建生命周期事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Started,
    Completed,
}

/// 完成通知的触发条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Aborted,
    /// 首次失败（上一次结果不是 Failure）
    FirstFailure,
    /// 连续失败
    RepeatedFailure,
    NotBuilt,
    /// 从 Failure/Unstable 恢复
    BackToNormal,
    Success,
    Unstable,
}

/// 意图类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntentKind {
    /// 开始通知；`summarize_changes` 为 true 时用变更集摘要代替触发原因
    Started { summarize_changes: bool },
    Completed,
}

/// 一次评估产生的通知意图（不持久化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub kind: IntentKind,
    pub include_test_summary: bool,
    pub include_custom_message: bool,
    pub include_commit_list: bool,
    /// 命中的触发条件（仅完成通知）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
}

/// 通知决策器
#[derive(Debug, Clone)]
pub struct NotificationPolicy<'a> {
    config: &'a NotifyConfig,
}

impl<'a> NotificationPolicy<'a> {
    pub fn new(config: &'a NotifyConfig) -> Self {
        Self { config }
    }

    /// 评估一次生命周期事件，返回零或一个通知意图
    pub fn evaluate(
        &self,
        event: LifecycleEvent,
        build: &BuildRecord,
        history: &dyn BuildHistory,
    ) -> Option<NotificationIntent> {
        match event {
            LifecycleEvent::Started => Some(self.on_started(build)),
            LifecycleEvent::Completed => self.on_completed(build, history),
        }
    }

    fn on_started(&self, build: &BuildRecord) -> NotificationIntent {
        // 非 SCM 的触发原因直接展示描述；SCM 触发或无原因时展示变更集
        let summarize_changes = !matches!(
            build.cause,
            Some(CauseInfo::Manual { .. }) | Some(CauseInfo::Upstream { .. })
        );
        debug!(
            project = %build.project,
            build = build.number,
            summarize_changes,
            "Build started, emitting start intent"
        );
        NotificationIntent {
            kind: IntentKind::Started { summarize_changes },
            include_test_summary: false,
            include_custom_message: self.config.include_custom_message,
            include_commit_list: false,
            triggers: Vec::new(),
        }
    }

    fn on_completed(
        &self,
        build: &BuildRecord,
        history: &dyn BuildHistory,
    ) -> Option<NotificationIntent> {
        if build.is_building() {
            debug!(project = %build.project, build = build.number, "Build still running, skipping");
            return None;
        }

        let previous = history.previous_completed_result(build);
        let triggers = self.matching_triggers(build.outcome, previous);

        if triggers.is_empty() {
            debug!(
                project = %build.project,
                build = build.number,
                outcome = %build.outcome,
                previous = %previous,
                "No notification trigger matched"
            );
            return None;
        }

        debug!(
            project = %build.project,
            build = build.number,
            outcome = %build.outcome,
            previous = %previous,
            ?triggers,
            "Build completed, emitting completion intent"
        );

        Some(NotificationIntent {
            kind: IntentKind::Completed,
            include_test_summary: self.config.include_test_summary,
            include_custom_message: self.config.include_custom_message,
            include_commit_list: self.config.commit_info_choice.show_anything(),
            triggers,
        })
    }

    /// 计算所有命中的触发条件（已按配置过滤）
    pub fn matching_triggers(&self, outcome: BuildOutcome, previous: BuildOutcome) -> Vec<Trigger> {
        let config = self.config;
        let candidates = [
            (
                Trigger::Aborted,
                outcome == BuildOutcome::Aborted && config.notify_aborted,
            ),
            (
                Trigger::FirstFailure,
                outcome == BuildOutcome::Failure
                    && previous != BuildOutcome::Failure
                    && config.notify_failure,
            ),
            (
                Trigger::RepeatedFailure,
                outcome == BuildOutcome::Failure
                    && previous == BuildOutcome::Failure
                    && config.notify_repeated_failure,
            ),
            (
                Trigger::NotBuilt,
                outcome == BuildOutcome::NotBuilt && config.notify_not_built,
            ),
            (
                Trigger::BackToNormal,
                outcome == BuildOutcome::Success
                    && matches!(previous, BuildOutcome::Failure | BuildOutcome::Unstable)
                    && config.notify_back_to_normal,
            ),
            (
                Trigger::Success,
                outcome == BuildOutcome::Success && config.notify_success,
            ),
            (
                Trigger::Unstable,
                outcome == BuildOutcome::Unstable && config.notify_unstable,
            ),
        ];

        candidates
            .into_iter()
            .filter_map(|(trigger, hit)| hit.then_some(trigger))
            .collect()
    }
}
