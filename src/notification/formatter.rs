//! 消息格式化模块 - 将构建记录渲染为聊天消息
//!
//! 主要功能：
//! - 状态标签（Back to normal / Still Failing / ...）
//! - 耗时、打开链接、测试汇总、自定义消息
//! - 变更集摘要和提交列表
//!
//! 所有渲染函数都是纯函数，返回新字符串；外部输入的文本统一经过 `escape`。

use chrono::Duration;
use std::collections::HashSet;
use tracing::debug;

use super::channel::MessageKind;
use super::config::NotifyConfig;
use super::duration::format_time_span;
use super::policy::{IntentKind, NotificationIntent};
use crate::build::{BuildHistory, BuildOutcome, BuildRecord, CauseInfo, EnvironmentProvider};

/// 没有任何变更时的提交列表
pub const NO_CHANGES: &str = "No Changes.";

/// 状态标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    Starting,
    Finished,
    BackToNormal,
    StillFailing,
    Success,
    Failure,
    Aborted,
    NotBuilt,
    Unstable,
    Unknown,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Starting => "Starting...",
            StatusLabel::Finished => "Finished",
            StatusLabel::BackToNormal => "Back to normal",
            StatusLabel::StillFailing => "Still Failing",
            StatusLabel::Success => "Success",
            StatusLabel::Failure => "Failure",
            StatusLabel::Aborted => "Aborted",
            StatusLabel::NotBuilt => "Not built",
            StatusLabel::Unstable => "Unstable",
            StatusLabel::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 转义 `&`、`<`、`>`（按此顺序替换）
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 计算状态标签，按优先级匹配
pub fn status_label(build: &BuildRecord, history: &dyn BuildHistory, finished: bool) -> StatusLabel {
    if build.is_building() {
        return if finished {
            StatusLabel::Finished
        } else {
            StatusLabel::Starting
        };
    }

    let previous = history.previous_result(build);
    let had_prior_success = history.previous_successful(build).is_some();

    match (build.outcome, previous) {
        (BuildOutcome::Success, BuildOutcome::Failure | BuildOutcome::Unstable) if had_prior_success => {
            StatusLabel::BackToNormal
        }
        (BuildOutcome::Failure, BuildOutcome::Failure) => StatusLabel::StillFailing,
        (BuildOutcome::Success, _) => StatusLabel::Success,
        (BuildOutcome::Failure, _) => StatusLabel::Failure,
        (BuildOutcome::Aborted, _) => StatusLabel::Aborted,
        (BuildOutcome::NotBuilt, _) => StatusLabel::NotBuilt,
        (BuildOutcome::Unstable, _) => StatusLabel::Unstable,
        (BuildOutcome::Building | BuildOutcome::Unknown, _) => StatusLabel::Unknown,
    }
}

/// 从上一次成功构建结束到本次构建结束的时长
pub fn back_to_normal_duration(build: &BuildRecord, history: &dyn BuildHistory) -> Option<Duration> {
    history
        .previous_successful(build)
        .map(|success| build.ended_at() - success.ended_at())
}

/// 渲染结果（一条待发送的消息）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub kind: MessageKind,
    pub content: String,
}

/// 消息格式化器
pub struct MessageFormatter<'a> {
    config: &'a NotifyConfig,
    history: &'a dyn BuildHistory,
    environment: &'a dyn EnvironmentProvider,
}

impl<'a> MessageFormatter<'a> {
    pub fn new(
        config: &'a NotifyConfig,
        history: &'a dyn BuildHistory,
        environment: &'a dyn EnvironmentProvider,
    ) -> Self {
        Self {
            config,
            history,
            environment,
        }
    }

    /// 按意图渲染所有消息
    pub fn compose(&self, intent: &NotificationIntent, build: &BuildRecord) -> Vec<ComposedMessage> {
        match intent.kind {
            IntentKind::Started { summarize_changes } => {
                let content = match (&build.cause, summarize_changes) {
                    (Some(cause), false) => self.render_start_message(build, cause),
                    _ => self
                        .render_change_set_summary(build, intent.include_custom_message)
                        .unwrap_or_else(|| {
                            self.render_status_message(build, false, false, intent.include_custom_message)
                        }),
                };
                vec![ComposedMessage {
                    kind: MessageKind::Start,
                    content,
                }]
            }
            IntentKind::Completed => {
                let mut messages = vec![ComposedMessage {
                    kind: MessageKind::Status,
                    content: self.render_status_message(
                        build,
                        true,
                        intent.include_test_summary,
                        intent.include_custom_message,
                    ),
                }];
                if intent.include_commit_list {
                    messages.push(ComposedMessage {
                        kind: MessageKind::CommitList,
                        content: self.render_commit_list(build),
                    });
                }
                messages
            }
        }
    }

    /// `"<项目> - <构建> "`
    pub fn header(&self, build: &BuildRecord) -> String {
        format!(
            "{} - {} ",
            escape(build.project_display_name()),
            escape(&build.display_name())
        )
    }

    /// `" (<url|Open>)"`
    pub fn open_link(&self, build: &BuildRecord) -> String {
        format!(" (<{}{}|Open>)", self.config.build_server_url, build.relative_url())
    }

    /// `" after <时长>"`；Back to normal 时使用距上一次成功的时长
    pub fn duration_suffix(&self, build: &BuildRecord, label: StatusLabel) -> String {
        let span = match label {
            StatusLabel::BackToNormal => back_to_normal_duration(build, self.history),
            _ => None,
        }
        .unwrap_or_else(|| build.duration());
        format!(" after {}", format_time_span(span))
    }

    pub fn test_summary_block(&self, build: &BuildRecord) -> String {
        match build.test_summary {
            Some(summary) => format!(
                "\nTest Status:\n\tPassed: {}, Failed: {}, Skipped: {}",
                summary.passed(),
                summary.failed,
                summary.skipped
            ),
            None => "\nNo Tests found.".to_string(),
        }
    }

    pub fn custom_message_block(&self, build: &BuildRecord) -> String {
        let expanded = self.environment.expand(build, &self.config.custom_message);
        format!("\n{}", escape(&expanded))
    }

    /// 构建状态消息：标题 + 状态 + 耗时 + 链接 [+ 测试汇总] [+ 自定义消息]
    pub fn render_status_message(
        &self,
        build: &BuildRecord,
        finished: bool,
        include_test_summary: bool,
        include_custom_message: bool,
    ) -> String {
        let label = status_label(build, self.history, finished);

        let mut message = self.header(build);
        message.push_str(&escape(label.as_str()));
        message.push_str(&self.duration_suffix(build, label));
        message.push_str(&self.open_link(build));
        if include_test_summary {
            message.push_str(&self.test_summary_block(build));
        }
        if include_custom_message {
            message.push_str(&self.custom_message_block(build));
        }
        message
    }

    /// 非 SCM 触发的开始消息：标题 + 触发原因 + 链接
    pub fn render_start_message(&self, build: &BuildRecord, cause: &CauseInfo) -> String {
        format!(
            "{}{}{}",
            self.header(build),
            escape(&cause.short_description()),
            self.open_link(build)
        )
    }

    /// 变更集摘要；未计算或为空时返回 None
    pub fn render_change_set_summary(
        &self,
        build: &BuildRecord,
        include_custom_message: bool,
    ) -> Option<String> {
        if !build.has_change_set_computed() {
            debug!(project = %build.project, build = build.number, "No change set computed");
            return None;
        }
        let entries = build.change_set_entries();
        if entries.is_empty() {
            debug!(project = %build.project, build = build.number, "Empty change set");
            return None;
        }

        let authors = unique(entries.iter().map(|e| e.author.clone()));
        let files: HashSet<&str> = entries
            .iter()
            .flat_map(|e| e.affected_files.iter().map(String::as_str))
            .collect();

        let mut message = self.header(build);
        message.push_str(&escape(&format!(
            "Started by changes from {} ({} file(s) changed)",
            authors.join(", "),
            files.len()
        )));
        message.push_str(&self.open_link(build));
        if include_custom_message {
            message.push_str(&self.custom_message_block(build));
        }
        Some(message)
    }

    /// 提交列表。变更集为空时沿上游原因递归查找。
    pub fn render_commit_list(&self, build: &BuildRecord) -> String {
        let mut visited = HashSet::new();
        self.commit_list_inner(build, &mut visited)
    }

    fn commit_list_inner(&self, build: &BuildRecord, visited: &mut HashSet<(String, u32)>) -> String {
        if !visited.insert((build.project.clone(), build.number)) {
            debug!(project = %build.project, build = build.number, "Upstream cycle detected");
            return NO_CHANGES.to_string();
        }

        let entries = build.change_set_entries();
        if entries.is_empty() {
            let Some(CauseInfo::Upstream { project, build: number }) = &build.cause else {
                return NO_CHANGES.to_string();
            };
            return match self.history.build(project, *number) {
                Some(upstream) => {
                    debug!(upstream = %project, number, "Following upstream build for commit list");
                    self.commit_list_inner(upstream, visited)
                }
                None => {
                    debug!(upstream = %project, number, "Upstream build not found");
                    NO_CHANGES.to_string()
                }
            };
        }

        // 相同文本的提交会被合并（保留首次出现顺序）
        let choice = self.config.commit_info_choice;
        let commits = unique(entries.iter().map(|entry| {
            let mut commit = String::new();
            if choice.show_title() {
                commit.push_str(&entry.message);
            }
            if choice.show_author() {
                commit.push_str(&format!(" [{}]", entry.author));
            }
            commit
        }));

        let mut message = self.header(build);
        message.push_str(&escape(&format!("Changes:\n- {}", commits.join("\n- "))));
        message
    }
}

/// 去重并保留首次出现顺序
fn unique<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
