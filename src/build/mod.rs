//! 构建数据模型 - 构建记录、结果、触发原因、变更集
//!
//! 所有数据由外部构建系统提供，本模块只读。

pub mod env;
pub mod history;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use env::{expand_environment, BuildEnvironment, EnvironmentProvider};
pub use history::{BuildHistory, InMemoryHistory};

/// 构建结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildOutcome {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    /// 仍在运行（只在构建未结束时有效）
    Building,
    Unknown,
}

impl BuildOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildOutcome::Success => "SUCCESS",
            BuildOutcome::Failure => "FAILURE",
            BuildOutcome::Unstable => "UNSTABLE",
            BuildOutcome::Aborted => "ABORTED",
            BuildOutcome::NotBuilt => "NOT_BUILT",
            BuildOutcome::Building => "BUILDING",
            BuildOutcome::Unknown => "UNKNOWN",
        }
    }

    pub fn is_building(&self) -> bool {
        matches!(self, BuildOutcome::Building)
    }
}

impl std::fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 构建触发原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CauseInfo {
    /// 手动触发或其他原因（携带原始描述）
    Manual { description: String },
    /// SCM 轮询/推送触发
    ScmTrigger,
    /// 上游项目构建完成后触发
    Upstream { project: String, build: u32 },
}

impl CauseInfo {
    /// 触发原因的简短描述
    pub fn short_description(&self) -> String {
        match self {
            CauseInfo::Manual { description } => description.clone(),
            CauseInfo::ScmTrigger => "Started by an SCM change".to_string(),
            CauseInfo::Upstream { project, build } => {
                format!("Started by upstream project \"{}\" build number {}", project, build)
            }
        }
    }
}

/// 变更集条目（一次提交）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetEntry {
    /// 作者显示名
    pub author: String,
    /// 提交信息
    pub message: String,
    /// 受影响的文件
    #[serde(default)]
    pub affected_files: BTreeSet<String>,
}

impl ChangeSetEntry {
    pub fn new(author: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            message: message.into(),
            affected_files: BTreeSet::new(),
        }
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_files.extend(files.into_iter().map(Into::into));
        self
    }
}

/// 测试结果汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl TestSummary {
    pub fn new(total: u32, failed: u32, skipped: u32) -> Self {
        Self { total, failed, skipped }
    }

    /// 通过数 = 总数 - 失败 - 跳过（不小于 0）
    pub fn passed(&self) -> u32 {
        self.total.saturating_sub(self.failed).saturating_sub(self.skipped)
    }
}

/// 一次构建执行的只读记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// 项目名（历史查找的 key）
    pub project: String,
    /// 项目完整显示名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_display_name: Option<String>,
    /// 构建号
    pub number: u32,
    /// 构建显示名（默认 `#<number>`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub outcome: BuildOutcome,
    pub started_at: DateTime<Utc>,
    /// 构建耗时（毫秒）
    #[serde(default)]
    pub duration_ms: u64,
    /// 相对于构建服务器根地址的 URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<CauseInfo>,
    /// 变更集；None 表示尚未计算
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_set: Option<Vec<ChangeSetEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_summary: Option<TestSummary>,
    /// 构建环境变量
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl BuildRecord {
    pub fn new(
        project: impl Into<String>,
        number: u32,
        outcome: BuildOutcome,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            project: project.into(),
            project_display_name: None,
            number,
            display_name: None,
            outcome,
            started_at,
            duration_ms,
            url: None,
            cause: None,
            change_set: None,
            test_summary: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_cause(mut self, cause: CauseInfo) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn with_change_set(mut self, entries: Vec<ChangeSetEntry>) -> Self {
        self.change_set = Some(entries);
        self
    }

    pub fn with_test_summary(mut self, summary: TestSummary) -> Self {
        self.test_summary = Some(summary);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn display_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| format!("#{}", self.number))
    }

    pub fn project_display_name(&self) -> &str {
        self.project_display_name.as_deref().unwrap_or(&self.project)
    }

    pub fn relative_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("job/{}/{}/", self.project, self.number))
    }

    pub fn is_building(&self) -> bool {
        self.outcome.is_building()
    }

    /// 构建耗时；超出时长可表示范围时取最大值
    pub fn duration(&self) -> Duration {
        i64::try_from(self.duration_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .unwrap_or(Duration::MAX)
    }

    /// 结束时间；溢出日期范围时退回开始时间
    pub fn ended_at(&self) -> DateTime<Utc> {
        self.started_at
            .checked_add_signed(self.duration())
            .unwrap_or(self.started_at)
    }

    pub fn has_change_set_computed(&self) -> bool {
        self.change_set.is_some()
    }

    /// 变更集条目；未计算时为空
    pub fn change_set_entries(&self) -> &[ChangeSetEntry] {
        self.change_set.as_deref().unwrap_or(&[])
    }
}
