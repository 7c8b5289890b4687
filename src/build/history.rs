//! 构建历史查找
//!
//! 历史链通过显式查找接口访问，而不是记录之间互相持有引用。
//! `InMemoryHistory` 按项目保存记录，并按构建号排序。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::{BuildOutcome, BuildRecord};

/// 构建历史提供者
pub trait BuildHistory {
    /// 按项目名和构建号查找
    fn build(&self, project: &str, number: u32) -> Option<&BuildRecord>;

    /// 项目的最新构建
    fn last_build(&self, project: &str) -> Option<&BuildRecord>;

    /// 同一项目中的上一次构建
    fn previous(&self, build: &BuildRecord) -> Option<&BuildRecord>;

    /// 上一次已结束的构建（跳过仍在运行的）
    fn previous_completed(&self, build: &BuildRecord) -> Option<&BuildRecord> {
        let mut current = self.previous(build);
        while let Some(candidate) = current {
            if !candidate.is_building() {
                return Some(candidate);
            }
            current = self.previous(candidate);
        }
        None
    }

    /// 上一次成功的构建
    fn previous_successful(&self, build: &BuildRecord) -> Option<&BuildRecord> {
        let mut current = self.previous(build);
        while let Some(candidate) = current {
            if candidate.outcome == BuildOutcome::Success {
                return Some(candidate);
            }
            current = self.previous(candidate);
        }
        None
    }

    /// 沿 `previous` 链跳过 Aborted，返回第一个非 Aborted 的结果。
    /// 链为空或全部为 Aborted 时返回 Success。
    fn previous_result(&self, build: &BuildRecord) -> BuildOutcome {
        let mut current = self.previous(build);
        while let Some(candidate) = current {
            if candidate.outcome != BuildOutcome::Aborted {
                return candidate.outcome;
            }
            current = self.previous(candidate);
        }
        BuildOutcome::Success
    }

    /// 同 `previous_result`，但只看已结束的构建
    fn previous_completed_result(&self, build: &BuildRecord) -> BuildOutcome {
        let mut current = self.previous_completed(build);
        while let Some(candidate) = current {
            if candidate.outcome != BuildOutcome::Aborted {
                return candidate.outcome;
            }
            current = self.previous_completed(candidate);
        }
        BuildOutcome::Success
    }
}

/// 历史文件中的单个项目
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectHistory {
    pub name: String,
    #[serde(default)]
    pub builds: Vec<BuildRecord>,
}

/// 历史文件格式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFile {
    #[serde(default)]
    pub projects: Vec<ProjectHistory>,
}

/// 内存中的构建历史（按项目、构建号索引）
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    projects: HashMap<String, BTreeMap<u32, BuildRecord>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一条记录；同号记录会被替换
    pub fn insert(&mut self, record: BuildRecord) {
        self.projects
            .entry(record.project.clone())
            .or_default()
            .insert(record.number, record);
    }

    pub fn with_build(mut self, record: BuildRecord) -> Self {
        self.insert(record);
        self
    }

    /// 从 JSON 历史文件加载
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read history file {}", path.display()))?;
        let file: HistoryFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse history file {}", path.display()))?;
        Ok(Self::from(file))
    }
}

impl From<HistoryFile> for InMemoryHistory {
    fn from(file: HistoryFile) -> Self {
        let mut history = Self::new();
        for project in file.projects {
            debug!(project = %project.name, builds = project.builds.len(), "Loading project history");
            for mut build in project.builds {
                // 文件里的项目名以外层为准
                build.project = project.name.clone();
                history.insert(build);
            }
        }
        history
    }
}

impl BuildHistory for InMemoryHistory {
    fn build(&self, project: &str, number: u32) -> Option<&BuildRecord> {
        self.projects.get(project)?.get(&number)
    }

    fn last_build(&self, project: &str) -> Option<&BuildRecord> {
        self.projects.get(project)?.values().next_back()
    }

    fn previous(&self, build: &BuildRecord) -> Option<&BuildRecord> {
        self.projects
            .get(&build.project)?
            .range(..build.number)
            .next_back()
            .map(|(_, record)| record)
    }
}
