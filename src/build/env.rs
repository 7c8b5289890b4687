//! 构建环境变量与模板展开

use anyhow::Result;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::error;

use super::BuildRecord;

/// 构建环境提供者
pub trait EnvironmentProvider: Send + Sync {
    /// 获取构建的环境变量
    fn environment(&self, build: &BuildRecord) -> Result<BTreeMap<String, String>>;

    /// 用构建环境展开模板。
    /// 获取环境失败时记录错误并按空环境展开，不中断渲染。
    fn expand(&self, build: &BuildRecord, template: &str) -> String {
        let vars = match self.environment(build) {
            Ok(vars) => vars,
            Err(e) => {
                error!(
                    project = %build.project,
                    build = build.number,
                    error = %e,
                    "Failed to resolve build environment"
                );
                BTreeMap::new()
            }
        };
        expand_environment(template, &vars)
    }
}

/// 默认环境：构建基础变量 + 记录自带的 env（可选合并进程环境）
#[derive(Debug, Clone, Default)]
pub struct BuildEnvironment {
    server_url: String,
    include_process_env: bool,
}

impl BuildEnvironment {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            include_process_env: false,
        }
    }

    /// 是否合并当前进程的环境变量（优先级最低）
    pub fn with_process_env(mut self, include: bool) -> Self {
        self.include_process_env = include;
        self
    }
}

impl EnvironmentProvider for BuildEnvironment {
    fn environment(&self, build: &BuildRecord) -> Result<BTreeMap<String, String>> {
        let mut vars = BTreeMap::new();
        if self.include_process_env {
            vars.extend(std::env::vars());
        }
        vars.insert("JOB_NAME".to_string(), build.project.clone());
        vars.insert("BUILD_NUMBER".to_string(), build.number.to_string());
        vars.insert("BUILD_DISPLAY_NAME".to_string(), build.display_name());
        vars.insert(
            "BUILD_URL".to_string(),
            format!("{}{}", self.server_url, build.relative_url()),
        );
        vars.extend(build.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(vars)
    }
}

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .expect("env var pattern is valid")
    })
}

/// 展开 `$VAR` 和 `${VAR}`；未知变量保持原样
pub fn expand_environment(template: &str, vars: &BTreeMap<String, String>) -> String {
    var_pattern()
        .replace_all(template, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match vars.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
