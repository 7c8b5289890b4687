//! 通知配置 - 从 JSON 配置文件和环境变量加载

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "BUILD_NOTIFIER_CONFIG";
/// Webhook 地址覆盖
pub const WEBHOOK_URL_ENV: &str = "BUILD_NOTIFIER_WEBHOOK_URL";
/// 构建服务器根地址覆盖
pub const SERVER_URL_ENV: &str = "BUILD_SERVER_URL";

/// 提交列表显示内容
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitInfoChoice {
    #[default]
    None,
    Author,
    Title,
    Both,
}

impl CommitInfoChoice {
    pub fn show_title(&self) -> bool {
        matches!(self, CommitInfoChoice::Title | CommitInfoChoice::Both)
    }

    pub fn show_author(&self) -> bool {
        matches!(self, CommitInfoChoice::Author | CommitInfoChoice::Both)
    }

    pub fn show_anything(&self) -> bool {
        self.show_title() || self.show_author()
    }
}

/// 聊天 Webhook 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransportConfig {
    /// Incoming webhook 地址；为空时不注册 webhook 渠道
    pub webhook_url: String,
    /// 目标频道（如 `#builds`）
    pub channel: Option<String>,
    /// 显示的发送者名称
    pub username: Option<String>,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
    /// 是否使用系统代理（HTTP_PROXY 等）
    pub use_system_proxy: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            channel: None,
            username: None,
            timeout_secs: 30,
            use_system_proxy: true,
        }
    }
}

/// 通知配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotifyConfig {
    pub notify_aborted: bool,
    pub notify_failure: bool,
    pub notify_repeated_failure: bool,
    pub notify_not_built: bool,
    pub notify_back_to_normal: bool,
    pub notify_success: bool,
    pub notify_unstable: bool,
    pub include_test_summary: bool,
    pub include_custom_message: bool,
    pub commit_info_choice: CommitInfoChoice,
    pub custom_message: String,
    /// 展开自定义消息时是否合并进程环境变量
    pub include_process_env: bool,
    /// 构建服务器根地址（以 `/` 结尾）
    pub build_server_url: String,
    pub transport: TransportConfig,
    /// 投递日志（JSONL）；设置后注册本地文件渠道
    pub log_file: Option<PathBuf>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            notify_aborted: false,
            notify_failure: true,
            notify_repeated_failure: false,
            notify_not_built: false,
            notify_back_to_normal: true,
            notify_success: false,
            notify_unstable: false,
            include_test_summary: false,
            include_custom_message: false,
            commit_info_choice: CommitInfoChoice::None,
            custom_message: String::new(),
            include_process_env: false,
            build_server_url: String::new(),
            transport: TransportConfig::default(),
            log_file: None,
        }
    }
}

impl NotifyConfig {
    /// 默认配置文件路径 ~/.config/build-notifier/config.json
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/build-notifier/config.json"))
    }

    /// 按优先级加载配置：显式路径 > 环境变量指定路径 > 默认路径 > 默认值，
    /// 之后应用环境变量覆盖
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::load_from(&path)?,
            Some(path) if explicit.is_some() => {
                anyhow::bail!("Config file not found: {}", path.display())
            }
            _ => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// 从指定文件加载
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!(path = %path.display(), "Loaded notifier config");
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(WEBHOOK_URL_ENV) {
            if !url.is_empty() {
                debug!("Using webhook url from {}", WEBHOOK_URL_ENV);
                self.transport.webhook_url = url;
            }
        }
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.is_empty() {
                debug!("Using build server url from {}", SERVER_URL_ENV);
                self.build_server_url = url;
            }
        }
    }
}
