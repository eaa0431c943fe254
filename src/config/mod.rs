use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{AdvisorError, AdvisorResult};

/// 反馈循环开关
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FeedbackConfig {
    /// 是否启用反馈（关闭时整个核心被绕过，无任何副作用）
    pub enabled: bool,
    /// 安静模式：只做持久化，不输出指令文本
    pub quiet: bool,
    /// 规划器协作方是否可以读取活动提示
    pub apply_hints: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            quiet: false,
            apply_hints: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "data/plan_repo.redb".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "plan_advisor".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub feedback: FeedbackConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> AdvisorResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.storage.path = Config::resolve_storage_path(&config.storage.path)?;
        Ok(config)
    }

    /// 文件不存在时使用默认配置
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> AdvisorResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let mut config = Config::default();
            config.storage.path = Config::resolve_storage_path(&config.storage.path)?;
            Ok(config)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> AdvisorResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn resolve_storage_path(storage_path: &str) -> AdvisorResult<String> {
        let path = PathBuf::from(storage_path);

        if path.is_absolute() {
            return Ok(storage_path.to_string());
        }

        if let Some(relative_path) = storage_path.strip_prefix('~') {
            #[allow(deprecated)]
            let home_dir = env::home_dir()
                .ok_or_else(|| AdvisorError::Config("无法获取用户主目录".to_string()))?;
            let relative_path = relative_path.trim_start_matches(['/', '\\']);
            return Ok(home_dir.join(relative_path).to_string_lossy().into_owned());
        }

        let cwd = env::current_dir()?;
        Ok(cwd.join(&path).to_string_lossy().into_owned())
    }
}
