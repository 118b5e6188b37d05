use crate::core::constants::{download, store};
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 下载源提供者，核心模块只通过它读取下载地址
pub trait SourceProvider {
    /// 安装包下载源（基础 URL）
    fn download_source(&self) -> String;
    /// 版本列表 JSON 地址
    fn download_source_json(&self) -> String;
}

/// 配置文件结构（`<root>/config.json`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub download_source: String,
    #[serde(default)]
    pub download_source_json: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_source: download::DEFAULT_SOURCE.to_string(),
            download_source_json: download::DEFAULT_SOURCE_JSON.to_string(),
        }
    }
}

impl Config {
    /// 从版本目录加载配置，文件不存在时返回默认配置
    pub fn load(root: &Path) -> AppResult<Self> {
        let path = config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| AppError::config(format!("解析配置文件 {} 失败: {e}", path.display())))?;
        config.fill_defaults();
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, root: &Path) -> AppResult<()> {
        let path = config_path(root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::config(format!("序列化配置失败: {e}")))?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// 重置为默认配置并保存
    pub fn reset(root: &Path) -> AppResult<Self> {
        let config = Self::default();
        config.save(root)?;
        Ok(config)
    }

    /// 设置下载源，校验 URL 格式
    pub fn set_download_source(&mut self, source: &str) -> AppResult<()> {
        validate_url(source)?;
        self.download_source = source.to_string();
        Ok(())
    }

    /// 设置版本列表地址，校验 URL 格式
    pub fn set_download_source_json(&mut self, source: &str) -> AppResult<()> {
        validate_url(source)?;
        self.download_source_json = source.to_string();
        Ok(())
    }

    fn fill_defaults(&mut self) {
        let defaults = Self::default();
        if self.download_source.trim().is_empty() {
            self.download_source = defaults.download_source;
        }
        if self.download_source_json.trim().is_empty() {
            self.download_source_json = defaults.download_source_json;
        }
    }
}

impl SourceProvider for Config {
    fn download_source(&self) -> String {
        self.download_source.clone()
    }

    fn download_source_json(&self) -> String {
        self.download_source_json.clone()
    }
}

/// 获取配置文件路径
pub fn config_path(root: &Path) -> PathBuf {
    root.join(store::CONFIG_FILE_NAME)
}

/// 获取版本目录根路径：优先 `$GVM_ROOT`，否则 `~/.gvm`
pub fn default_root() -> AppResult<PathBuf> {
    if let Some(root) = std::env::var_os(store::ROOT_ENV_VAR).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    dirs::home_dir()
        .map(|home| home.join(store::ROOT_DIR_NAME))
        .ok_or_else(|| AppError::config("无法获取用户主目录"))
}

fn validate_url(source: &str) -> AppResult<()> {
    url::Url::parse(source)
        .map(|_| ())
        .map_err(|e| AppError::config(format!("无效的 URL {source}: {e}")))
}
