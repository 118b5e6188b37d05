//! 远程版本列表（go.dev/dl JSON 格式）
//!
//! 数据格式：`[{"version": "go1.21.0", "files": [{"filename", "os", "arch", "kind", "sha256"}]}]`

use crate::core::version::{self, MinorVersion, Version};
use crate::error::{AppError, AppResult};
use crate::infrastructure::remote::deadline::Deadline;
use crate::infrastructure::remote::http_client::HttpClient;
use crate::infrastructure::remote::platform::Platform;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// 文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Archive,
    Installer,
    Source,
    #[serde(other)]
    Other,
}

/// 单个平台文件描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub filename: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
    pub kind: FileKind,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub sha256: Option<String>,
}

impl FileDescriptor {
    /// 是否为指定平台可用的安装包
    pub fn is_archive_for(&self, platform: &Platform) -> bool {
        self.kind == FileKind::Archive && self.os == platform.os && self.arch == platform.arch
    }
}

/// 版本列表中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub version: String,
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

impl CatalogEntry {
    /// 该版本在指定平台上的安装包
    pub fn archive_for(&self, platform: &Platform) -> Option<&FileDescriptor> {
        self.files.iter().find(|f| f.is_archive_for(platform))
    }

    /// 是否为正式发布版本（`go1.N.P`）
    pub fn is_release(&self) -> bool {
        version::is_release_name(&self.version)
    }
}

/// 解码后的版本列表，保持远程返回的顺序（通常新版本在前）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// 查找指定版本在当前平台的安装包
    ///
    /// 先按版本名精确匹配，再按规范化后的三元组匹配，这样 `1.20` 也能找到
    /// `go1.20`。这里不校验版本名格式，以兼容命名较宽松的镜像源。
    pub fn find_file(&self, requested: &str, platform: &Platform) -> AppResult<&FileDescriptor> {
        let exact = format!("go{}", version::strip_prefix(requested));
        let wanted = Version::normalize(requested);

        self.entries
            .iter()
            .filter(|e| e.version == exact)
            .chain(
                self.entries
                    .iter()
                    .filter(|e| e.version != exact && Version::normalize(&e.version) == wanted),
            )
            .find_map(|e| e.archive_for(platform))
            .ok_or_else(|| AppError::NotFoundInCatalog {
                version: version::strip_prefix(requested).to_string(),
                platform: platform.to_string(),
            })
    }

    /// 所有正式发布版本（去掉 `go` 前缀）
    pub fn release_versions(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.is_release())
            .map(|e| version::strip_prefix(&e.version))
    }

    /// 列出前 `n` 个正式版本
    pub fn list(&self, n: usize) -> Vec<String> {
        self.release_versions().take(n).map(str::to_string).collect()
    }

    /// 按前缀搜索正式版本，`limit` 为 0 表示不限
    pub fn search(&self, prefix: &str, limit: usize) -> Vec<String> {
        let wanted = format!("{}.", version::strip_prefix(prefix));
        let matches = self
            .release_versions()
            .filter(|v| v.starts_with(&wanted))
            .map(str::to_string);

        if limit > 0 {
            matches.take(limit).collect()
        } else {
            matches.collect()
        }
    }

    /// 某个次版本在当前平台可安装的最新补丁版本
    pub fn latest_patch(&self, minor: MinorVersion, platform: &Platform) -> Option<String> {
        self.entries
            .iter()
            .filter(|e| e.is_release() && minor.contains(&e.version))
            .filter(|e| e.archive_for(platform).is_some())
            .map(|e| version::strip_prefix(&e.version))
            .max_by(|a, b| version::compare(a, b))
            .map(str::to_string)
    }
}

/// 版本列表来源
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_all(&self, deadline: &Deadline) -> AppResult<Catalog>;
}

/// 通过 HTTP 获取版本列表，不做跨进程缓存
pub struct CatalogClient {
    http: HttpClient,
    url: String,
}

impl CatalogClient {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_all(&self, deadline: &Deadline) -> AppResult<Catalog> {
        let entries: Vec<CatalogEntry> = self.http.get_json(&self.url, deadline).await?;
        debug!(url = %self.url, entries = entries.len(), "fetched catalog");
        Ok(Catalog::new(entries))
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
