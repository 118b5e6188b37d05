//! 安装流程：解析 → 下载 → 校验 → 解压 → 提交
//!
//! 解压总是进入根目录下的临时暂存目录，最后用一次 rename 把 `go/` 移到
//! `<root>/go<version>`。任何阶段失败都不会留下最终目录。

use crate::core::constants::{network, store};
use crate::core::version::{self, Version};
use crate::environments::go::store::VersionStore;
use crate::error::{AppError, AppResult};
use crate::infrastructure::installer::{self, Verification};
use crate::infrastructure::remote::{
    ArchiveFetcher, Catalog, CatalogSource, Deadline, DownloadProgress, FileDescriptor, Platform,
};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 安装阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Resolving,
    Downloading,
    Verifying,
    Extracting,
    Committing,
    Done,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStage::Resolving => "resolving",
            InstallStage::Downloading => "downloading",
            InstallStage::Verifying => "verifying",
            InstallStage::Extracting => "extracting",
            InstallStage::Committing => "committing",
            InstallStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// 安装成功但可信度或清理存在问题的情况
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallWarning {
    /// 版本列表查询失败，使用推测的文件名
    CatalogLookupFailed { reason: String },
    /// 没有可用的校验和，跳过了完整性校验
    ChecksumUnavailable { filename: String },
    /// 安装包删除失败
    ArchiveCleanupFailed { path: PathBuf, reason: String },
}

impl fmt::Display for InstallWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallWarning::CatalogLookupFailed { reason } => {
                write!(f, "未能从版本列表解析安装包，已按命名规则推测文件名: {reason}")
            }
            InstallWarning::ChecksumUnavailable { filename } => {
                write!(f, "{filename} 没有校验和，已跳过完整性校验")
            }
            InstallWarning::ArchiveCleanupFailed { path, reason } => {
                write!(f, "删除安装包 {} 失败: {reason}", path.display())
            }
        }
    }
}

/// 安装结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub version: Version,
    pub path: PathBuf,
    pub warnings: Vec<InstallWarning>,
}

/// 组合版本列表、下载、校验与解压的安装器
pub struct InstallOrchestrator<'a> {
    store: &'a VersionStore,
    catalog: &'a dyn CatalogSource,
    fetcher: &'a ArchiveFetcher,
    download_source: String,
    platform: Platform,
    catalog_timeout: Duration,
}

impl<'a> InstallOrchestrator<'a> {
    pub fn new(
        store: &'a VersionStore,
        catalog: &'a dyn CatalogSource,
        fetcher: &'a ArchiveFetcher,
        download_source: impl Into<String>,
        platform: Platform,
    ) -> Self {
        Self {
            store,
            catalog,
            fetcher,
            download_source: download_source.into(),
            platform,
            catalog_timeout: Duration::from_secs(network::CATALOG_TIMEOUT_SECS),
        }
    }

    /// 版本列表查询的超时时间
    pub fn with_catalog_timeout(mut self, timeout: Duration) -> Self {
        self.catalog_timeout = timeout;
        self
    }

    /// 安装指定版本，调用方需持有目录锁
    pub async fn install<F>(
        &self,
        requested: &str,
        deadline: &Deadline,
        on_progress: F,
    ) -> AppResult<InstallReport>
    where
        F: FnMut(DownloadProgress),
    {
        let version = self.prepare(requested)?;
        let lookup = deadline.limited(self.catalog_timeout);
        let resolved = self
            .catalog
            .fetch_all(&lookup)
            .await
            .and_then(|catalog| catalog.find_file(requested, &self.platform).cloned());
        self.install_resolved(requested, version, resolved, deadline, on_progress)
            .await
    }

    /// 使用已获取的版本列表安装，不再重复请求
    pub async fn install_from<F>(
        &self,
        catalog: &Catalog,
        requested: &str,
        deadline: &Deadline,
        on_progress: F,
    ) -> AppResult<InstallReport>
    where
        F: FnMut(DownloadProgress),
    {
        let version = self.prepare(requested)?;
        let resolved = catalog.find_file(requested, &self.platform).cloned();
        self.install_resolved(requested, version, resolved, deadline, on_progress)
            .await
    }

    fn prepare(&self, requested: &str) -> AppResult<Version> {
        let version = Version::parse(requested)?;
        enter(InstallStage::Resolving, &version);
        if self.store.version_dir(&version).exists() {
            return Err(AppError::already_installed(version));
        }
        self.store.ensure_root()?;
        Ok(version)
    }

    async fn install_resolved<F>(
        &self,
        requested: &str,
        version: Version,
        resolved: AppResult<FileDescriptor>,
        deadline: &Deadline,
        on_progress: F,
    ) -> AppResult<InstallReport>
    where
        F: FnMut(DownloadProgress),
    {
        let final_dir = self.store.version_dir(&version);
        let mut warnings = Vec::new();
        let (filename, checksum) = match resolved {
            Ok(file) => (file.filename, file.sha256),
            Err(e) => {
                // 调用方的截止时间或取消优先于降级
                deadline.check("install")?;
                let filename = self
                    .platform
                    .fallback_filename(version::strip_prefix(requested));
                warn!(error = %e, %filename, "catalog lookup failed, guessing archive name");
                warnings.push(InstallWarning::CatalogLookupFailed {
                    reason: e.to_string(),
                });
                (filename, None)
            }
        };

        let archive_path = self.store.root().join(archive_file_name(&filename)?);
        let url = download_url(&self.download_source, &filename);

        enter(InstallStage::Downloading, &version);
        if let Err(e) = self
            .fetcher
            .fetch(&url, &archive_path, deadline, on_progress)
            .await
        {
            discard_archive(&archive_path);
            return Err(e);
        }

        if let Err(e) = self.verify_and_commit(
            &version,
            &archive_path,
            checksum.as_deref(),
            &final_dir,
            &mut warnings,
        ) {
            discard_archive(&archive_path);
            return Err(e);
        }

        if let Err(e) = fs::remove_file(&archive_path) {
            warn!(path = %archive_path.display(), error = %e, "failed to remove archive");
            warnings.push(InstallWarning::ArchiveCleanupFailed {
                path: archive_path,
                reason: e.to_string(),
            });
        }

        enter(InstallStage::Done, &version);
        info!(%version, path = %final_dir.display(), "installed");
        Ok(InstallReport {
            version,
            path: final_dir,
            warnings,
        })
    }

    fn verify_and_commit(
        &self,
        version: &Version,
        archive_path: &Path,
        checksum: Option<&str>,
        final_dir: &Path,
        warnings: &mut Vec<InstallWarning>,
    ) -> AppResult<()> {
        enter(InstallStage::Verifying, version);
        match installer::verify_or_discard(archive_path, checksum.unwrap_or_default())? {
            Verification::Skipped => {
                let filename = archive_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                warn!(%filename, "no checksum available, skipping verification");
                warnings.push(InstallWarning::ChecksumUnavailable { filename });
            }
            Verification::Verified => debug!("checksum verified"),
            Verification::Mismatch { expected, actual } => {
                return Err(AppError::ChecksumMismatch { expected, actual })
            }
        }

        enter(InstallStage::Extracting, version);
        let staging = self.store.staging_dir()?;
        installer::extract(archive_path, staging.path())?;

        let sdk_root = staging.path().join(store::SDK_ROOT_DIR);
        if !sdk_root.is_dir() {
            return Err(AppError::PackageStructure {
                expected: store::SDK_ROOT_DIR.to_string(),
            });
        }

        enter(InstallStage::Committing, version);
        fs::rename(&sdk_root, final_dir)?;
        Ok(())
    }
}

fn enter(stage: InstallStage, version: &Version) {
    debug!(%version, %stage, "install stage");
}

/// 下载地址：基础地址补齐末尾 `/` 后拼接文件名
pub fn download_url(base: &str, filename: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{filename}")
    } else {
        format!("{base}/{filename}")
    }
}

/// 版本列表给出的文件名只取最后一段，防止写到根目录之外
fn archive_file_name(filename: &str) -> AppResult<&str> {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| *n == filename)
        .ok_or_else(|| AppError::decode(format!("非法的安装包文件名: {filename}")))
}

fn discard_archive(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove archive");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::installer::archive::tests::{build_tar_gz, Item};
    use crate::infrastructure::remote::{
        Catalog, CatalogEntry, ClientOptions, FileKind, HttpClient,
    };
    use async_trait::async_trait;
    use mockito::Server;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    struct StaticCatalog(AppResult<Catalog>);

    #[async_trait]
    impl CatalogSource for StaticCatalog {
        async fn fetch_all(&self, _deadline: &Deadline) -> AppResult<Catalog> {
            match &self.0 {
                Ok(catalog) => Ok(catalog.clone()),
                Err(_) => Err(AppError::network("catalog unavailable")),
            }
        }
    }

    fn linux() -> Platform {
        Platform::new("linux", "amd64")
    }

    fn catalog_with(version: &str, filename: &str, sha256: Option<String>) -> StaticCatalog {
        StaticCatalog(Ok(Catalog::new(vec![CatalogEntry {
            version: format!("go{version}"),
            files: vec![FileDescriptor {
                filename: filename.to_string(),
                os: "linux".to_string(),
                arch: "amd64".to_string(),
                kind: FileKind::Archive,
                sha256,
            }],
        }])))
    }

    fn sdk_archive(dir: &Path, name: &str) -> (PathBuf, Vec<u8>) {
        let path = dir.join(name);
        build_tar_gz(
            &path,
            &[
                Item::Dir("go", 0o755),
                Item::Dir("go/bin", 0o755),
                Item::File("go/bin/go", b"#!/bin/sh\necho go\n", 0o755),
                Item::File("go/VERSION", b"go1.21.0\n", 0o644),
            ],
        );
        let bytes = fs::read(&path).unwrap();
        (path, bytes)
    }

    fn fetcher() -> ArchiveFetcher {
        ArchiveFetcher::new(HttpClient::new(&ClientOptions::default()).unwrap())
    }

    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        walkdir::WalkDir::new(root)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| (e.path().to_path_buf(), fs::read(e.path()).unwrap()))
            .collect()
    }

    fn leftovers(root: &Path) -> Vec<String> {
        fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n != ".gvm.lock")
            .collect()
    }

    #[tokio::test]
    async fn test_install_verified_archive() {
        let fixtures = TempDir::new().unwrap();
        let (archive, bytes) = sdk_archive(fixtures.path(), "go1.21.0.linux-amd64.tar.gz");
        let digest = installer::sha256_file(&archive).unwrap();

        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/dl/go1.21.0.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(bytes)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let store = VersionStore::new(root.path());
        let catalog = catalog_with("1.21.0", "go1.21.0.linux-amd64.tar.gz", Some(digest));
        let fetcher = fetcher();
        let orchestrator = InstallOrchestrator::new(
            &store,
            &catalog,
            &fetcher,
            format!("{}/dl", server.url()),
            linux(),
        );

        let mut progress_calls = 0;
        let report = orchestrator
            .install("go1.21", &Deadline::none(), |_| progress_calls += 1)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(report.version, Version::new(1, 21, 0));
        assert_eq!(report.path, root.path().join("go1.21.0"));
        assert!(report.warnings.is_empty());
        assert!(progress_calls > 0);
        assert!(root.path().join("go1.21.0/bin/go").is_file());
        assert_eq!(leftovers(root.path()), vec!["go1.21.0"]);
    }

    #[tokio::test]
    async fn test_install_twice_is_already_installed_and_untouched() {
        let fixtures = TempDir::new().unwrap();
        let (_, bytes) = sdk_archive(fixtures.path(), "go1.21.0.linux-amd64.tar.gz");

        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/go1.21.0.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(bytes)
            .expect(1)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let store = VersionStore::new(root.path());
        let catalog = catalog_with("1.21.0", "go1.21.0.linux-amd64.tar.gz", None);
        let fetcher = fetcher();
        let orchestrator =
            InstallOrchestrator::new(&store, &catalog, &fetcher, server.url(), linux());

        orchestrator
            .install("1.21.0", &Deadline::none(), |_| {})
            .await
            .unwrap();
        let before = snapshot(root.path());

        let err = orchestrator
            .install("1.21.0", &Deadline::none(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyInstalled { .. }));
        assert_eq!(snapshot(root.path()), before);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_checksum_and_catalog_failure_are_warnings() {
        let fixtures = TempDir::new().unwrap();
        let (_, bytes) = sdk_archive(fixtures.path(), "go1.22.3.linux-amd64.tar.gz");

        let mut server = Server::new_async().await;
        server
            .mock("GET", "/go1.22.3.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(bytes)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let store = VersionStore::new(root.path());
        let catalog = StaticCatalog(Err(AppError::NoMatch));
        let fetcher = fetcher();
        let orchestrator =
            InstallOrchestrator::new(&store, &catalog, &fetcher, server.url(), linux());

        let report = orchestrator
            .install("1.22.3", &Deadline::none(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.warnings.len(), 2);
        assert!(matches!(
            report.warnings[0],
            InstallWarning::CatalogLookupFailed { .. }
        ));
        assert_eq!(
            report.warnings[1],
            InstallWarning::ChecksumUnavailable {
                filename: "go1.22.3.linux-amd64.tar.gz".to_string()
            }
        );
        assert!(store.is_installed(&Version::new(1, 22, 3)));
    }

    struct SlowCatalog;

    #[async_trait]
    impl CatalogSource for SlowCatalog {
        async fn fetch_all(&self, deadline: &Deadline) -> AppResult<Catalog> {
            deadline
                .run("catalog", tokio::time::sleep(Duration::from_secs(30)))
                .await?;
            Ok(Catalog::default())
        }
    }

    #[tokio::test]
    async fn test_slow_catalog_is_bounded_and_degrades() {
        let fixtures = TempDir::new().unwrap();
        let (_, bytes) = sdk_archive(fixtures.path(), "go1.22.3.linux-amd64.tar.gz");

        let mut server = Server::new_async().await;
        server
            .mock("GET", "/go1.22.3.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(bytes)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let store = VersionStore::new(root.path());
        let fetcher = fetcher();
        let orchestrator =
            InstallOrchestrator::new(&store, &SlowCatalog, &fetcher, server.url(), linux())
                .with_catalog_timeout(Duration::from_millis(50));

        let report = orchestrator
            .install("1.22.3", &Deadline::none(), |_| {})
            .await
            .unwrap();

        assert!(matches!(
            report.warnings[0],
            InstallWarning::CatalogLookupFailed { .. }
        ));
        assert!(store.is_installed(&Version::new(1, 22, 3)));
    }

    #[tokio::test]
    async fn test_cancelled_install_does_not_guess_archive() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/go1.22.3.linux-amd64.tar.gz")
            .expect(0)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let store = VersionStore::new(root.path());
        let catalog = StaticCatalog(Err(AppError::NoMatch));
        let fetcher = fetcher();
        let orchestrator =
            InstallOrchestrator::new(&store, &catalog, &fetcher, server.url(), linux());

        let deadline = Deadline::none();
        deadline.cancel();
        let err = orchestrator
            .install("1.22.3", &deadline, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Cancelled { .. }));
        assert!(!store.is_installed(&Version::new(1, 22, 3)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_install_from_prefetched_catalog() {
        let fixtures = TempDir::new().unwrap();
        let (archive, bytes) = sdk_archive(fixtures.path(), "go1.21.4.linux-amd64.tar.gz");
        let digest = installer::sha256_file(&archive).unwrap();

        let mut server = Server::new_async().await;
        server
            .mock("GET", "/go1.21.4.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(bytes)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let store = VersionStore::new(root.path());
        let unreachable = StaticCatalog(Err(AppError::NoMatch));
        let fetcher = fetcher();
        let orchestrator =
            InstallOrchestrator::new(&store, &unreachable, &fetcher, server.url(), linux());

        let prefetched = match catalog_with("1.21.4", "go1.21.4.linux-amd64.tar.gz", Some(digest)).0 {
            Ok(catalog) => catalog,
            Err(e) => panic!("{e}"),
        };
        let report = orchestrator
            .install_from(&prefetched, "1.21.4", &Deadline::none(), |_| {})
            .await
            .unwrap();

        assert!(report.warnings.is_empty());
        assert!(store.is_installed(&Version::new(1, 21, 4)));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_removes_download() {
        let fixtures = TempDir::new().unwrap();
        let (_, bytes) = sdk_archive(fixtures.path(), "go1.21.0.linux-amd64.tar.gz");

        let mut server = Server::new_async().await;
        server
            .mock("GET", "/go1.21.0.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(bytes)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let store = VersionStore::new(root.path());
        let catalog = catalog_with(
            "1.21.0",
            "go1.21.0.linux-amd64.tar.gz",
            Some("0".repeat(64)),
        );
        let fetcher = fetcher();
        let orchestrator =
            InstallOrchestrator::new(&store, &catalog, &fetcher, server.url(), linux());

        let err = orchestrator
            .install("1.21.0", &Deadline::none(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ChecksumMismatch { .. }));
        assert!(!root.path().join("go1.21.0.linux-amd64.tar.gz").exists());
        assert!(!root.path().join("go1.21.0").exists());
    }

    #[tokio::test]
    async fn test_truncated_archive_leaves_no_final_slot() {
        let fixtures = TempDir::new().unwrap();
        let (_, bytes) = sdk_archive(fixtures.path(), "go1.21.0.linux-amd64.tar.gz");
        let truncated = bytes[..bytes.len() / 2].to_vec();

        let mut server = Server::new_async().await;
        server
            .mock("GET", "/go1.21.0.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(truncated)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let store = VersionStore::new(root.path());
        let catalog = catalog_with("1.21.0", "go1.21.0.linux-amd64.tar.gz", None);
        let fetcher = fetcher();
        let orchestrator =
            InstallOrchestrator::new(&store, &catalog, &fetcher, server.url(), linux());

        let result = orchestrator
            .install("1.21.0", &Deadline::none(), |_| {})
            .await;

        assert!(result.is_err());
        assert!(!root.path().join("go1.21.0").exists());
        assert!(leftovers(root.path()).is_empty());
    }

    #[tokio::test]
    async fn test_archive_without_go_dir_is_package_error() {
        let fixtures = TempDir::new().unwrap();
        let path = fixtures.path().join("bad.tar.gz");
        build_tar_gz(&path, &[Item::File("sdk/bin/go", b"x", 0o755)]);
        let bytes = fs::read(&path).unwrap();

        let mut server = Server::new_async().await;
        server
            .mock("GET", "/go1.21.0.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(bytes)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let store = VersionStore::new(root.path());
        let catalog = catalog_with("1.21.0", "go1.21.0.linux-amd64.tar.gz", None);
        let fetcher = fetcher();
        let orchestrator =
            InstallOrchestrator::new(&store, &catalog, &fetcher, server.url(), linux());

        let err = orchestrator
            .install("1.21.0", &Deadline::none(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PackageStructure { .. }));
        assert!(leftovers(root.path()).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_version_is_rejected_before_network() {
        let root = TempDir::new().unwrap();
        let store = VersionStore::new(root.path());
        let catalog = StaticCatalog(Err(AppError::NoMatch));
        let fetcher = fetcher();
        let orchestrator = InstallOrchestrator::new(
            &store,
            &catalog,
            &fetcher,
            "http://127.0.0.1:9/",
            linux(),
        );

        let err = orchestrator
            .install("latest", &Deadline::none(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidVersionFormat { .. }));
    }

    #[test]
    fn test_download_url_joins_with_single_slash() {
        assert_eq!(
            download_url("https://go.dev/dl/", "go1.21.0.linux-amd64.tar.gz"),
            "https://go.dev/dl/go1.21.0.linux-amd64.tar.gz"
        );
        assert_eq!(
            download_url("https://mirror.example/go", "go1.21.0.linux-amd64.tar.gz"),
            "https://mirror.example/go/go1.21.0.linux-amd64.tar.gz"
        );
    }

    #[test]
    fn test_archive_file_name_rejects_paths() {
        assert!(archive_file_name("go1.21.0.linux-amd64.tar.gz").is_ok());
        assert!(archive_file_name("../go.tar.gz").is_err());
        assert!(archive_file_name("a/b.tar.gz").is_err());
    }
}
