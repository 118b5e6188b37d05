use crate::core::constants::network;
use crate::core::version::Version;
use crate::environments::go::installer::{InstallOrchestrator, InstallReport};
use crate::environments::go::linker::{self, LinkReport};
use crate::environments::go::store::VersionStore;
use crate::environments::go::uninstaller::{BatchOutcome, UninstallEngine, UninstallSpec};
use crate::environments::go::upgrade::{self, UpgradeOutcome};
use crate::error::AppResult;
use crate::infrastructure::config::{self, Config, SourceProvider};
use crate::infrastructure::remote::{
    ArchiveFetcher, Catalog, CatalogClient, CatalogSource, ClientOptions, Deadline,
    DownloadProgress, HttpClient, Platform,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Go 版本管理入口
///
/// 修改版本目录的操作都在目录锁内完成；只读操作不加锁。
pub struct GoManager {
    store: VersionStore,
    catalog: Box<dyn CatalogSource>,
    fetcher: ArchiveFetcher,
    download_source: String,
    platform: Platform,
    catalog_timeout: Duration,
}

impl GoManager {
    /// 按下载源配置创建
    pub fn new(
        root: impl Into<PathBuf>,
        sources: &dyn SourceProvider,
        options: &ClientOptions,
    ) -> AppResult<Self> {
        let http = HttpClient::new(options)?;
        let catalog = CatalogClient::new(http.clone(), sources.download_source_json());
        Ok(Self::with_catalog(
            root,
            Box::new(catalog),
            http,
            sources.download_source(),
            Platform::current(),
        ))
    }

    /// 使用 `$GVM_ROOT`（或 `~/.gvm`）及其中的配置文件创建
    pub fn from_env(options: &ClientOptions) -> AppResult<Self> {
        let root = config::default_root()?;
        let config = Config::load(&root)?;
        Self::new(root, &config, options)
    }

    /// 注入版本列表来源与平台
    pub fn with_catalog(
        root: impl Into<PathBuf>,
        catalog: Box<dyn CatalogSource>,
        http: HttpClient,
        download_source: impl Into<String>,
        platform: Platform,
    ) -> Self {
        Self {
            store: VersionStore::new(root),
            catalog,
            fetcher: ArchiveFetcher::new(http),
            download_source: download_source.into(),
            platform,
            catalog_timeout: Duration::from_secs(network::CATALOG_TIMEOUT_SECS),
        }
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    fn orchestrator(&self) -> InstallOrchestrator<'_> {
        InstallOrchestrator::new(
            &self.store,
            self.catalog.as_ref(),
            &self.fetcher,
            self.download_source.clone(),
            self.platform.clone(),
        )
        .with_catalog_timeout(self.catalog_timeout)
    }

    async fn fetch_catalog(&self) -> AppResult<Catalog> {
        self.catalog
            .fetch_all(&Deadline::after(self.catalog_timeout))
            .await
    }

    /// 安装指定版本
    pub async fn install_version<F>(&self, version: &str, on_progress: F) -> AppResult<InstallReport>
    where
        F: FnMut(DownloadProgress),
    {
        let _lock = self.store.lock()?;
        self.orchestrator()
            .install(version, &Deadline::none(), on_progress)
            .await
    }

    /// 卸载指定版本
    pub fn uninstall_version(&self, version: &str) -> AppResult<Version> {
        let version = Version::parse(version)?;
        let _lock = self.store.lock()?;
        UninstallEngine::new(&self.store).uninstall_one(&version)?;
        info!(%version, "uninstalled");
        Ok(version)
    }

    /// 按条件批量卸载
    pub fn uninstall_batch(&self, spec: &UninstallSpec) -> AppResult<BatchOutcome> {
        let _lock = self.store.lock()?;
        UninstallEngine::new(&self.store).uninstall_batch(spec)
    }

    /// 切换当前版本
    pub fn use_version(&self, version: &str) -> AppResult<Version> {
        let version = Version::parse(version)?;
        let _lock = self.store.lock()?;
        self.store.switch().activate(&version)?;
        info!(%version, "now using");
        Ok(version)
    }

    /// 当前版本，未设置时为 `None`
    pub fn current_version(&self) -> AppResult<Option<Version>> {
        self.store.switch().current()
    }

    /// 已安装版本，升序
    pub fn list_local(&self) -> AppResult<Vec<Version>> {
        self.store.list_local()
    }

    /// 远程最新的 `n` 个正式版本
    pub async fn list_remote(&self, n: usize) -> AppResult<Vec<String>> {
        Ok(self.fetch_catalog().await?.list(n))
    }

    /// 按前缀搜索远程正式版本，`limit` 为 0 表示不限
    pub async fn search_remote(&self, prefix: &str, limit: usize) -> AppResult<Vec<String>> {
        Ok(self.fetch_catalog().await?.search(prefix, limit))
    }

    /// 按前缀搜索已安装版本
    pub fn search_local(&self, prefix: &str) -> AppResult<Vec<Version>> {
        self.store.search_local(prefix)
    }

    /// 将某个次版本升级到最新补丁版本
    pub async fn upgrade_version<F>(&self, prefix: &str, on_progress: F) -> AppResult<UpgradeOutcome>
    where
        F: FnMut(DownloadProgress),
    {
        let catalog = self.fetch_catalog().await?;
        let _lock = self.store.lock()?;
        let plan = upgrade::plan(prefix, &self.store, &catalog, &self.platform)?;
        info!(minor = %plan.minor, installed = ?plan.installed, latest = %plan.latest, "upgrade plan");

        if plan.is_up_to_date() {
            return Ok(UpgradeOutcome::AlreadyLatest {
                version: plan.latest,
            });
        }

        let report = self
            .orchestrator()
            .install_from(&catalog, &plan.latest.to_string(), &Deadline::none(), on_progress)
            .await?;
        Ok(UpgradeOutcome::Upgraded {
            from: plan.installed,
            report,
        })
    }

    /// 注册外部 SDK，`path` 为空时使用 PATH 中的 go
    pub fn link_version(&self, path: Option<&Path>) -> AppResult<LinkReport> {
        let sdk = linker::locate(path)?;
        let version = linker::detect_version(&sdk.go_bin)?;
        let _lock = self.store.lock()?;
        linker::link(&self.store, &sdk, version)
    }
}
