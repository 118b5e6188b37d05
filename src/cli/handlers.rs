use crate::cli::commands::{Commands, UninstallArgs};
use crate::cli::output::{OutputFormat, OutputFormatter};
use crate::cli::progress::DownloadBar;
use crate::environments::go::{GoManager, UninstallSpec};
use crate::error::{AppError, ContextualResult};
use crate::infrastructure::config::Config;
use crate::infrastructure::remote::ClientOptions;
use crate::infrastructure::shell;
use std::path::PathBuf;

/// 命令处理器
pub struct CommandHandler {
    manager: GoManager,
    formatter: OutputFormatter,
}

impl UninstallArgs {
    /// 转换为批量卸载参数，过滤条件的校验由 `UninstallSpec::filter` 完成
    fn batch_spec(&self) -> UninstallSpec {
        UninstallSpec {
            below: self.below.clone(),
            pattern: self.pattern.clone(),
            keep_latest: self.keep,
            all: self.all,
            keep_current: self.keep_current,
        }
    }
}

impl CommandHandler {
    /// 创建新的命令处理器
    pub fn new(format: OutputFormat) -> ContextualResult<Self> {
        let manager = GoManager::from_env(&ClientOptions::default())
            .map_err(|e| e.with_context("初始化 gvm"))?;
        Ok(Self::with_manager(manager, format))
    }

    pub fn with_manager(manager: GoManager, format: OutputFormat) -> Self {
        Self {
            manager,
            formatter: OutputFormatter::new(format),
        }
    }

    fn root(&self) -> PathBuf {
        self.manager.root().to_path_buf()
    }

    fn progress_hidden(&self) -> bool {
        self.formatter.format() == OutputFormat::Json
    }

    /// 处理命令，返回要输出到 stdout 的内容
    pub async fn handle_command(&self, command: Commands) -> ContextualResult<String> {
        match command {
            Commands::Install { version } => {
                let mut bar = DownloadBar::new(self.progress_hidden());
                let result = self
                    .manager
                    .install_version(&version, |p| bar.update(p))
                    .await;
                bar.finish();

                match result {
                    Ok(report) => Ok(self.formatter.format_install(&report)?),
                    Err(e) if e.is_benign() => Ok(self.formatter.format_success(&e.to_string())?),
                    Err(e) => Err(e.with_context(&format!("安装 go{version}"))),
                }
            }
            Commands::Uninstall(args) => self.handle_uninstall(args),
            Commands::Use { version } => {
                let version = self
                    .manager
                    .use_version(&version)
                    .map_err(|e| e.with_context(&format!("切换到 go{version}")))?;
                Ok(self
                    .formatter
                    .format_success(&format!("✅ 当前版本: go{version}"))?)
            }
            Commands::Current => {
                let current = self
                    .manager
                    .current_version()
                    .map_err(|e| e.with_context("读取当前版本"))?;
                Ok(self.formatter.format_current(current)?)
            }
            Commands::List { remote: Some(n) } => {
                let versions = self
                    .manager
                    .list_remote(n)
                    .await
                    .map_err(|e| e.with_context("获取远程版本列表"))?;
                Ok(self.formatter.format_remote(&versions)?)
            }
            Commands::List { remote: None } => {
                let versions = self
                    .manager
                    .list_local()
                    .map_err(|e| e.with_context("列出已安装版本"))?;
                let current = self.manager.current_version()?;
                Ok(self.formatter.format_local(&versions, current)?)
            }
            Commands::Search {
                prefix,
                local: true,
                ..
            } => {
                let versions = self
                    .manager
                    .search_local(&prefix)
                    .map_err(|e| e.with_context("搜索已安装版本"))?;
                let current = self.manager.current_version()?;
                Ok(self.formatter.format_local(&versions, current)?)
            }
            Commands::Search { prefix, limit, .. } => {
                let versions = self
                    .manager
                    .search_remote(&prefix, limit)
                    .await
                    .map_err(|e| e.with_context("搜索远程版本"))?;
                Ok(self.formatter.format_remote(&versions)?)
            }
            Commands::Upgrade { version } => {
                let mut bar = DownloadBar::new(self.progress_hidden());
                let result = self
                    .manager
                    .upgrade_version(&version, |p| bar.update(p))
                    .await;
                bar.finish();

                let outcome = result.map_err(|e| e.with_context(&format!("升级 go{version}")))?;
                Ok(self.formatter.format_upgrade(&outcome)?)
            }
            Commands::Link { path } => {
                let report = self
                    .manager
                    .link_version(path.as_deref())
                    .map_err(|e| e.with_context("链接外部 Go SDK"))?;
                Ok(self.formatter.format_link(&report)?)
            }
            Commands::Config {
                source,
                json_source,
                reset,
            } => self.handle_config(source, json_source, reset),
            Commands::Init => {
                let report =
                    shell::init_default(&self.root()).map_err(|e| e.with_context("初始化 shell 环境"))?;
                Ok(self.formatter.format_init(&report)?)
            }
        }
    }

    fn handle_uninstall(&self, args: UninstallArgs) -> ContextualResult<String> {
        if let Some(version) = &args.version {
            let removed = self
                .manager
                .uninstall_version(version)
                .map_err(|e| e.with_context(&format!("卸载 go{version}")))?;
            return Ok(self
                .formatter
                .format_success(&format!("🗑️  已卸载 go{removed}"))?);
        }

        let outcome = self
            .manager
            .uninstall_batch(&args.batch_spec())
            .map_err(|e| e.with_context("批量卸载"))?;
        Ok(self.formatter.format_batch(&outcome)?)
    }

    fn handle_config(
        &self,
        source: Option<String>,
        json_source: Option<String>,
        reset: bool,
    ) -> ContextualResult<String> {
        let root = self.root();
        if reset {
            let config = Config::reset(&root).map_err(|e| e.with_context("重置配置"))?;
            return Ok(self.formatter.format_config(&config)?);
        }

        let mut config = Config::load(&root).map_err(|e| e.with_context("读取配置"))?;
        if source.is_none() && json_source.is_none() {
            return Ok(self.formatter.format_config(&config)?);
        }

        let update = |config: &mut Config| -> Result<(), AppError> {
            if let Some(source) = &source {
                config.set_download_source(source)?;
            }
            if let Some(json_source) = &json_source {
                config.set_download_source_json(json_source)?;
            }
            config.save(&root)
        };
        update(&mut config).map_err(|e| e.with_context("更新配置"))?;
        Ok(self.formatter.format_config(&config)?)
    }
}
