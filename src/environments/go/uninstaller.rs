//! 单个与批量卸载
//!
//! 批量卸载时先按过滤条件选出候选版本，再逐个删除；单个失败只记录，不中断其余版本。

use crate::core::switcher;
use crate::core::version::{self, Version};
use crate::environments::go::store::VersionStore;
use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::fs;
use tracing::{debug, info, warn};

/// 批量卸载参数，`below`、`pattern`、`keep_latest`、`all` 必须且只能指定一个
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallSpec {
    pub below: Option<String>,
    pub pattern: Option<String>,
    pub keep_latest: Option<usize>,
    pub all: bool,
    /// 是否保护当前激活的版本
    pub keep_current: bool,
}

impl Default for UninstallSpec {
    fn default() -> Self {
        Self {
            below: None,
            pattern: None,
            keep_latest: None,
            all: false,
            keep_current: true,
        }
    }
}

/// 校验后的过滤条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchFilter {
    Below(Version),
    Pattern(String),
    KeepLatest(usize),
    All,
}

impl UninstallSpec {
    /// 校验参数，得到唯一的过滤条件
    pub fn filter(&self) -> AppResult<BatchFilter> {
        let mut filters = Vec::new();

        if let Some(below) = &self.below {
            filters.push(BatchFilter::Below(Version::parse(below)?));
        }
        if let Some(pattern) = &self.pattern {
            if pattern.trim().is_empty() {
                return Err(AppError::invalid_spec("pattern 不能为空"));
            }
            filters.push(BatchFilter::Pattern(pattern.trim().to_string()));
        }
        if let Some(n) = self.keep_latest {
            if n == 0 {
                return Err(AppError::invalid_spec("keep 的数量必须大于 0"));
            }
            filters.push(BatchFilter::KeepLatest(n));
        }
        if self.all {
            filters.push(BatchFilter::All);
        }

        match filters.len() {
            0 => Err(AppError::invalid_spec("没有指定过滤条件")),
            1 => Ok(filters.remove(0)),
            _ => Err(AppError::invalid_spec("只能指定一个过滤条件")),
        }
    }
}

/// 批量卸载结果
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// 成功删除的版本
    pub removed: Vec<Version>,
    /// 删除失败的版本及原因
    pub failures: Vec<(Version, AppError)>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 批量卸载结果的可序列化摘要
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub removed: Vec<Version>,
    pub failed: Vec<FailedRemoval>,
}

#[derive(Debug, Serialize)]
pub struct FailedRemoval {
    pub version: Version,
    pub error: String,
}

impl From<&BatchOutcome> for BatchSummary {
    fn from(outcome: &BatchOutcome) -> Self {
        Self {
            removed: outcome.removed.clone(),
            failed: outcome
                .failures
                .iter()
                .map(|(version, e)| FailedRemoval {
                    version: *version,
                    error: e.to_string(),
                })
                .collect(),
        }
    }
}

/// 卸载引擎，调用方需持有目录锁
pub struct UninstallEngine<'a> {
    store: &'a VersionStore,
}

impl<'a> UninstallEngine<'a> {
    pub fn new(store: &'a VersionStore) -> Self {
        Self { store }
    }

    /// 卸载单个版本，若为当前版本先删除链接
    pub fn uninstall_one(&self, version: &Version) -> AppResult<()> {
        let dir = self.store.version_dir(version);
        let meta = match fs::symlink_metadata(&dir) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::not_installed(version))
            }
            Err(e) => return Err(e.into()),
        };

        let switch = self.store.switch();
        if switch.is_active(version)? {
            switch.clear()?;
            info!(%version, "cleared active version before removal");
        }

        // link 注册的外部 SDK 只删除链接本身
        if meta.file_type().is_symlink() {
            switcher::remove_link(&dir)?;
        } else {
            fs::remove_dir_all(&dir)?;
        }
        debug!(%version, path = %dir.display(), "removed");
        Ok(())
    }

    /// 按过滤条件选出要删除的版本，不产生副作用
    pub fn select(&self, filter: &BatchFilter, keep_current: bool) -> AppResult<Vec<Version>> {
        let installed = self.store.list_local()?;
        let protected = if keep_current {
            self.store.switch().current()?
        } else {
            None
        };
        let unprotected = |v: &Version| Some(*v) != protected;

        let selected: Vec<Version> = match filter {
            BatchFilter::All => installed.iter().copied().filter(|v| unprotected(v)).collect(),
            BatchFilter::Below(bound) => installed
                .iter()
                .copied()
                .filter(|v| unprotected(v) && v < bound)
                .collect(),
            BatchFilter::Pattern(pattern) => installed
                .iter()
                .copied()
                .filter(|v| unprotected(v) && version::matches_pattern(&v.to_string(), pattern))
                .collect(),
            BatchFilter::KeepLatest(n) => {
                // 当前版本也参与排名，所以它在前 n 名时实际保留的其他版本少于 n 个
                let mut ranked = installed;
                ranked.sort_by(|a, b| b.cmp(a));
                ranked
                    .into_iter()
                    .skip(*n)
                    .filter(|v| unprotected(v))
                    .collect()
            }
        };

        Ok(selected)
    }

    /// 批量卸载，没有匹配时返回 `NoMatch` 且不做任何修改
    pub fn uninstall_batch(&self, spec: &UninstallSpec) -> AppResult<BatchOutcome> {
        let filter = spec.filter()?;
        let selected = self.select(&filter, spec.keep_current)?;
        if selected.is_empty() {
            return Err(AppError::NoMatch);
        }

        Ok(self.remove_each(selected))
    }

    /// 逐个卸载，单个失败记录后继续处理其余版本
    pub fn remove_each(&self, selected: Vec<Version>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for version in selected {
            match self.uninstall_one(&version) {
                Ok(()) => outcome.removed.push(version),
                Err(e) => {
                    warn!(%version, error = %e, "failed to uninstall");
                    outcome.failures.push((version, e));
                }
            }
        }

        outcome
    }
}
