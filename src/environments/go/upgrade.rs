use crate::core::version::{self, MinorVersion, Version};
use crate::environments::go::installer::InstallReport;
use crate::environments::go::store::VersionStore;
use crate::error::{AppError, AppResult};
use crate::infrastructure::remote::{Catalog, Platform};
use serde::Serialize;

/// 升级计划：某个次版本本地最新补丁与远程最新补丁
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePlan {
    pub minor: MinorVersion,
    pub installed: Option<Version>,
    pub latest: Version,
}

impl UpgradePlan {
    pub fn is_up_to_date(&self) -> bool {
        self.installed == Some(self.latest)
    }
}

/// 升级结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpgradeOutcome {
    AlreadyLatest {
        version: Version,
    },
    Upgraded {
        from: Option<Version>,
        report: InstallReport,
    },
}

/// 计算升级计划，`prefix` 形如 `1.25` / `go1.25` / `1.25.3`
pub fn plan(
    prefix: &str,
    store: &VersionStore,
    catalog: &Catalog,
    platform: &Platform,
) -> AppResult<UpgradePlan> {
    let minor = version::extract_minor(prefix)?;

    let installed = store
        .search_local(&minor.to_string())?
        .into_iter()
        .max();

    let latest = catalog
        .latest_patch(minor, platform)
        .map(|v| Version::normalize(&v))
        .ok_or_else(|| AppError::NotFoundInCatalog {
            version: minor.to_string(),
            platform: platform.to_string(),
        })?;

    Ok(UpgradePlan {
        minor,
        installed,
        latest,
    })
}
