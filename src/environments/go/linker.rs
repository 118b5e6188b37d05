//! 将系统中已有的 Go SDK 注册为 `<root>/go<version>` 符号链接

use crate::core::switcher;
use crate::core::version::Version;
use crate::environments::go::store::VersionStore;
use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// 链接结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub version: Version,
    /// `<root>/go<version>`
    pub link: PathBuf,
    /// 外部 SDK 的 GOROOT
    pub target: PathBuf,
    /// 是否新建或更新了链接，已指向同一目标时为 false
    pub changed: bool,
}

/// 外部 SDK 信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSdk {
    pub goroot: PathBuf,
    pub go_bin: PathBuf,
}

fn go_exe_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "go.exe"
    } else {
        "go"
    }
}

fn absolute(path: &Path) -> AppResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// 定位外部 SDK
///
/// 传入目录时视为 GOROOT；传入文件时视为 go 可执行文件，通过 `go env GOROOT` 反查；
/// 不传时使用 PATH 中的 `go`。
pub fn locate(path: Option<&Path>) -> AppResult<ExternalSdk> {
    let path = match path {
        Some(p) => absolute(p)?,
        None => which::which("go").map_err(|e| AppError::InvalidSdk {
            path: PathBuf::from("go"),
            reason: format!("PATH 中未找到 go: {e}"),
        })?,
    };

    let meta = fs::metadata(&path).map_err(|e| AppError::InvalidSdk {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    if meta.is_dir() {
        let go_bin = path.join("bin").join(go_exe_name());
        if !go_bin.is_file() {
            return Err(AppError::InvalidSdk {
                path,
                reason: format!("缺少 bin/{}", go_exe_name()),
            });
        }
        return Ok(ExternalSdk { goroot: path, go_bin });
    }

    let goroot = PathBuf::from(run_go(&path, &["env", "GOROOT"])?.trim());
    if goroot.as_os_str().is_empty() {
        return Err(AppError::InvalidSdk {
            path,
            reason: "go env GOROOT 输出为空".to_string(),
        });
    }
    debug!(goroot = %goroot.display(), "resolved GOROOT from binary");
    Ok(ExternalSdk {
        goroot,
        go_bin: path,
    })
}

/// 通过 `go version` 识别版本，输出形如 `go version go1.21.5 darwin/arm64`
pub fn detect_version(go_bin: &Path) -> AppResult<Version> {
    let output = run_go(go_bin, &["version"])?;
    parse_version_output(&output).ok_or_else(|| AppError::ExternalCommand {
        command: format!("{} version", go_bin.display()),
        reason: format!("无法识别的输出: {}", output.trim()),
    })
}

fn parse_version_output(output: &str) -> Option<Version> {
    let field = output.split_whitespace().nth(2)?;
    Version::parse(field).ok()
}

fn run_go(go_bin: &Path, args: &[&str]) -> AppResult<String> {
    let command = format!("{} {}", go_bin.display(), args.join(" "));
    let output = Command::new(go_bin)
        .args(args)
        .output()
        .map_err(|e| AppError::ExternalCommand {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(AppError::ExternalCommand {
            command,
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// 创建或更新版本链接，调用方需持有目录锁
///
/// 已存在真实安装目录时拒绝覆盖。
pub fn link(store: &VersionStore, sdk: &ExternalSdk, version: Version) -> AppResult<LinkReport> {
    store.ensure_root()?;
    let link = store.version_dir(&version);

    if let Ok(meta) = fs::symlink_metadata(&link) {
        if !meta.file_type().is_symlink() {
            return Err(AppError::already_installed(version));
        }
        if fs::read_link(&link)? == sdk.goroot {
            debug!(%version, "already linked");
            return Ok(LinkReport {
                version,
                link,
                target: sdk.goroot.clone(),
                changed: false,
            });
        }
        switcher::remove_link(&link)?;
    }

    switcher::symlink_dir(&sdk.goroot, &link)?;
    info!(%version, link = %link.display(), target = %sdk.goroot.display(), "linked external sdk");
    Ok(LinkReport {
        version,
        link,
        target: sdk.goroot.clone(),
        changed: true,
    })
}
