//! 当前版本链接（`<root>/goroot`）的读取与切换
//!
//! 切换时先在根目录下创建一个临时链接，再用一次 rename 覆盖旧链接，
//! 读者只会看到旧目标或新目标。调用方负责持有 [`StoreLock`]。
//!
//! [`StoreLock`]: crate::infrastructure::installer::StoreLock

use crate::core::constants::store;
use crate::core::version::{self, Version};
use crate::error::{AppError, AppResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 当前版本链接的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// 没有链接
    Absent,
    /// 指向一个已安装版本
    Active(Version),
    /// 链接存在但目标已被删除
    Dangling(PathBuf),
    /// 链接不是由 gvm 创建的（非符号链接，或目标不是版本目录）
    Foreign(PathBuf),
}

/// 当前版本切换器
#[derive(Debug, Clone)]
pub struct ActiveVersionSwitch {
    root: PathBuf,
}

impl ActiveVersionSwitch {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 链接路径 `<root>/goroot`
    pub fn link_path(&self) -> PathBuf {
        self.root.join(store::ACTIVE_LINK_NAME)
    }

    /// 读取链接状态
    pub fn status(&self) -> AppResult<LinkStatus> {
        let link = self.link_path();
        let meta = match fs::symlink_metadata(&link) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LinkStatus::Absent),
            Err(e) => return Err(e.into()),
        };

        if !meta.file_type().is_symlink() {
            return Ok(LinkStatus::Foreign(link));
        }

        let target = fs::read_link(&link)?;
        let resolved = if target.is_absolute() {
            target.clone()
        } else {
            self.root.join(&target)
        };

        if !resolved.exists() {
            return Ok(LinkStatus::Dangling(target));
        }

        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // 只认版本目录下的直接子目录
        let in_store = resolved.parent() == Some(self.root.as_path());
        if in_store && version::is_release_name(&name) {
            Ok(LinkStatus::Active(Version::normalize(&name)))
        } else {
            Ok(LinkStatus::Foreign(target))
        }
    }

    /// 当前激活的版本，失效或外部链接视为未设置
    pub fn current(&self) -> AppResult<Option<Version>> {
        match self.status()? {
            LinkStatus::Active(v) => Ok(Some(v)),
            LinkStatus::Absent => Ok(None),
            LinkStatus::Dangling(target) => {
                warn!(target = %target.display(), "active link is dangling");
                Ok(None)
            }
            LinkStatus::Foreign(target) => {
                warn!(target = %target.display(), "active link is not managed by gvm");
                Ok(None)
            }
        }
    }

    /// 链接是否指向指定版本
    pub fn is_active(&self, version: &Version) -> AppResult<bool> {
        Ok(self.status()? == LinkStatus::Active(*version))
    }

    /// 将链接切换到指定版本
    pub fn activate(&self, version: &Version) -> AppResult<PathBuf> {
        let target = self.root.join(version.dir_name());
        if !target.is_dir() {
            return Err(AppError::not_installed(version));
        }

        let link = self.link_path();
        let temp = self
            .root
            .join(format!(".{}-{}", store::ACTIVE_LINK_NAME, uuid::Uuid::new_v4().simple()));
        symlink_dir(&target, &temp)?;

        if let Err(e) = replace_link(&temp, &link) {
            let _ = remove_link(&temp);
            return Err(e);
        }

        debug!(link = %link.display(), target = %target.display(), "switched active version");
        Ok(target)
    }

    /// 删除链接，返回是否真的删除了
    pub fn clear(&self) -> AppResult<bool> {
        let link = self.link_path();
        match fs::symlink_metadata(&link) {
            Ok(meta) => {
                remove_entry(&link, &meta)?;
                debug!(link = %link.display(), "cleared active version");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn remove_entry(path: &Path, meta: &fs::Metadata) -> AppResult<()> {
    // 非空的真实目录不删，交给用户处理
    if meta.is_dir() {
        fs::remove_dir(path)?;
    } else {
        remove_link(path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn replace_link(temp: &Path, link: &Path) -> AppResult<()> {
    if let Ok(meta) = fs::symlink_metadata(link) {
        if meta.is_dir() {
            fs::remove_dir(link)?;
        }
    }
    fs::rename(temp, link)?;
    Ok(())
}

// Windows 不能 rename 覆盖目录链接，只能先删后建
#[cfg(not(unix))]
fn replace_link(temp: &Path, link: &Path) -> AppResult<()> {
    if let Ok(meta) = fs::symlink_metadata(link) {
        remove_entry(link, &meta)?;
    }
    fs::rename(temp, link)?;
    Ok(())
}

#[cfg(unix)]
pub(crate) fn symlink_dir(target: &Path, link: &Path) -> AppResult<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(windows)]
pub(crate) fn symlink_dir(target: &Path, link: &Path) -> AppResult<()> {
    std::os::windows::fs::symlink_dir(target, link)?;
    Ok(())
}

#[cfg(unix)]
pub(crate) fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

#[cfg(windows)]
pub(crate) fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_dir(path).or_else(|_| fs::remove_file(path))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(versions: &[&str]) -> (TempDir, ActiveVersionSwitch) {
        let dir = TempDir::new().unwrap();
        for v in versions {
            fs::create_dir_all(dir.path().join(format!("go{v}")).join("bin")).unwrap();
        }
        let switch = ActiveVersionSwitch::new(dir.path());
        (dir, switch)
    }

    #[test]
    fn test_absent_link_is_none() {
        let (_dir, switch) = store_with(&["1.21.0"]);
        assert_eq!(switch.status().unwrap(), LinkStatus::Absent);
        assert_eq!(switch.current().unwrap(), None);
        assert!(!switch.clear().unwrap());
    }

    #[test]
    fn test_use_twice_moves_link() {
        let (dir, switch) = store_with(&["1.20.0", "1.21.0"]);

        switch.activate(&Version::new(1, 21, 0)).unwrap();
        assert_eq!(switch.current().unwrap(), Some(Version::new(1, 21, 0)));

        switch.activate(&Version::new(1, 20, 0)).unwrap();
        assert_eq!(switch.current().unwrap(), Some(Version::new(1, 20, 0)));
        assert_eq!(
            fs::read_link(switch.link_path()).unwrap(),
            dir.path().join("go1.20.0")
        );
        assert!(dir.path().join("go1.21.0").is_dir());
    }

    #[test]
    fn test_activate_leaves_no_temporary_links() {
        let (dir, switch) = store_with(&["1.21.0"]);
        switch.activate(&Version::new(1, 21, 0)).unwrap();
        switch.activate(&Version::new(1, 21, 0)).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "{names:?}");
    }

    #[test]
    fn test_activate_missing_version_fails() {
        let (_dir, switch) = store_with(&[]);
        let err = switch.activate(&Version::new(1, 21, 0)).unwrap_err();
        assert!(matches!(err, AppError::NotInstalled { .. }));
        assert_eq!(switch.status().unwrap(), LinkStatus::Absent);
    }

    #[test]
    fn test_dangling_link_is_detected() {
        let (dir, switch) = store_with(&["1.21.0"]);
        switch.activate(&Version::new(1, 21, 0)).unwrap();
        fs::remove_dir_all(dir.path().join("go1.21.0")).unwrap();

        assert!(matches!(switch.status().unwrap(), LinkStatus::Dangling(_)));
        assert_eq!(switch.current().unwrap(), None);
        assert!(switch.clear().unwrap());
        assert_eq!(switch.status().unwrap(), LinkStatus::Absent);
    }

    #[test]
    fn test_foreign_link_is_not_a_version() {
        let (dir, switch) = store_with(&[]);
        let other = dir.path().join("custom-sdk");
        fs::create_dir(&other).unwrap();
        std::os::unix::fs::symlink(&other, switch.link_path()).unwrap();

        assert!(matches!(switch.status().unwrap(), LinkStatus::Foreign(_)));
        assert_eq!(switch.current().unwrap(), None);
    }

    #[test]
    fn test_release_named_link_outside_store_is_foreign() {
        let (_dir, switch) = store_with(&["1.21.0"]);
        let elsewhere = TempDir::new().unwrap();
        let outside = elsewhere.path().join("go1.21.0");
        fs::create_dir(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, switch.link_path()).unwrap();

        assert_eq!(switch.status().unwrap(), LinkStatus::Foreign(outside));
        assert_eq!(switch.current().unwrap(), None);
        assert!(!switch.is_active(&Version::new(1, 21, 0)).unwrap());
    }

    #[test]
    fn test_activate_replaces_empty_directory() {
        let (_dir, switch) = store_with(&["1.21.0"]);
        fs::create_dir(switch.link_path()).unwrap();

        switch.activate(&Version::new(1, 21, 0)).unwrap();
        assert_eq!(switch.current().unwrap(), Some(Version::new(1, 21, 0)));
    }
}
