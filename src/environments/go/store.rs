use crate::core::constants::store;
use crate::core::switcher::ActiveVersionSwitch;
use crate::core::version::{self, Version};
use crate::error::AppResult;
use crate::infrastructure::installer::StoreLock;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 本地版本目录
///
/// 布局：`<root>/go<major>.<minor>.<patch>` 为已安装版本，`<root>/goroot` 为当前版本链接。
/// 目录是否存在是判断"已安装"的唯一依据。
#[derive(Debug, Clone)]
pub struct VersionStore {
    root: PathBuf,
}

impl VersionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// 版本对应的安装目录
    pub fn version_dir(&self, version: &Version) -> PathBuf {
        self.root.join(version.dir_name())
    }

    pub fn is_installed(&self, version: &Version) -> bool {
        self.version_dir(version).is_dir()
    }

    /// 当前版本链接
    pub fn switch(&self) -> ActiveVersionSwitch {
        ActiveVersionSwitch::new(&self.root)
    }

    /// 获取目录锁
    pub fn lock(&self) -> AppResult<StoreLock> {
        StoreLock::acquire(&self.root)
    }

    /// 在根目录内创建解压暂存目录，保证提交时是同一文件系统内的 rename
    pub fn staging_dir(&self) -> AppResult<TempDir> {
        self.ensure_root()?;
        let dir = tempfile::Builder::new()
            .prefix(store::STAGING_PREFIX)
            .tempdir_in(&self.root)?;
        Ok(dir)
    }

    /// 已安装版本，升序
    ///
    /// 通过 `link` 注册的外部 SDK 是指向目录的符号链接，同样计入。
    pub fn list_local(&self) -> AppResult<Vec<Version>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if version::is_release_name(&name) && entry.path().is_dir() {
                versions.push(Version::normalize(&name));
            }
        }

        versions.sort();
        Ok(versions)
    }

    /// 按前缀搜索已安装版本（`1.21` 匹配 `1.21.x`）
    pub fn search_local(&self, prefix: &str) -> AppResult<Vec<Version>> {
        let wanted = format!("{}.", version::strip_prefix(prefix));
        Ok(self
            .list_local()?
            .into_iter()
            .filter(|v| v.to_string().starts_with(&wanted))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(entries: &[&str]) -> (TempDir, VersionStore) {
        let dir = TempDir::new().unwrap();
        for name in entries {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        let store = VersionStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_list_local_filters_and_sorts() {
        let (dir, store) = store_with(&["go1.21.0", "go1.9.2", "go1.22rc1", "go1.20", "misc"]);
        fs::write(dir.path().join("go1.23.0"), b"not a dir").unwrap();

        assert_eq!(
            store.list_local().unwrap(),
            vec![Version::new(1, 9, 2), Version::new(1, 21, 0)]
        );
    }

    #[test]
    fn test_list_local_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = VersionStore::new(dir.path().join("absent"));
        assert!(store.list_local().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_list_local_includes_linked_sdk() {
        let (dir, store) = store_with(&["external"]);
        std::os::unix::fs::symlink(dir.path().join("external"), dir.path().join("go1.21.5"))
            .unwrap();
        assert_eq!(store.list_local().unwrap(), vec![Version::new(1, 21, 5)]);
    }

    #[test]
    fn test_search_local_by_prefix() {
        let (_dir, store) = store_with(&["go1.21.0", "go1.21.5", "go1.2.1", "go1.22.0"]);
        assert_eq!(
            store.search_local("go1.21").unwrap(),
            vec![Version::new(1, 21, 0), Version::new(1, 21, 5)]
        );
        assert_eq!(store.search_local("1.2").unwrap(), vec![Version::new(1, 2, 1)]);
    }

    #[test]
    fn test_staging_dir_lives_in_root() {
        let (dir, store) = store_with(&[]);
        let staging = store.staging_dir().unwrap();
        assert_eq!(staging.path().parent(), Some(dir.path()));
        assert!(staging
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(".staging-"));
    }
}
