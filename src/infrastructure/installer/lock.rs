//! 版本目录的进程间互斥锁
//!
//! 修改版本目录的操作（安装、卸载、切换）在整个过程中持有 `<root>/.gvm.lock`。
//! 锁不可重入：公开操作获取一次，内部函数不再重复获取。

use crate::core::constants::store;
use crate::error::{AppError, AppResult};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 持有期间独占版本目录，drop 时释放
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    /// 阻塞直到获得锁
    ///
    /// 锁随文件句柄释放，进程异常退出也不会留下失效的锁；锁文件本身保留复用。
    pub fn acquire(root: &Path) -> AppResult<Self> {
        fs::create_dir_all(root)?;
        let path = root.join(store::LOCK_FILE_NAME);
        let file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        file.lock().map_err(|e| {
            debug!(error = %e, "store lock failed");
            AppError::Lock { path: path.clone() }
        })?;
        debug!(path = %path.display(), "acquired store lock");
        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "released store lock");
    }
}
