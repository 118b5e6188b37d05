//! 安装包解压
//!
//! 逐项解压 tar.gz（或 Windows 上的 zip）到目标目录，保留目录/文件权限位，
//! 符号链接按链接重建而不是跟随复制，其它类型的条目直接跳过。
//! 任何解析到目标目录之外的路径（`..`、绝对路径、越界的链接目标）都会被拒绝。

use crate::error::{AppError, AppResult};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::debug;

/// 根据扩展名选择解压方式
pub fn extract(archive_path: &Path, dest_dir: &Path) -> AppResult<()> {
    let name = archive_path.to_string_lossy();
    if name.ends_with(".zip") {
        extract_zip(archive_path, dest_dir)
    } else {
        extract_tar_gz(archive_path, dest_dir)
    }
}

/// 解压 TAR.GZ 文件
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> AppResult<()> {
    fs::create_dir_all(dest_dir)?;
    let root = dest_dir.canonicalize()?;

    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut dir_modes = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        let Some(relative) = sanitize_entry_path(&entry_path)? else {
            continue;
        };
        let out_path = root.join(&relative);
        let mode = entry.header().mode().ok();

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&out_path)?;
                ensure_within(&root, &out_path)?;
                if let Some(mode) = mode {
                    dir_modes.push((out_path, mode));
                }
            }
            EntryType::Regular | EntryType::Continuous => {
                prepare_parent(&root, &out_path)?;
                remove_existing_link(&out_path)?;
                let mut out = File::create(&out_path)?;
                io::copy(&mut entry, &mut out)?;
                if let Some(mode) = mode {
                    set_mode(&out_path, mode)?;
                }
            }
            EntryType::Symlink => {
                let target = entry
                    .link_name()?
                    .ok_or_else(|| unsafe_path(&entry_path))?
                    .into_owned();
                if !link_stays_within(&relative, &target) {
                    return Err(unsafe_path(&entry_path));
                }
                prepare_parent(&root, &out_path)?;
                remove_existing_link(&out_path)?;
                create_symlink(&target, &out_path)?;
            }
            other => {
                debug!(entry = %entry_path.display(), kind = ?other, "skipping archive entry");
            }
        }
    }

    // 目录权限最后设置，避免只读目录阻止后续写入
    for (path, mode) in dir_modes.into_iter().rev() {
        set_mode(&path, mode)?;
    }

    Ok(())
}

/// 解压 ZIP 文件
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> AppResult<()> {
    fs::create_dir_all(dest_dir)?;
    let root = dest_dir.canonicalize()?;

    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    for i in 0..archive.len() {
        let mut item = archive
            .by_index(i)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let name = item.name().to_string();
        let relative = item
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| unsafe_path(Path::new(&name)))?;
        let Some(relative) = sanitize_entry_path(&relative)? else {
            continue;
        };
        let out_path = root.join(&relative);

        if item.is_dir() {
            fs::create_dir_all(&out_path)?;
            ensure_within(&root, &out_path)?;
        } else {
            prepare_parent(&root, &out_path)?;
            remove_existing_link(&out_path)?;
            let mut out = File::create(&out_path)?;
            io::copy(&mut item, &mut out)?;
            if let Some(mode) = item.unix_mode() {
                set_mode(&out_path, mode)?;
            }
        }
    }

    Ok(())
}

/// 规范化条目路径：去掉 `.`，拒绝 `..` 和绝对路径；空路径返回 `None`
fn sanitize_entry_path(path: &Path) -> AppResult<Option<PathBuf>> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path(path));
            }
        }
    }

    Ok(if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    })
}

/// 判断相对链接目标从链接所在目录出发是否仍在根目录内
fn link_stays_within(link_relative: &Path, target: &Path) -> bool {
    let mut depth = link_relative
        .parent()
        .map(|p| p.components().count())
        .unwrap_or(0) as isize;

    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// 创建父目录，并确认其真实路径（跟随已解压的链接后）仍在根目录内
fn prepare_parent(root: &Path, out_path: &Path) -> AppResult<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
        ensure_within(root, parent)?;
    }
    Ok(())
}

fn ensure_within(root: &Path, path: &Path) -> AppResult<()> {
    let real = path.canonicalize()?;
    if real.starts_with(root) {
        Ok(())
    } else {
        Err(unsafe_path(path))
    }
}

fn remove_existing_link(path: &Path) -> AppResult<()> {
    if let Ok(meta) = fs::symlink_metadata(path) {
        if meta.file_type().is_symlink() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

fn unsafe_path(path: &Path) -> AppError {
    AppError::UnsafeArchivePath {
        entry: path.display().to_string(),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> AppResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> AppResult<()> {
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> AppResult<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> AppResult<()> {
    if let Err(e) = std::os::windows::fs::symlink_file(target, link) {
        tracing::warn!(link = %link.display(), error = %e, "cannot create symlink, skipping");
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, link: &Path) -> AppResult<()> {
    tracing::warn!(link = %link.display(), "symlinks unsupported on this platform, skipping");
    Ok(())
}
