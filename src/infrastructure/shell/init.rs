//! Shell 环境初始化：生成 `.gvmrc` 并在 rc 文件中引用它

use crate::core::constants::store;
use crate::error::{AppError, AppResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 候选 rc 文件，按优先级排列
const RC_CANDIDATES: &[&str] = &[".zshrc", ".bashrc"];

/// 已写入标记，rc 文件中包含它时不再重复追加
const SOURCE_MARKER: &str = "/.gvm/.gvmrc";

/// 初始化结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    /// 生成的环境脚本
    pub rc_script: PathBuf,
    /// 检测到的 shell rc 文件
    pub shell_rc: Option<PathBuf>,
    /// 本次是否向 rc 文件追加了内容
    pub appended: bool,
}

/// `.gvmrc` 内容
pub fn gvmrc_content() -> String {
    [
        format!("export GOROOT=$HOME/{}/{}", store::ROOT_DIR_NAME, store::ACTIVE_LINK_NAME),
        "export PATH=$PATH:$GOROOT/bin".to_string(),
        "export GOPATH=$HOME/go".to_string(),
        "export GOBIN=$GOPATH/bin".to_string(),
        "export PATH=$PATH:$GOBIN".to_string(),
        String::new(),
    ]
    .join("\n")
}

fn source_snippet() -> String {
    let script = format!("$HOME/{}/{}", store::ROOT_DIR_NAME, store::SHELL_RC_NAME);
    format!("\n# gvm shell setup\nif [ -f \"{script}\" ]; then\n    source \"{script}\"\nfi\n")
}

/// 选择已存在的 rc 文件，zsh 优先
pub fn detect_shell_rc(home: &Path) -> Option<PathBuf> {
    RC_CANDIDATES
        .iter()
        .map(|name| home.join(name))
        .find(|path| path.is_file())
}

/// 写入 `<root>/.gvmrc`，并在找到的 rc 文件末尾追加一次引用
pub fn init_env(root: &Path, home: &Path) -> AppResult<InitReport> {
    fs::create_dir_all(root)?;
    let rc_script = root.join(store::SHELL_RC_NAME);
    fs::write(&rc_script, gvmrc_content())?;
    debug!(path = %rc_script.display(), "wrote shell script");

    let shell_rc = detect_shell_rc(home);
    let mut appended = false;

    if let Some(rc) = &shell_rc {
        let existing = fs::read_to_string(rc)?;
        if !existing.contains(SOURCE_MARKER) {
            let mut file = OpenOptions::new().append(true).open(rc)?;
            file.write_all(source_snippet().as_bytes())?;
            appended = true;
            info!(rc = %rc.display(), "added gvm setup to shell rc");
        }
    }

    Ok(InitReport {
        rc_script,
        shell_rc,
        appended,
    })
}

/// 使用当前用户主目录初始化
pub fn init_default(root: &Path) -> AppResult<InitReport> {
    let home = dirs::home_dir().ok_or_else(|| AppError::config("无法获取用户主目录"))?;
    init_env(root, &home)
}
