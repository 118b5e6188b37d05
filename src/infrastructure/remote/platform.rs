use std::fmt;

/// 简单封装的平台信息，使用 Go 发布包的 OS / Arch 命名。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: &str, arch: &str) -> Self {
        Platform {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    /// 检测当前运行平台。
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };

        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            "arm" => "armv6l",
            "powerpc64" => "ppc64le",
            other => other,
        };

        Platform::new(os, arch)
    }

    /// 针对当前平台返回默认压缩格式。
    pub fn archive_ext(&self) -> &'static str {
        match self.os.as_str() {
            "windows" => "zip",
            _ => "tar.gz",
        }
    }

    /// 按官方命名规则构造安装包文件名，如 `go1.21.0.linux-amd64.tar.gz`
    ///
    /// 这是版本列表查询失败时的兜底，Windows 上为 zip，其余平台为 tar.gz。
    pub fn fallback_filename(&self, version: &str) -> String {
        format!("go{}.{}-{}.{}", version, self.os, self.arch, self.archive_ext())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
