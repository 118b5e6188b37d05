use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),

    #[error("无效的版本格式: {version}")]
    InvalidVersionFormat { version: String },

    #[error("版本列表中未找到 go{version} ({platform})")]
    NotFoundInCatalog { version: String, platform: String },

    #[error("go{version} 已经安装")]
    AlreadyInstalled { version: String },

    #[error("go{version} 未安装")]
    NotInstalled { version: String },

    #[error("校验和不匹配: 期望 {expected}, 实际 {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("安装包结构错误: 未找到 '{expected}' 目录")]
    PackageStructure { expected: String },

    #[error("网络错误: {message}")]
    Network { message: String },

    #[error("解析远程数据失败: {message}")]
    Decode { message: String },

    #[error("批量卸载参数错误: {reason}")]
    InvalidUninstallSpec { reason: String },

    #[error("没有符合条件的版本")]
    NoMatch,

    #[error("配置错误: {message}")]
    Config { message: String },

    #[error("无法锁定版本目录: {path}")]
    Lock { path: PathBuf },

    #[error("操作超时: {operation}")]
    Timeout { operation: String },

    #[error("操作已取消: {operation}")]
    Cancelled { operation: String },

    #[error("拒绝解压越界路径: {entry}")]
    UnsafeArchivePath { entry: String },

    #[error("无效的 Go SDK 路径 {path}: {reason}")]
    InvalidSdk { path: PathBuf, reason: String },

    #[error("执行外部命令失败: {command} - {reason}")]
    ExternalCommand { command: String, reason: String },
}

/// 用于提供错误上下文和用户友好建议
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub operation: String,
    pub suggestions: Vec<String>,
}

impl AppError {
    /// 为错误添加上下文信息，建议由错误类型自动推导
    pub fn with_context(self, operation: &str) -> ContextualError {
        let suggestions = self.suggestions();
        ContextualError {
            error: self,
            context: ErrorContext {
                operation: operation.to_string(),
                suggestions,
            },
        }
    }

    /// 针对常见错误给出的处理建议
    pub fn suggestions(&self) -> Vec<String> {
        let hints: &[&str] = match self {
            AppError::AlreadyInstalled { .. } => &["使用 `gvm use <version>` 切换到该版本"],
            AppError::NotInstalled { .. } => &[
                "使用 `gvm list` 查看已安装版本",
                "使用 `gvm install <version>` 安装",
            ],
            AppError::ChecksumMismatch { .. } => &["下载文件已删除，请重试或更换下载源"],
            AppError::Network { .. } | AppError::Timeout { .. } => &[
                "检查网络连接",
                "使用 `gvm config --source <url>` 更换下载源",
            ],
            AppError::InvalidUninstallSpec { .. } => {
                &["只能指定 --below、--pattern、--keep、--all 中的一个"]
            }
            AppError::NoMatch => &["使用 `gvm list` 查看已安装版本"],
            AppError::Lock { .. } => &["可能有另一个 gvm 进程正在运行，请稍后重试"],
            AppError::InvalidSdk { .. } => &["指定 GOROOT 目录（包含 bin/go）或 go 可执行文件"],
            _ => &[],
        };
        hints.iter().map(|s| s.to_string()).collect()
    }

    /// 是否属于可忽略的"无操作"信号
    pub fn is_benign(&self) -> bool {
        matches!(self, AppError::AlreadyInstalled { .. })
    }
}

/// 带有上下文的错误
#[derive(Error, Debug)]
pub struct ContextualError {
    #[source]
    pub error: AppError,
    pub context: ErrorContext,
}

impl std::fmt::Display for ContextualError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "操作失败: {}\n错误: {}", self.context.operation, self.error)
    }
}

impl ContextualError {
    /// 获取用户友好的错误消息
    pub fn user_message(&self) -> String {
        let mut msg = format!("❌ {}\n", self.context.operation);
        msg.push_str(&format!("原因: {}\n", self.error));

        if !self.context.suggestions.is_empty() {
            msg.push_str("💡 建议:\n");
            for suggestion in &self.context.suggestions {
                msg.push_str(&format!("  • {}\n", suggestion));
            }
        }

        msg
    }
}

/// 应用程序 Result 类型
pub type AppResult<T> = Result<T, AppError>;
pub type ContextualResult<T> = Result<T, ContextualError>;

/// 便捷的错误创建函数
impl AppError {
    pub fn invalid_version(version: &str) -> Self {
        Self::InvalidVersionFormat {
            version: version.to_string(),
        }
    }

    pub fn not_installed(version: impl ToString) -> Self {
        Self::NotInstalled {
            version: version.to_string(),
        }
    }

    pub fn already_installed(version: impl ToString) -> Self {
        Self::AlreadyInstalled {
            version: version.to_string(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn invalid_spec(reason: impl Into<String>) -> Self {
        Self::InvalidUninstallSpec {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<AppError> for ContextualError {
    fn from(error: AppError) -> Self {
        error.with_context("未知操作")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contextual_message_includes_suggestions() {
        let err = AppError::not_installed("1.21.0").with_context("卸载 go1.21.0");
        let msg = err.user_message();
        assert!(msg.contains("卸载 go1.21.0"));
        assert!(msg.contains("go1.21.0 未安装"));
        assert!(msg.contains("gvm list"));
    }

    #[test]
    fn test_already_installed_is_benign() {
        assert!(AppError::already_installed("1.22.0").is_benign());
        assert!(!AppError::NoMatch.is_benign());
    }
}
