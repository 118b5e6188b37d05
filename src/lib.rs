// 核心模块
pub mod cli;
pub mod core;
pub mod environments;
pub mod error;
pub mod infrastructure;

// 重新导出常用类型
pub use core::version::{MinorVersion, Version};
pub use environments::go::{
    BatchOutcome, GoManager, InstallReport, InstallWarning, LinkReport, UninstallSpec,
    UpgradeOutcome,
};
pub use error::{AppError, AppResult, ContextualError, ContextualResult};
pub use infrastructure::config::{Config, SourceProvider};
pub use infrastructure::remote::{ClientOptions, Deadline, DownloadProgress};
