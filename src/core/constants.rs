//! 应用程序常量定义
//!
//! 本模块包含全局使用的常量，避免魔数并提供统一的配置值。

/// 版本目录布局相关常量
pub mod store {
    /// 版本目录根路径（相对用户主目录）
    pub const ROOT_DIR_NAME: &str = ".gvm";
    /// 覆盖根路径的环境变量
    pub const ROOT_ENV_VAR: &str = "GVM_ROOT";
    /// 当前激活版本的链接名
    pub const ACTIVE_LINK_NAME: &str = "goroot";
    /// 已安装版本目录名前缀
    pub const VERSION_DIR_PREFIX: &str = "go";
    /// 安装包内 SDK 根目录名
    pub const SDK_ROOT_DIR: &str = "go";
    /// 进程间互斥锁文件
    pub const LOCK_FILE_NAME: &str = ".gvm.lock";
    /// 解压暂存目录前缀
    pub const STAGING_PREFIX: &str = ".staging-";
    /// 配置文件名
    pub const CONFIG_FILE_NAME: &str = "config.json";
    /// Shell 环境脚本名
    pub const SHELL_RC_NAME: &str = ".gvmrc";
}

/// 版本号相关常量
pub mod version {
    /// 可省略的版本前缀
    pub const PREFIX: &str = "go";
    /// 正式发布版本名称格式
    pub const RELEASE_PATTERN: &str = r"^go\d+\.\d+\.\d+$";
    /// 次版本号格式（仅支持 1.x）
    pub const MINOR_PATTERN: &str = r"^1\.(\d+)(\.\d+)?$";
}

/// 网络相关常量
pub mod network {
    /// 默认连接超时时间（秒）
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
    /// 等待响应头或下一个数据块的最长时间（秒），不限制下载总时长
    pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;
    /// 版本列表请求超时时间（秒）
    pub const CATALOG_TIMEOUT_SECS: u64 = 60;
}

/// 下载相关常量
pub mod download {
    /// 默认下载源
    pub const DEFAULT_SOURCE: &str = "https://go.dev/dl/";
    /// 默认版本列表 JSON 地址
    pub const DEFAULT_SOURCE_JSON: &str = "https://go.dev/dl/?mode=json&include=all";
    /// 下载写盘块大小（字节）
    pub const CHUNK_SIZE: usize = 32 * 1024;
    /// 校验缓冲区大小（字节）
    pub const VERIFY_BUFFER_SIZE: usize = 8192;
}
