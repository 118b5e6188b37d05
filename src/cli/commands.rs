use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// gvm CLI 应用程序
#[derive(Parser)]
#[command(name = "gvm")]
#[command(about = "Go 多版本管理工具：安装、切换、卸载 Go SDK", long_about = None)]
#[command(version)]
pub struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// JSON 格式输出
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

/// 顶级命令
#[derive(Subcommand)]
pub enum Commands {
    /// 安装指定版本
    Install {
        /// 版本号，如 1.21.5 或 go1.21
        version: String,
    },
    /// 卸载指定版本，或按条件批量卸载
    Uninstall(UninstallArgs),
    /// 切换当前版本
    Use {
        /// 已安装的版本号
        version: String,
    },
    /// 显示当前版本
    Current,
    /// 列出已安装版本
    #[command(alias = "ls")]
    List {
        /// 列出远程最新的 N 个版本
        #[arg(short, long, value_name = "N", num_args = 0..=1, default_missing_value = "20")]
        remote: Option<usize>,
    },
    /// 按前缀搜索版本
    Search {
        /// 版本前缀，如 1.21
        prefix: String,
        /// 只搜索已安装版本
        #[arg(long)]
        local: bool,
        /// 结果数量限制，0 表示不限
        #[arg(short = 'n', long, default_value = "0")]
        limit: usize,
    },
    /// 升级某个次版本到最新补丁版本
    Upgrade {
        /// 次版本，如 1.21
        version: String,
    },
    /// 注册系统中已有的 Go SDK
    Link {
        /// GOROOT 目录或 go 可执行文件，缺省使用 PATH 中的 go
        path: Option<PathBuf>,
    },
    /// 查看或修改下载源配置
    Config {
        /// 设置安装包下载源
        #[arg(long, value_name = "URL")]
        source: Option<String>,
        /// 设置版本列表 JSON 地址
        #[arg(long, value_name = "URL")]
        json_source: Option<String>,
        /// 恢复默认配置
        #[arg(long, conflicts_with_all = ["source", "json_source"])]
        reset: bool,
    },
    /// 生成 shell 环境脚本并写入 rc 文件
    Init,
}

/// 卸载参数
#[derive(Args, Debug, Default)]
pub struct UninstallArgs {
    /// 要卸载的版本
    #[arg(conflicts_with_all = ["below", "pattern", "keep", "all"])]
    pub version: Option<String>,
    /// 卸载低于该版本的所有版本
    #[arg(long, value_name = "VERSION")]
    pub below: Option<String>,
    /// 卸载匹配通配模式的版本，如 1.21.*
    #[arg(long)]
    pub pattern: Option<String>,
    /// 只保留最新的 N 个版本
    #[arg(long, value_name = "N")]
    pub keep: Option<usize>,
    /// 卸载所有版本
    #[arg(long)]
    pub all: bool,
    /// 是否保护当前版本
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, value_name = "BOOL")]
    pub keep_current: bool,
}
