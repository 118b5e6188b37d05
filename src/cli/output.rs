use crate::core::version::Version;
use crate::environments::go::{
    BatchOutcome, BatchSummary, InstallReport, LinkReport, UpgradeOutcome,
};
use crate::error::AppResult;
use crate::infrastructure::config::Config;
use crate::infrastructure::shell::InitReport;
use serde::Serialize;
use std::fmt::Write;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// 输出格式化器
pub struct OutputFormatter {
    format: OutputFormat,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> AppResult<String> {
    let mut out = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    out.push('\n');
    Ok(out)
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// 格式化已安装版本列表，当前版本前加 `*`
    pub fn format_local(&self, versions: &[Version], current: Option<Version>) -> AppResult<String> {
        match self.format {
            OutputFormat::Text => {
                if versions.is_empty() {
                    return Ok("没有已安装的版本\n".to_string());
                }
                let mut output = String::new();
                for v in versions {
                    let marker = if Some(*v) == current { "*" } else { " " };
                    let _ = writeln!(output, "{marker} go{v}");
                }
                Ok(output)
            }
            OutputFormat::Json => to_json(&serde_json::json!({
                "current": current,
                "versions": versions,
            })),
        }
    }

    /// 格式化远程版本列表
    pub fn format_remote(&self, versions: &[String]) -> AppResult<String> {
        match self.format {
            OutputFormat::Text => {
                if versions.is_empty() {
                    return Ok("没有匹配的版本\n".to_string());
                }
                Ok(versions.iter().map(|v| format!("  go{v}\n")).collect())
            }
            OutputFormat::Json => to_json(versions),
        }
    }

    pub fn format_current(&self, current: Option<Version>) -> AppResult<String> {
        match (self.format, current) {
            (OutputFormat::Text, Some(v)) => Ok(format!("go{v}\n")),
            (OutputFormat::Text, None) => Ok("未设置当前版本\n".to_string()),
            (OutputFormat::Json, _) => to_json(&serde_json::json!({ "current": current })),
        }
    }

    pub fn format_install(&self, report: &InstallReport) -> AppResult<String> {
        match self.format {
            OutputFormat::Text => {
                let mut output = String::new();
                for warning in &report.warnings {
                    let _ = writeln!(output, "⚠️  {warning}");
                }
                let _ = writeln!(output, "✅ go{} 安装成功", report.version);
                let _ = writeln!(output, "📁 安装路径: {}", report.path.display());
                let _ = writeln!(output, "💡 使用 `gvm use {}` 切换到该版本", report.version);
                Ok(output)
            }
            OutputFormat::Json => to_json(report),
        }
    }

    pub fn format_batch(&self, outcome: &BatchOutcome) -> AppResult<String> {
        match self.format {
            OutputFormat::Text => {
                let mut output = String::new();
                for v in &outcome.removed {
                    let _ = writeln!(output, "🗑️  已卸载 go{v}");
                }
                for (v, e) in &outcome.failures {
                    let _ = writeln!(output, "❌ 卸载 go{v} 失败: {e}");
                }
                let _ = writeln!(
                    output,
                    "共卸载 {} 个版本，失败 {} 个",
                    outcome.removed.len(),
                    outcome.failures.len()
                );
                Ok(output)
            }
            OutputFormat::Json => to_json(&BatchSummary::from(outcome)),
        }
    }

    pub fn format_upgrade(&self, outcome: &UpgradeOutcome) -> AppResult<String> {
        match (self.format, outcome) {
            (OutputFormat::Text, UpgradeOutcome::AlreadyLatest { version }) => {
                Ok(format!("go{version} 已经是最新版本\n"))
            }
            (OutputFormat::Text, UpgradeOutcome::Upgraded { from, report }) => {
                let from = from
                    .map(|v| format!("go{v}"))
                    .unwrap_or_else(|| "未安装".to_string());
                let mut output = format!("⬆️  {from} -> go{}\n", report.version);
                output.push_str(&self.format_install(report)?);
                Ok(output)
            }
            (OutputFormat::Json, _) => to_json(outcome),
        }
    }

    pub fn format_link(&self, report: &LinkReport) -> AppResult<String> {
        match self.format {
            OutputFormat::Text if report.changed => Ok(format!(
                "🔗 {} -> {}\n💡 使用 `gvm use {}` 切换到该版本\n",
                report.link.display(),
                report.target.display(),
                report.version
            )),
            OutputFormat::Text => Ok(format!(
                "go{} 已链接到 {}\n",
                report.version,
                report.target.display()
            )),
            OutputFormat::Json => to_json(report),
        }
    }

    pub fn format_config(&self, config: &Config) -> AppResult<String> {
        match self.format {
            OutputFormat::Text => Ok(format!(
                "download_source: {}\ndownload_source_json: {}\n",
                config.download_source, config.download_source_json
            )),
            OutputFormat::Json => to_json(config),
        }
    }

    pub fn format_init(&self, report: &InitReport) -> AppResult<String> {
        match self.format {
            OutputFormat::Text => {
                let mut output = format!("✅ 已生成 {}\n", report.rc_script.display());
                match (&report.shell_rc, report.appended) {
                    (Some(rc), true) => {
                        let _ = writeln!(output, "已写入 {}，重新打开终端后生效", rc.display());
                    }
                    (Some(rc), false) => {
                        let _ = writeln!(output, "{} 已包含 gvm 配置", rc.display());
                    }
                    (None, _) => {
                        let _ = writeln!(
                            output,
                            "未找到 ~/.zshrc 或 ~/.bashrc，请手动添加: source {}",
                            report.rc_script.display()
                        );
                    }
                }
                Ok(output)
            }
            OutputFormat::Json => to_json(&serde_json::json!({
                "rc_script": report.rc_script,
                "shell_rc": report.shell_rc,
                "appended": report.appended,
            })),
        }
    }

    /// 格式化成功信息
    pub fn format_success(&self, message: &str) -> AppResult<String> {
        match self.format {
            OutputFormat::Text => Ok(format!("{message}\n")),
            OutputFormat::Json => to_json(&serde_json::json!({
                "message": message,
                "success": true
            })),
        }
    }
}
