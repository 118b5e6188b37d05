//! 版本号解析、比较与通配匹配
//!
//! 版本统一规范化为 `(major, minor, patch)` 三元组，比较只看数值。
//! 规范化从不失败：缺失或无法解析的分量按 0 处理（例如 `go1.21rc1`
//! 会被视为 `1.0.0`），这是沿用的既有行为。

use crate::core::constants::{store, version as consts};
use crate::error::{AppError, AppResult};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// 规范化后的版本号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// 次版本号，如 `1.25`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MinorVersion {
    pub major: u64,
    pub minor: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// 规范化版本字符串，去掉 `go` 前缀后按 `.` 取前三个分量
    pub fn normalize(s: &str) -> Self {
        let mut parts = strip_prefix(s).split('.').map(|p| p.parse::<u64>().unwrap_or(0));
        Self {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
        }
    }

    /// 严格解析 `[go]N.N[.N]`，格式不符时返回错误
    pub fn parse(s: &str) -> AppResult<Self> {
        static STRICT: OnceLock<Regex> = OnceLock::new();
        let re = STRICT.get_or_init(|| {
            Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?$").expect("static regex")
        });

        let trimmed = strip_prefix(s);
        let caps = re
            .captures(trimmed)
            .ok_or_else(|| AppError::invalid_version(s))?;
        let component = |i: usize| -> AppResult<u64> {
            caps.get(i)
                .map(|m| m.as_str().parse::<u64>())
                .transpose()
                .map(|v| v.unwrap_or(0))
                .map_err(|_| AppError::invalid_version(s))
        };

        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }

    /// 版本目录名，如 `go1.21.0`
    pub fn dir_name(&self) -> String {
        format!("{}{}", store::VERSION_DIR_PREFIX, self)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for MinorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl MinorVersion {
    /// 判断某个版本字符串是否属于该次版本（如 `1.25.3` 属于 `1.25`）
    pub fn contains(&self, version: &str) -> bool {
        strip_prefix(version).starts_with(&format!("{}.", self))
    }
}

/// 去掉可选的 `go` 前缀
pub fn strip_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix(consts::PREFIX).unwrap_or(s)
}

/// 三路比较两个版本字符串
pub fn compare(a: &str, b: &str) -> Ordering {
    Version::normalize(a).cmp(&Version::normalize(b))
}

/// 通配匹配：`1.21.*` 匹配 `1.21.` 开头的版本，否则要求完全相等
///
/// 只支持末尾单级通配，中间的 `*` 按字面处理。
pub fn matches_pattern(version: &str, pattern: &str) -> bool {
    let version = strip_prefix(version);
    let pattern = strip_prefix(pattern);

    match pattern.strip_suffix(".*") {
        Some(prefix) => version.starts_with(&format!("{prefix}.")),
        None => version == pattern,
    }
}

/// 提取次版本，仅接受 `1.N` 或 `1.N.P`
pub fn extract_minor(version: &str) -> AppResult<MinorVersion> {
    static MINOR: OnceLock<Regex> = OnceLock::new();
    let re = MINOR.get_or_init(|| Regex::new(consts::MINOR_PATTERN).expect("static regex"));

    let trimmed = strip_prefix(version);
    let caps = re
        .captures(trimmed)
        .ok_or_else(|| AppError::invalid_version(version))?;
    let minor = caps[1]
        .parse::<u64>()
        .map_err(|_| AppError::invalid_version(version))?;

    Ok(MinorVersion { major: 1, minor })
}

/// 是否为正式发布版本名（`go1.21.0` 形式，不含 rc/beta）
pub fn is_release_name(name: &str) -> bool {
    static RELEASE: OnceLock<Regex> = OnceLock::new();
    RELEASE
        .get_or_init(|| Regex::new(consts::RELEASE_PATTERN).expect("static regex"))
        .is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_prefix_and_pads() {
        assert_eq!(Version::normalize("go1.21.5"), Version::new(1, 21, 5));
        assert_eq!(Version::normalize("1.9"), Version::new(1, 9, 0));
        assert_eq!(Version::normalize("go1"), Version::new(1, 0, 0));
        assert_eq!(Version::normalize(""), Version::new(0, 0, 0));
    }

    #[test]
    fn test_normalize_degrades_garbage_to_zero() {
        assert_eq!(Version::normalize("1.21rc1"), Version::new(1, 0, 0));
        assert_eq!(Version::normalize("abc"), Version::new(0, 0, 0));
        assert_eq!(Version::normalize("1.x.3"), Version::new(1, 0, 3));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare("1.21.0", "1.22.0"), Ordering::Less);
        assert_eq!(compare("1.22.1", "1.22.0"), Ordering::Greater);
        assert_eq!(compare("go1.9", "1.9.0"), Ordering::Equal);
        assert_eq!(compare("1.10.0", "1.9.9"), Ordering::Greater);
    }

    #[test]
    fn test_compare_is_total_order() {
        let samples = ["1.9", "1.9.1", "1.10.0", "go1.21.0", "1.21.5", "2.0.0", "0.0.1"];

        for a in samples {
            assert_eq!(compare(a, a), Ordering::Equal);
            for b in samples {
                assert_eq!(compare(a, b), compare(b, a).reverse());
                for c in samples {
                    if compare(a, b) == Ordering::Less && compare(b, c) == Ordering::Less {
                        assert_eq!(compare(a, c), Ordering::Less, "{a} < {b} < {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("1.21.5", "1.21.*"));
        assert!(!matches_pattern("1.22.0", "1.21.*"));
        assert!(matches_pattern("1.21.0", "1.21.0"));
        assert!(matches_pattern("go1.21.3", "go1.21.*"));
        assert!(!matches_pattern("1.210.0", "1.21.*"));
        assert!(!matches_pattern("1.21.0", "1.*.0"));
    }

    #[test]
    fn test_extract_minor() {
        assert_eq!(extract_minor("1.25").unwrap().to_string(), "1.25");
        assert_eq!(extract_minor("go1.25.3").unwrap().to_string(), "1.25");
        assert!(matches!(
            extract_minor("2.1"),
            Err(AppError::InvalidVersionFormat { .. })
        ));
        assert!(extract_minor("1").is_err());
        assert!(extract_minor("1.25.3.1").is_err());
    }

    #[test]
    fn test_parse_strict() {
        assert_eq!(Version::parse("go1.22").unwrap(), Version::new(1, 22, 0));
        assert_eq!(Version::parse("1.22.4").unwrap(), Version::new(1, 22, 4));
        assert!(Version::parse("1.22rc1").is_err());
        assert!(Version::parse("latest").is_err());
    }

    #[test]
    fn test_release_name_and_dir_name() {
        assert!(is_release_name("go1.21.0"));
        assert!(!is_release_name("go1.21rc2"));
        assert!(!is_release_name("go1.20"));
        assert_eq!(Version::normalize("1.20").dir_name(), "go1.20.0");
    }

    #[test]
    fn test_minor_contains() {
        let minor = extract_minor("1.21").unwrap();
        assert!(minor.contains("1.21.7"));
        assert!(minor.contains("go1.21.0"));
        assert!(!minor.contains("1.210.1"));
    }
}
