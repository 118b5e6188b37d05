use crate::core::constants::download::VERIFY_BUFFER_SIZE;
use crate::error::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// 校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// 摘要一致
    Verified,
    /// 摘要不一致
    Mismatch { expected: String, actual: String },
    /// 未提供期望摘要，跳过校验（可信度降低，调用方需要提示）
    Skipped,
}

/// 计算文件的 SHA-256（十六进制小写）
pub fn sha256_file(path: &Path) -> AppResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; VERIFY_BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// 校验文件摘要，`expected` 为空时直接跳过
pub fn verify(path: &Path, expected: &str) -> AppResult<Verification> {
    let expected = expected.trim();
    if expected.is_empty() {
        return Ok(Verification::Skipped);
    }

    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(Verification::Verified)
    } else {
        Ok(Verification::Mismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// 校验文件，摘要不一致时删除文件并返回 `ChecksumMismatch`
pub fn verify_or_discard(path: &Path, expected: &str) -> AppResult<Verification> {
    match verify(path, expected)? {
        Verification::Mismatch { expected, actual } => {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove corrupted download");
            }
            Err(AppError::ChecksumMismatch { expected, actual })
        }
        other => Ok(other),
    }
}
