//! 网络操作的截止时间与取消标记
//!
//! `Deadline` 会被传递给版本列表查询和安装包下载，每一个可能阻塞的
//! await 都通过 [`Deadline::run`] 执行。

use crate::error::{AppError, AppResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// 截止时间 + 共享取消标记
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    at: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// 不设截止时间
    pub fn none() -> Self {
        Self::default()
    }

    /// 从现在起 `timeout` 之后到期
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Some(Instant::now() + timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 在当前截止时间内再收紧到 `timeout` 之后，共享同一个取消标记
    pub fn limited(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        Self {
            at: Some(self.at.map_or(candidate, |at| at.min(candidate))),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// 请求取消，所有持有同一标记的操作在下一个检查点退出
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// 剩余时间，未设置截止时间时返回 `None`
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// 检查是否已取消或已过期
    pub fn check(&self, operation: &str) -> AppResult<()> {
        if self.is_cancelled() {
            return Err(AppError::Cancelled {
                operation: operation.to_string(),
            });
        }
        if self.remaining() == Some(Duration::ZERO) {
            return Err(AppError::Timeout {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// 在截止时间内执行一个异步操作
    pub async fn run<F: Future>(&self, operation: &str, fut: F) -> AppResult<F::Output> {
        self.check(operation)?;
        match self.at {
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| AppError::Timeout {
                    operation: operation.to_string(),
                }),
            None => Ok(fut.await),
        }
    }
}
