use crate::core::constants::download::CHUNK_SIZE;
use crate::error::{AppError, AppResult};
use crate::infrastructure::remote::deadline::Deadline;
use crate::infrastructure::remote::http_client::HttpClient;
use futures_util::StreamExt;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 下载进度快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    /// 已写入字节数
    pub written: u64,
    /// 总字节数，服务端未给出 Content-Length 时为 `None`
    pub total: Option<u64>,
    /// 自开始下载以来的耗时
    pub elapsed: Duration,
}

impl DownloadProgress {
    /// 完成百分比（0.0 ~ 1.0），总大小未知时返回 `None`
    pub fn fraction(&self) -> Option<f64> {
        self.total
            .filter(|t| *t > 0)
            .map(|t| (self.written as f64 / t as f64).min(1.0))
    }

    /// 平均速度（字节/秒）
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.written as f64 / secs
        } else {
            0.0
        }
    }

    /// 预计剩余时间，总大小未知或速度为 0 时返回 `None`
    pub fn eta(&self) -> Option<Duration> {
        let total = self.total.filter(|t| *t > 0)?;
        let speed = self.bytes_per_sec();
        if speed <= 0.0 {
            return None;
        }
        let remaining = total.saturating_sub(self.written) as f64;
        Some(Duration::from_secs_f64(remaining / speed))
    }
}

/// 安装包下载器
pub struct ArchiveFetcher {
    http: HttpClient,
}

impl ArchiveFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// 流式下载到 `dest`，每写入一个 32 KiB 块回调一次进度
    ///
    /// 总时长只受 `deadline` 限制；两次数据块之间超过空闲超时按 `Timeout` 失败。
    /// 失败时不清理已写入的部分文件，由调用方负责。
    pub async fn fetch<F>(
        &self,
        url: &str,
        dest: &Path,
        deadline: &Deadline,
        mut on_progress: F,
    ) -> AppResult<u64>
    where
        F: FnMut(DownloadProgress),
    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(dest)
            .await?;

        let response = self.http.get(url, deadline).await?;
        let total = response.content_length();
        debug!(url, ?total, dest = %dest.display(), "downloading");

        let start = Instant::now();
        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(item) = deadline.run(url, self.http.idle(url, stream.next())).await?? {
            let bytes = item.map_err(|e| AppError::network(format!("下载 {url} 中断: {e}")))?;

            for chunk in bytes.chunks(CHUNK_SIZE) {
                deadline.check(url)?;
                file.write_all(chunk).await?;
                written += chunk.len() as u64;
                on_progress(DownloadProgress {
                    written,
                    total,
                    elapsed: start.elapsed(),
                });
            }
        }

        file.flush().await?;
        Ok(written)
    }
}
