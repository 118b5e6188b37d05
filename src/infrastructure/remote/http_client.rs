use crate::core::constants::network;
use crate::error::{AppError, AppResult};
use crate::infrastructure::remote::deadline::Deadline;
use reqwest::{Client, Response};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// HTTP 客户端配置，由调用方注入
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// 等待响应头或下一个数据块的最长时间，不限制整个响应的耗时
    pub idle_timeout: Duration,
}

impl ClientOptions {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            connect_timeout: Duration::from_secs(network::DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(network::DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(concat!("gvm/", env!("CARGO_PKG_VERSION")))
    }
}

/// HTTP 客户端包装器
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    idle_timeout: Duration,
}

impl HttpClient {
    /// 创建新的 HTTP 客户端
    pub fn new(options: &ClientOptions) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(|e| AppError::network(format!("创建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            idle_timeout: options.idle_timeout,
        })
    }

    /// 等待一次网络读取，超过空闲超时视为连接停滞
    pub async fn idle<F: Future>(&self, operation: &str, fut: F) -> AppResult<F::Output> {
        tokio::time::timeout(self.idle_timeout, fut)
            .await
            .map_err(|_| AppError::Timeout {
                operation: operation.to_string(),
            })
    }

    /// GET 请求，非 2xx 状态视为网络错误
    pub async fn get(&self, url: &str, deadline: &Deadline) -> AppResult<Response> {
        debug!(url, "GET");
        let response = deadline
            .run(url, self.idle(url, self.client.get(url).send()))
            .await??
            .map_err(|e| AppError::network(format!("请求 {url} 失败: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::network(format!("请求 {url} 失败: HTTP {status}")));
        }

        Ok(response)
    }

    /// GET 请求并解析 JSON
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        deadline: &Deadline,
    ) -> AppResult<T> {
        let response = self.get(url, deadline).await?;
        let body = deadline
            .run(url, self.idle(url, response.bytes()))
            .await??
            .map_err(|e| AppError::network(format!("读取 {url} 响应失败: {e}")))?;

        serde_json::from_slice(&body).map_err(|e| AppError::decode(format!("{url}: {e}")))
    }
}
