//! HTTP 执行器 - 基础设施层
//!
//! 持有唯一的共享 reqwest 客户端（连接池），只暴露"GET 文本 / POST JSON"的能力

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// HTTP 执行器
///
/// 职责：
/// - 持有进程级共享的 reqwest::Client（连接级资源，不含任何会话数据）
/// - 暴露 get_text() / post_json() 能力，每次调用带独立超时
/// - 不认识 Session / Job
/// - 不处理业务流程
#[derive(Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    /// 创建新的 HTTP 执行器
    ///
    /// # 参数
    /// - `timeout_secs`: 单次调用的超时时间（秒）
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("无法创建 HTTP 客户端")?;

        Ok(Self { client })
    }

    /// 获取底层客户端的引用（用于其他操作）
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// GET 指定 URL 并返回响应体文本
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET 请求失败: {}", url))?;

        let body = response
            .text()
            .await
            .with_context(|| format!("读取响应体失败: {}", url))?;

        Ok(body)
    }

    /// POST JSON 到指定 URL 并返回响应体文本
    ///
    /// 响应体按原样返回，由调用方决定如何解析（可能是 JSON，也可能是任意文本）。
    pub async fn post_json(&self, url: &str, payload: &JsonValue) -> Result<String> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("POST 请求失败: {}", url))?;

        let body = response
            .text()
            .await
            .with_context(|| format!("读取响应体失败: {}", url))?;

        Ok(body)
    }
}
