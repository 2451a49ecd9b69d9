use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 一个已接受的任务
///
/// 核心只消费 `{url, email, secret}` 这一契约；鉴权由上游协作方完成，
/// 核心不再校验 secret 是否与配置一致。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// 链条的起始 URL
    pub url: String,
    /// 提交时携带的邮箱，整条链保持不变
    pub email: String,
    /// 提交时携带的密钥，整条链保持不变
    pub secret: String,
}

impl Job {
    /// 校验任务的基本格式
    ///
    /// 只做格式检查：URL 必须是 http/https，email 不能为空。
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            anyhow::bail!("起始 URL 格式无效: {}", self.url);
        }
        if self.email.is_empty() {
            anyhow::bail!("email 不能为空");
        }
        Ok(())
    }
}

/// 提交给 submit 端点的请求体
///
/// `url` 始终是"正在作答的页面"，而不是下一页。
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionPayload {
    pub email: String,
    pub secret: String,
    pub url: String,
    pub answer: Value,
}
