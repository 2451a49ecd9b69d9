//! Oracle 服务 - 业务能力层
//!
//! 只负责"把题目文本变成一个答案值"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型（OpenAI 兼容服务）
//!
//! ## 契约
//! Oracle 只允许返回一个答案值，形式是恰好含一个 `answer` 字段的 JSON 对象。
//! 绝不要求它生成可执行代码，也绝不让它决定控制流。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use regex::Regex;
use serde_json::{json, Value};
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::OracleError;

/// 答案所在的唯一字段名
pub const ANSWER_FIELD: &str = "answer";

/// 约束 Oracle 输出形状的系统指令
const SYSTEM_INSTRUCTION: &str = "You are a quiz-answering oracle. \
    Reply with a single JSON object containing exactly one field named \"answer\" \
    whose value is the answer (a number, string, boolean, or object). \
    No prose, no explanation, no markdown fencing. Never reply with code.";

/// Oracle 响应的标签化表示
///
/// 所有消费方必须显式按标签分支，不做鸭子类型的字段访问。
#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply {
    /// 解析出了 JSON 对象
    Structured(Value),
    /// 裸标量兜底：整型、浮点或布尔字面量
    Scalar(Value),
    /// 两条路径都失败，保留原文
    Unparsable(String),
}

/// Oracle 服务
///
/// 职责：
/// - 按严格契约调用外部推理服务
/// - 解析响应（去围栏 → 取平衡花括号 → JSON → 裸标量兜底）
/// - 有界重试，线性退避
/// - 不认识 Session，不出现 current_url
pub struct OracleService {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_retries: u32,
    backoff_secs: u64,
}

impl OracleService {
    /// 创建新的 Oracle 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.oracle_api_key)
            .with_api_base(&config.oracle_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.oracle_model_name.clone(),
            max_retries: config.oracle_max_retries,
            backoff_secs: config.oracle_backoff_secs,
        }
    }

    /// 就一道题目向 Oracle 索取单个答案值
    ///
    /// # 参数
    /// - `question`: 提取出的题目文本
    ///
    /// # 返回
    /// 答案值（数字、字符串、布尔或对象）；重试预算耗尽后返回 OracleError。
    pub async fn answer(&self, question: &str) -> Result<Value, OracleError> {
        let total_attempts = self.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=total_attempts {
            match self.ask_once(question).await {
                Ok(content) => match extract_answer(&content) {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        warn!("Oracle 响应解析失败 (第 {} 次尝试): {}", attempt, e);
                        last_error = e.to_string();
                    }
                },
                Err(e) => {
                    warn!("Oracle 调用失败 (第 {} 次尝试): {}", attempt, e);
                    last_error = e.to_string();
                }
            }

            // 线性递增退避
            if attempt < total_attempts {
                tokio::time::sleep(Duration::from_secs(self.backoff_secs * attempt as u64)).await;
            }
        }

        Err(OracleError::RetriesExhausted {
            attempts: total_attempts,
            last_error,
        })
    }

    /// 发起单次请求并取出文本内容
    async fn ask_once(&self, question: &str) -> Result<String, OracleError> {
        debug!("调用 Oracle API，模型: {}", self.model_name);

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_INSTRUCTION)
            .build()
            .map_err(|e| OracleError::ApiCallFailed {
                model: self.model_name.clone(),
                source: Box::new(e),
            })?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(question)
            .build()
            .map_err(|e| OracleError::ApiCallFailed {
                model: self.model_name.clone(),
                source: Box::new(e),
            })?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.0)
            .max_tokens(512u32)
            .build()
            .map_err(|e| OracleError::ApiCallFailed {
                model: self.model_name.clone(),
                source: Box::new(e),
            })?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            OracleError::ApiCallFailed {
                model: self.model_name.clone(),
                source: Box::new(e),
            }
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| OracleError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        debug!("Oracle API 调用成功");

        Ok(content.trim().to_string())
    }
}

/// 从 Oracle 原始输出中取出答案值
///
/// 先按契约解析（Structured 必须带 answer 字段），失败后接受裸标量兜底，
/// 两条路径都不通则报契约违反，交给上层重试。
fn extract_answer(content: &str) -> Result<Value, OracleError> {
    match parse_reply(content) {
        OracleReply::Structured(object) => {
            object
                .get(ANSWER_FIELD)
                .cloned()
                .ok_or_else(|| OracleError::ContractViolated {
                    response: content.to_string(),
                })
        }
        OracleReply::Scalar(value) => Ok(value),
        OracleReply::Unparsable(raw) => Err(OracleError::ContractViolated { response: raw }),
    }
}

/// 把 Oracle 原始输出解析为标签化表示
///
/// 顺序：剥掉可选的代码围栏；没有围栏就取第一个平衡的 `{...}` 子串；
/// 按 JSON 解析。失败后窄兜底：修剪过的原文按裸标量
/// （整型、浮点、布尔字面量）解析 —— 容忍对简单答案无视 JSON 指令的 Oracle。
pub fn parse_reply(content: &str) -> OracleReply {
    let candidate = strip_code_fence(content)
        .or_else(|| first_balanced_object(content))
        .unwrap_or_else(|| content.trim().to_string());

    if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
        if value.is_object() {
            return OracleReply::Structured(value);
        }
    }

    if let Some(scalar) = parse_bare_scalar(content) {
        return OracleReply::Scalar(scalar);
    }

    OracleReply::Unparsable(content.to_string())
}

/// 剥掉包裹输出的 markdown 代码围栏
fn strip_code_fence(content: &str) -> Option<String> {
    let re = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").ok()?;
    let captured = re.captures(content)?.get(1)?.as_str();
    Some(captured.trim().to_string())
}

/// 取出第一个花括号平衡的 `{...}` 子串
fn first_balanced_object(content: &str) -> Option<String> {
    let start = content.find('{')?;
    let mut depth = 0usize;

    for (offset, ch) in content[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(content[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// 裸标量兜底：整型、浮点、布尔字面量
fn parse_bare_scalar(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(json!(int));
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        return Some(json!(float));
    }
    if let Ok(boolean) = trimmed.parse::<bool>() {
        return Some(json!(boolean));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json_object() {
        let content = "```json\n{\"answer\": 42}\n```";
        assert_eq!(
            parse_reply(content),
            OracleReply::Structured(json!({"answer": 42}))
        );
        assert_eq!(extract_answer(content).unwrap(), json!(42));
    }

    #[test]
    fn test_plain_json_object() {
        let content = r#"{"answer": "Paris"}"#;
        assert_eq!(extract_answer(content).unwrap(), json!("Paris"));
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let content = r#"Sure! Here you go: {"answer": {"x": 1}} hope that helps"#;
        assert_eq!(extract_answer(content).unwrap(), json!({"x": 1}));
    }

    #[test]
    fn test_bare_scalar_fallbacks() {
        assert_eq!(parse_reply("true"), OracleReply::Scalar(json!(true)));
        assert_eq!(parse_reply("  42 "), OracleReply::Scalar(json!(42)));
        assert_eq!(parse_reply("3.5"), OracleReply::Scalar(json!(3.5)));
        assert_eq!(extract_answer("true").unwrap(), json!(true));
    }

    #[test]
    fn test_object_without_answer_field_violates_contract() {
        let content = r#"{"result": 42}"#;
        assert!(matches!(
            extract_answer(content),
            Err(OracleError::ContractViolated { .. })
        ));
    }

    #[test]
    fn test_unparsable_prose() {
        let content = "I think the answer might be four, but I'm not sure.";
        assert_eq!(
            parse_reply(content),
            OracleReply::Unparsable(content.to_string())
        );
        assert!(extract_answer(content).is_err());
    }

    #[test]
    fn test_fence_takes_priority_over_balanced_scan() {
        // 围栏里是权威内容，围栏外的花括号是噪声
        let content = "junk {\"answer\": 0} ```json\n{\"answer\": 1}\n``` tail";
        assert_eq!(extract_answer(content).unwrap(), json!(1));
    }
}
