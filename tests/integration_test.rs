//! 端到端链条测试
//!
//! 用 wiremock 架起本地的"quiz 服务器 + Oracle 服务"，对 ChainFlow 的
//! 完整状态机做闭环验证。真实网络的冒烟测试默认忽略，需要手动运行：
//! `cargo test -- --ignored`

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quiz_chain_submit::models::AbortReason;
use quiz_chain_submit::utils::logging;
use quiz_chain_submit::{
    ChainFlow, Config, HttpExecutor, Job, SessionCtx, SessionStatus, SubmitReply,
};

/// 构造指向 mock Oracle 的测试配置（退避归零，避免拖慢测试）
fn test_config(oracle_base: &str) -> Config {
    Config {
        oracle_api_key: "test-key".to_string(),
        oracle_api_base_url: oracle_base.to_string(),
        oracle_backoff_secs: 0,
        session_deadline_secs: 30,
        http_timeout_secs: 10,
        ..Config::default()
    }
}

/// 构造一个 OpenAI 兼容的聊天补全响应体
fn oracle_reply(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "openai/gpt-4.1-nano",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content,
                "refusal": null
            },
            "finish_reason": "stop",
            "logprobs": null
        }],
        "system_fingerprint": null,
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 5,
            "total_tokens": 15
        }
    })
}

fn job_for(start_url: String) -> Job {
    Job {
        url: start_url,
        email: "student@example.com".to_string(),
        secret: "swordfish".to_string(),
    }
}

async fn run_flow(config: &Config, job: &Job) -> quiz_chain_submit::SessionOutcome {
    logging::init();
    let executor = HttpExecutor::new(config.http_timeout_secs).expect("创建 HTTP 执行器失败");
    let flow = ChainFlow::new(config, executor);
    let ctx = SessionCtx::new(1, job.url.clone());
    flow.run(job, &ctx).await
}

/// 完整场景：base64 混淆页面 → 解码出题目 → Oracle 作答 → 提交 → DONE
#[tokio::test]
async fn test_end_to_end_obfuscated_chain() {
    let quiz = MockServer::start().await;
    let oracle = MockServer::start().await;

    // 页面正文藏在 atob("...") 里：解码后才有题目和提交地址
    let payload = r#"<pre id="result">2+2=?</pre> {"url": "/submit"}"#;
    let page = format!(
        r#"<html><body><script>document.write(atob("{}"))</script></body></html>"#,
        STANDARD.encode(payload)
    );

    Mock::given(method("GET"))
        .and(path("/quiz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .expect(1)
        .mount(&quiz)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(oracle_reply(r#"{"answer": 4}"#)))
        .expect(1)
        .mount(&oracle)
        .await;

    let start_url = format!("{}/quiz", quiz.uri());

    // 提交体必须携带"正在作答的页面"，email/secret 原样透传
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(body_partial_json(json!({
            "email": "student@example.com",
            "secret": "swordfish",
            "url": start_url,
            "answer": 4
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"correct": true})))
        .expect(1)
        .mount(&quiz)
        .await;

    let config = test_config(&oracle.uri());
    let outcome = run_flow(&config, &job_for(start_url)).await;

    assert_eq!(outcome.status, SessionStatus::Done);
    assert_eq!(outcome.reason, None);
    assert_eq!(outcome.pages_visited, 1);
    assert_eq!(
        outcome.last_result,
        Some(SubmitReply::Json(json!({"correct": true})))
    );
}

/// 多页链条：第一次提交返回下一页 URL，第二次提交结束链条
#[tokio::test]
async fn test_chain_follows_next_url() {
    let quiz = MockServer::start().await;
    let oracle = MockServer::start().await;

    let page1_url = format!("{}/q/1", quiz.uri());
    let page2_url = format!("{}/q/2", quiz.uri());

    Mock::given(method("GET"))
        .and(path("/q/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<pre id="result">First question?</pre> submit to {}/submit"#,
            quiz.uri()
        )))
        .expect(1)
        .mount(&quiz)
        .await;

    Mock::given(method("GET"))
        .and(path("/q/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<pre id="result">Second question?</pre> submit to {}/submit"#,
            quiz.uri()
        )))
        .expect(1)
        .mount(&quiz)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(oracle_reply(r#"{"answer": "ok"}"#)),
        )
        .expect(2)
        .mount(&oracle)
        .await;

    // 第一页的提交给出下一页，第二页的提交不带 url（链条结束）
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(body_partial_json(json!({"url": page1_url})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": page2_url})))
        .expect(1)
        .mount(&quiz)
        .await;

    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(body_partial_json(json!({"url": page2_url})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"correct": true})))
        .expect(1)
        .mount(&quiz)
        .await;

    let config = test_config(&oracle.uri());
    let outcome = run_flow(&config, &job_for(page1_url)).await;

    assert_eq!(outcome.status, SessionStatus::Done);
    assert_eq!(outcome.pages_visited, 2);
}

/// 提交响应不是 JSON：视为链条的正常完成信号，不是错误
#[tokio::test]
async fn test_plain_text_completion() {
    let quiz = MockServer::start().await;
    let oracle = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quiz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<pre id="result">Last one?</pre> {}/submit"#,
            quiz.uri()
        )))
        .mount(&quiz)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(oracle_reply(r#"{"answer": true}"#)),
        )
        .mount(&oracle)
        .await;

    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Quiz complete!"))
        .expect(1)
        .mount(&quiz)
        .await;

    let config = test_config(&oracle.uri());
    let outcome = run_flow(&config, &job_for(format!("{}/quiz", quiz.uri()))).await;

    assert_eq!(outcome.status, SessionStatus::Done);
    let last = outcome.last_result.expect("应保留最终结果");
    assert!(last.is_final_text());
    assert_eq!(last, SubmitReply::Text("Quiz complete!".to_string()));
}

/// 循环守卫：服务器回显当前 URL 时立即中止，绝不重新抓取
#[tokio::test]
async fn test_cycle_detected_aborts_without_refetch() {
    let quiz = MockServer::start().await;
    let oracle = MockServer::start().await;

    let start_url = format!("{}/quiz", quiz.uri());

    // GET 只允许发生一次
    Mock::given(method("GET"))
        .and(path("/quiz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<pre id="result">Loop?</pre> {}/submit"#,
            quiz.uri()
        )))
        .expect(1)
        .mount(&quiz)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(oracle_reply(r#"{"answer": 1}"#)),
        )
        .mount(&oracle)
        .await;

    // 服务器把同一页回显为"下一页"
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": start_url})))
        .expect(1)
        .mount(&quiz)
        .await;

    let config = test_config(&oracle.uri());
    let outcome = run_flow(&config, &job_for(start_url)).await;

    assert_eq!(outcome.status, SessionStatus::Aborted);
    assert_eq!(outcome.reason, Some(AbortReason::CycleDetected));
}

/// 入口页：没有题目但有提交地址时，不问 Oracle，提交占位答案
#[tokio::test]
async fn test_entry_page_submits_sentinel() {
    let quiz = MockServer::start().await;
    let oracle = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quiz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body><div id="result"></div><a href="{}/submit">go</a></body></html>"#,
            quiz.uri()
        )))
        .mount(&quiz)
        .await;

    // Oracle 绝不应被调用
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(oracle_reply("{}")))
        .expect(0)
        .mount(&oracle)
        .await;

    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(body_partial_json(json!({"answer": "start"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accepted": true})))
        .expect(1)
        .mount(&quiz)
        .await;

    let config = test_config(&oracle.uri());
    let outcome = run_flow(&config, &job_for(format!("{}/quiz", quiz.uri()))).await;

    assert_eq!(outcome.status, SessionStatus::Done);
}

/// 截止时间为 0：第一轮的截止检查先于任何抓取触发
#[tokio::test]
async fn test_zero_deadline_aborts_before_fetch() {
    let quiz = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never served"))
        .expect(0)
        .mount(&quiz)
        .await;

    let config = Config {
        session_deadline_secs: 0,
        ..test_config(&quiz.uri())
    };
    let outcome = run_flow(&config, &job_for(format!("{}/quiz", quiz.uri()))).await;

    assert_eq!(outcome.status, SessionStatus::Aborted);
    assert_eq!(outcome.reason, Some(AbortReason::DeadlineExceeded));
    assert_eq!(outcome.pages_visited, 0);
}

/// 找不到提交地址永远是致命条件
#[tokio::test]
async fn test_no_submit_target_aborts() {
    let quiz = MockServer::start().await;
    let oracle = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quiz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>a question with nowhere to go</body></html>"),
        )
        .mount(&quiz)
        .await;

    // 没有提交地址时不问 Oracle
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(oracle_reply("{}")))
        .expect(0)
        .mount(&oracle)
        .await;

    let config = test_config(&oracle.uri());
    let outcome = run_flow(&config, &job_for(format!("{}/quiz", quiz.uri()))).await;

    assert_eq!(outcome.status, SessionStatus::Aborted);
    assert_eq!(outcome.reason, Some(AbortReason::NoSubmitTarget));
}

/// Oracle 连续输出不可解析的散文：按预算重试后以 OracleError 中止
#[tokio::test]
async fn test_unparsable_oracle_retries_then_aborts() {
    let quiz = MockServer::start().await;
    let oracle = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quiz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<pre id="result">Hard one?</pre> {}/submit"#,
            quiz.uri()
        )))
        .mount(&quiz)
        .await;

    // 1 次初始尝试 + 2 次重试 = 恰好 3 次
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(oracle_reply(
            "I believe the answer might be four, but who can say.",
        )))
        .expect(3)
        .mount(&oracle)
        .await;

    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&quiz)
        .await;

    let config = test_config(&oracle.uri());
    let outcome = run_flow(&config, &job_for(format!("{}/quiz", quiz.uri()))).await;

    assert_eq!(outcome.status, SessionStatus::Aborted);
    assert_eq!(outcome.reason, Some(AbortReason::OracleError));
}

/// 即发即忘调度：调用方立即拿回句柄，结局只进日志
#[tokio::test]
async fn test_dispatch_fire_and_forget() {
    let quiz = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quiz"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>no target</body></html>"),
        )
        .expect(1)
        .mount(&quiz)
        .await;

    logging::init();
    let config = test_config(&quiz.uri());
    let executor = HttpExecutor::new(config.http_timeout_secs).expect("创建 HTTP 执行器失败");

    let handle = quiz_chain_submit::dispatch(
        job_for(format!("{}/quiz", quiz.uri())),
        config,
        executor,
    );

    // 句柄只用于测试收尾；生产调用方直接丢弃
    handle.await.expect("后台会话任务不应 panic");
}

/// 真实网络冒烟测试
///
/// 运行方式：
/// ```bash
/// START_URL=... ORACLE_API_KEY=... cargo test test_live_chain -- --ignored --nocapture
/// ```
#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_live_chain() {
    logging::init();

    let start_url = std::env::var("START_URL").expect("需要设置 START_URL");
    let config = Config::from_env();

    let job = Job {
        url: start_url.clone(),
        email: std::env::var("QUIZ_EMAIL").unwrap_or_else(|_| "student@example.com".to_string()),
        secret: std::env::var("QUIZ_SECRET").unwrap_or_default(),
    };

    let executor = HttpExecutor::new(config.http_timeout_secs).expect("创建 HTTP 执行器失败");
    let flow = ChainFlow::new(&config, executor);
    let ctx = SessionCtx::new(1, start_url);

    let outcome = flow.run(&job, &ctx).await;
    println!("最终状态: {:?}, 结果: {:?}", outcome.status, outcome.last_result);
}
