//! Oracle capability - optional external text generation
//!
//! The oracle may propose a plan, a SQL candidate, or a paraphrase. It is never
//! trusted: every failure mode (transport error, timeout, malformed JSON, wrong
//! shape) collapses into `None` and the deterministic path takes over.

use crate::error::{NlqError, NlqResult};
use crate::llm::ollama_client::extract_json;
use crate::query::plan::{PlanOrigin, QueryPlan};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A text-generation backend: system instruction plus JSON payload in, raw text out
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, system: &str, payload: &serde_json::Value) -> anyhow::Result<String>;

    /// Whether the backend is reachable; backends without a health endpoint report true
    async fn health_check(&self) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OracleTask {
    /// Expects `{reasoning, plan}` or `{reasoning, sql}`
    Plan,
    /// Expects `{reasoning, text}`
    Paraphrase,
}

#[derive(Clone, Debug)]
pub struct OracleRequest {
    pub task: OracleTask,
    pub system: String,
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OracleOutput {
    Plan { reasoning: String, plan: QueryPlan },
    Sql { reasoning: String, sql: String },
    Text { reasoning: String, text: String },
}

#[derive(Deserialize)]
struct OracleReply {
    reasoning: String,
    #[serde(default)]
    plan: Option<QueryPlan>,
    #[serde(default)]
    sql: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Strictly parse an oracle reply for `task`
pub fn parse_output(task: OracleTask, raw: &str) -> NlqResult<OracleOutput> {
    let reply: OracleReply = serde_json::from_str(extract_json(raw))
        .map_err(|e| NlqError::oracle_unavailable(format!("malformed oracle reply: {}", e)))?;
    let reasoning = reply.reasoning;
    match task {
        OracleTask::Plan => match (reply.plan, reply.sql) {
            (Some(mut plan), None) => {
                plan.origin = PlanOrigin::Oracle;
                plan.validate()
                    .map_err(|e| NlqError::oracle_unavailable(format!("oracle plan rejected: {}", e)))?;
                Ok(OracleOutput::Plan { reasoning, plan })
            }
            (None, Some(sql)) if !sql.trim().is_empty() => Ok(OracleOutput::Sql {
                reasoning,
                sql: sql.trim().to_string(),
            }),
            _ => Err(NlqError::oracle_unavailable("plan reply needs exactly one of plan or sql")),
        },
        OracleTask::Paraphrase => match reply.text {
            Some(text) if !text.trim().is_empty() => Ok(OracleOutput::Text {
                reasoning,
                text: text.trim().to_string(),
            }),
            _ => Err(NlqError::oracle_unavailable("paraphrase reply has no text")),
        },
    }
}

/// Timeout, retry and parsing policy around an `Oracle`
#[derive(Clone)]
pub struct OracleGateway {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl OracleGateway {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            timeout: Duration::from_millis(8000),
            max_retries: 2,
            backoff: Duration::from_millis(800),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    /// Ask the backend for its health within the per-attempt timeout
    pub async fn is_available(&self) -> bool {
        tokio::time::timeout(self.timeout, self.oracle.health_check())
            .await
            .unwrap_or(false)
    }

    /// Ask the oracle. Transport failures and timeouts are retried with linear
    /// backoff; a reply of the wrong shape ends the attempt immediately.
    pub async fn try_generate(&self, request: &OracleRequest) -> Option<OracleOutput> {
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.backoff * attempt).await;
            }
            let call = self.oracle.complete(&request.system, &request.payload);
            match tokio::time::timeout(self.timeout, call).await {
                Ok(Ok(raw)) => {
                    return match parse_output(request.task, &raw) {
                        Ok(output) => {
                            debug!(task = ?request.task, attempt, "oracle replied");
                            Some(output)
                        }
                        Err(e) => {
                            warn!(task = ?request.task, error = %e, "discarding oracle reply");
                            None
                        }
                    };
                }
                Ok(Err(e)) => warn!(task = ?request.task, attempt, error = %e, "oracle call failed"),
                Err(_) => warn!(
                    task = ?request.task,
                    attempt,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "oracle call timed out"
                ),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::{Intent, Metric};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned replies; `None` entries fail the call
    struct Scripted {
        replies: Mutex<Vec<Option<String>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(replies: Vec<Option<&str>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).rev().collect()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Oracle for Scripted {
        async fn complete(&self, _system: &str, _payload: &serde_json::Value) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.lock().unwrap().pop().flatten() {
                Some(reply) => Ok(reply),
                None => anyhow::bail!("connection refused"),
            }
        }
    }

    struct Slow;

    #[async_trait]
    impl Oracle for Slow {
        async fn complete(&self, _system: &str, _payload: &serde_json::Value) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    fn request(task: OracleTask) -> OracleRequest {
        OracleRequest {
            task,
            system: "system".into(),
            payload: serde_json::json!({"question": "q"}),
        }
    }

    fn gateway(oracle: Arc<dyn Oracle>) -> OracleGateway {
        OracleGateway::new(oracle)
            .with_timeout(Duration::from_millis(50))
            .with_retries(2, Duration::from_millis(1))
    }

    #[test]
    fn test_parse_plan_reply() {
        let raw = r#"```json
{"reasoning": "ranking by japan", "plan": {"intent": "ranking", "metric": "jp_sales", "top_n": 3}}
```"#;
        match parse_output(OracleTask::Plan, raw).unwrap() {
            OracleOutput::Plan { plan, .. } => {
                assert_eq!(plan.intent, Intent::Ranking);
                assert_eq!(plan.metric, Metric::JpSales);
                assert_eq!(plan.origin, PlanOrigin::Oracle);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        assert!(parse_output(OracleTask::Plan, "not json").is_err());
        assert!(parse_output(OracleTask::Plan, r#"{"sql": "SELECT 1"}"#).is_err());
        assert!(parse_output(OracleTask::Plan, r#"{"reasoning": "r"}"#).is_err());
        assert!(parse_output(OracleTask::Paraphrase, r#"{"reasoning": "r", "text": "  "}"#).is_err());
        let invalid_plan = r#"{"reasoning": "r", "plan": {"intent": "ranking", "top_n": 0}}"#;
        assert!(parse_output(OracleTask::Plan, invalid_plan).is_err());
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let oracle = Scripted::new(vec![None, Some(r#"{"reasoning": "r", "text": "Olá"}"#)]);
        let out = gateway(oracle.clone()).try_generate(&request(OracleTask::Paraphrase)).await;
        assert_eq!(
            out,
            Some(OracleOutput::Text {
                reasoning: "r".into(),
                text: "Olá".into()
            })
        );
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_budget() {
        let oracle = Scripted::new(vec![None, None, None, None]);
        let out = gateway(oracle.clone()).try_generate(&request(OracleTask::Plan)).await;
        assert_eq!(out, None);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_not_retried() {
        let oracle = Scripted::new(vec![Some("{\"oops\": true}"), Some(r#"{"reasoning": "r", "text": "x"}"#)]);
        let out = gateway(oracle.clone()).try_generate(&request(OracleTask::Paraphrase)).await;
        assert_eq!(out, None);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let out = gateway(Arc::new(Slow)).try_generate(&request(OracleTask::Paraphrase)).await;
        assert_eq!(out, None);
    }
}
