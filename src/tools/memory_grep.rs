//! memory_grep 工具：让模型按正则检索过去的对话日志

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::memory::MemoryLog;
use crate::tools::{args_schema, Tool};

/// 默认返回条数
pub const DEFAULT_GREP_LIMIT: usize = 10;

#[derive(Debug, Deserialize, JsonSchema)]
struct GrepArgs {
    /// Regular expression to search for
    pattern: String,
    /// Maximum number of entries to return (default: 10)
    limit: Option<usize>,
}

/// 会话日志检索工具
pub struct MemoryGrepTool {
    log: Arc<MemoryLog>,
    default_limit: usize,
}

impl MemoryGrepTool {
    pub fn new(log: Arc<MemoryLog>) -> Self {
        Self {
            log,
            default_limit: DEFAULT_GREP_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }
}

#[async_trait]
impl Tool for MemoryGrepTool {
    fn name(&self) -> &str {
        "memory_grep"
    }

    fn description(&self) -> &str {
        "Search past conversation logs with a regular expression. \
         Use it for questions like \"did we talk about X before?\" or \"have I looked into Y?\". \
         Returns up to `limit` entries, newest first."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<GrepArgs>()
    }

    async fn invoke(&self, args: Map<String, Value>) -> Result<Option<Value>, String> {
        let args: GrepArgs =
            serde_json::from_value(Value::Object(args)).map_err(|e| e.to_string())?;
        let limit = args.limit.unwrap_or(self.default_limit);

        let result = match self.log.grep(&args.pattern, limit).await {
            Ok(hits) => json!({
                "status": "ok",
                "pattern": args.pattern,
                "count": hits.len(),
                "results": hits,
            }),
            Err(e) => json!({
                "status": "error",
                "message": e.to_string(),
            }),
        };
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockGateway;
    use crate::memory::InMemoryStore;

    fn tool(lines: &[&str]) -> MemoryGrepTool {
        let store = Arc::new(InMemoryStore::with_lines(lines.iter().copied()));
        MemoryGrepTool::new(Arc::new(MemoryLog::new(store, Arc::new(MockGateway::new()))))
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_grep_tool_ok() {
        let t = tool(&[r#"{"summary":"camping trip"}"#, r#"{"summary":"cooking"}"#]);
        let out = t.invoke(args(json!({"pattern": "camp"}))).await.unwrap().unwrap();
        assert_eq!(out["status"], "ok");
        assert_eq!(out["count"], 1);
        assert_eq!(out["results"][0]["summary"], "camping trip");
    }

    #[tokio::test]
    async fn test_grep_tool_respects_limit() {
        let t = tool(&["a1", "a2", "a3"]);
        let out = t
            .invoke(args(json!({"pattern": "a", "limit": 2})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out["count"], 2);
        assert_eq!(out["results"][0]["raw"], "a3");
    }

    #[tokio::test]
    async fn test_grep_tool_bad_pattern_reports_error() {
        let out = tool(&[])
            .invoke(args(json!({"pattern": "("})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out["status"], "error");
    }

    #[tokio::test]
    async fn test_grep_tool_missing_pattern_fails() {
        assert!(tool(&[]).invoke(Map::new()).await.is_err());
    }

    #[test]
    fn test_schema_requires_pattern() {
        let schema = tool(&[]).parameters_schema();
        assert_eq!(schema["required"], json!(["pattern"]));
    }
}
