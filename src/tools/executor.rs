//! 工具执行器
//!
//! 持有 ToolRegistry 与单次调用超时；invoke(tool_name, args) 顺序执行单个工具。
//! 工具失败或超时记为「结果缺省」，不终止本轮；未注册的工具名返回 UnknownTool，终止本轮。
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::{ToolRegistry, ToolSpec};

/// 工具执行器：对每次调用施加超时，并吸收工具自身的错误
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行指定工具：Ok(Some) 为具体结果，Ok(None) 为缺省（失败 / 超时 / 服务端工具）
    pub async fn invoke(
        &self,
        tool_name: &str,
        args: Map<String, Value>,
    ) -> Result<Option<Value>, AgentError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| AgentError::UnknownTool(tool_name.to_string()))?;

        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, tool.invoke(args)).await;

        let outcome = match &result {
            Ok(Ok(Some(v))) if !is_empty_result(v) => "ok",
            Ok(Ok(_)) => "absent",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "tool");

        match result {
            Ok(Ok(Some(v))) if !is_empty_result(&v) => Ok(Some(v)),
            Ok(Ok(_)) => Ok(None),
            Ok(Err(e)) => {
                tracing::warn!(tool = %tool_name, error = %e, "tool invocation failed");
                Ok(None)
            }
            Err(_) => {
                tracing::warn!(tool = %tool_name, timeout_secs = self.timeout.as_secs(), "tool invocation timed out");
                Ok(None)
            }
        }
    }

    pub fn describe(&self) -> Vec<ToolSpec> {
        self.registry.describe()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }
}

/// null 与空对象都视为结果缺省
fn is_empty_result(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn args_preview(args: &Map<String, Value>) -> String {
    let s = Value::Object(args.clone()).to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn invoke(&self, _args: Map<String, Value>) -> Result<Option<Value>, String> {
            Err("boom".to_string())
        }
    }

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        async fn invoke(&self, _args: Map<String, Value>) -> Result<Option<Value>, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(serde_json::json!({"done": true})))
        }
    }

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echo args"
        }

        async fn invoke(&self, args: Map<String, Value>) -> Result<Option<Value>, String> {
            Ok(Some(Value::Object(args)))
        }
    }

    fn executor(timeout_secs: u64) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(Failing);
        registry.register(Slow);
        registry.register(Echo);
        ToolExecutor::new(registry, timeout_secs)
    }

    #[tokio::test]
    async fn test_invoke_returns_result() {
        let mut args = Map::new();
        args.insert("text".to_string(), Value::from("hi"));
        let out = executor(5).invoke("echo", args).await.unwrap();
        assert_eq!(out, Some(serde_json::json!({"text": "hi"})));
    }

    #[tokio::test]
    async fn test_empty_object_result_is_absent() {
        let out = executor(5).invoke("echo", Map::new()).await.unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_tool_error_is_absent() {
        let out = executor(5).invoke("failing", Map::new()).await.unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_tool_timeout_is_absent() {
        let out = executor(1).invoke("slow", Map::new()).await.unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error() {
        let err = executor(5).invoke("switchbot_turn_on", Map::new()).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(name) if name == "switchbot_turn_on"));
    }

    #[test]
    fn test_args_preview_truncates() {
        let mut args = Map::new();
        args.insert("text".to_string(), Value::from("a".repeat(500)));
        let preview = args_preview(&args);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 203);
    }
}
