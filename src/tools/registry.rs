//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / invoke），
//! 启动时按精确名称注册；分发是一次查表，不做前缀匹配。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// 提供给模型的工具描述：名称、说明、参数 JSON Schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步调用
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（模型 tool call 中的 function name）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 是否作为 function tool 下发给模型；由服务端自行执行的工具不下发
    fn advertised(&self) -> bool {
        true
    }

    /// 执行工具。Ok(None) 表示结果缺省（如由服务端执行的工具），不算本轮「用了工具」
    async fn invoke(&self, args: Map<String, Value>) -> Result<Option<Value>, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，名称有序以保证 schema 顺序稳定
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "tool registered twice, keeping the last one");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// describe()：下发给模型的工具 ToolSpec（跳过服务端执行的占位工具）
    pub fn describe(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .filter(|t| t.advertised())
            .map(|t| ToolSpec::new(t.name(), t.description(), t.parameters_schema()))
            .collect()
    }
}
