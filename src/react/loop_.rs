//! 工具调用主循环
//!
//! SAMPLING → (TOOL_EXECUTING → CONTINUING → SAMPLING)* → DONE，最多 K 次决策迭代。
//! 最后一次迭代仍使用了工具时，追加「立即作答」系统消息并关闭工具再采样一次。

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::llm::{ChatSession, Completion, CompletionGateway, ToolCallRequest};
use crate::memory::Message;
use crate::react::prompt::detect_sleep;
use crate::tools::ToolExecutor;

/// 默认决策迭代预算
pub const DEFAULT_MAX_TOOL_LOOPS: usize = 5;

const FORCE_FINAL_PROMPT: &str = "You have used all available tool iterations. \
    Do not call any more tools. Answer the user now using the information you already have.";

fn remaining_prompt(remaining: usize) -> String {
    format!(
        "You may call tools {} more time(s) in this turn. Answer directly once you have enough information.",
        remaining
    )
}

/// 单次工具调用记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
    pub result: Option<Value>,
}

/// 一轮循环的输出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub content: String,
    pub sleep: bool,
    pub tool_history: Vec<ToolCallRecord>,
}

impl TurnOutcome {
    fn finish(content: String, tool_history: Vec<ToolCallRecord>) -> Self {
        let sleep = detect_sleep(&content);
        Self {
            content,
            sleep,
            tool_history,
        }
    }
}

/// 工具调用编排器：每次 run 拥有自己的 ChatSession，互不共享
pub struct ToolOrchestrator<'a> {
    gateway: &'a dyn CompletionGateway,
    executor: &'a ToolExecutor,
    max_tool_loops: usize,
}

impl<'a> ToolOrchestrator<'a> {
    pub fn new(gateway: &'a dyn CompletionGateway, executor: &'a ToolExecutor) -> Self {
        Self {
            gateway,
            executor,
            max_tool_loops: DEFAULT_MAX_TOOL_LOOPS,
        }
    }

    pub fn with_max_tool_loops(mut self, max_tool_loops: usize) -> Self {
        self.max_tool_loops = max_tool_loops;
        self
    }

    pub async fn run(&self, mut session: ChatSession) -> Result<TurnOutcome, AgentError> {
        let k = self.max_tool_loops;
        let mut history = Vec::new();

        for iteration in 1..=k {
            let completion = self.gateway.sample(&session).await?;
            if completion.tool_calls.is_empty() {
                tracing::debug!(iteration, "final answer without tool calls");
                return Ok(TurnOutcome::finish(completion.content, history));
            }

            let used = self.execute_calls(&completion, &mut history).await?;
            if used.is_empty() {
                tracing::debug!(iteration, "no tool produced a result, finishing");
                return Ok(TurnOutcome::finish(completion.content, history));
            }

            let calls: Vec<ToolCallRequest> = used.iter().map(|(call, _)| call.clone()).collect();
            session.append(Message::assistant_tool_calls(completion.content, calls));
            for (call, result) in used {
                session.append(Message::tool_result(call.id, result.to_string()));
            }

            if iteration < k {
                session.append(Message::system(remaining_prompt(k - iteration)));
            }
        }

        tracing::info!(max_tool_loops = k, "tool budget exhausted, forcing final answer");
        session.append(Message::system(FORCE_FINAL_PROMPT));
        session.disable_tools();
        let completion = self.gateway.sample(&session).await?;
        if !completion.tool_calls.is_empty() {
            let names: Vec<&str> = completion.tool_calls.iter().map(|c| c.name.as_str()).collect();
            tracing::warn!(tools = ?names, "ignoring tool calls returned by forced final sample");
        }
        Ok(TurnOutcome::finish(completion.content, history))
    }

    /// 按顺序执行本次补全中的全部工具调用；返回产生了具体结果的调用
    async fn execute_calls(
        &self,
        completion: &Completion,
        history: &mut Vec<ToolCallRecord>,
    ) -> Result<Vec<(ToolCallRequest, Value)>, AgentError> {
        let mut used = Vec::new();
        for call in &completion.tool_calls {
            let arguments = parse_arguments(&call.arguments);
            let result = self.executor.invoke(&call.name, arguments.clone()).await?;
            history.push(ToolCallRecord {
                tool_name: call.name.clone(),
                arguments,
                result: result.clone(),
            });
            if let Some(value) = result {
                used.push((call.clone(), value));
            }
        }
        Ok(used)
    }
}

/// 解析工具参数：空串、非法 JSON 或非对象一律视为空映射
fn parse_arguments(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            if !raw.trim().is_empty() {
                tracing::warn!(arguments = %other, "tool arguments are not an object, using empty mapping");
            }
            Map::new()
        }
        Err(e) => {
            if !raw.trim().is_empty() {
                tracing::warn!(error = %e, "malformed tool arguments, using empty mapping");
            }
            Map::new()
        }
    }
}
