//! OpenAI 兼容 API 网关
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url，默认 xAI）；
//! 支持 function tools，强制最终回答时以 tool_choice `none` 禁止工具调用。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
};
use async_openai::Client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::{ChatSession, Completion, CompletionGateway, LlmError, ToolCallRequest};
use crate::memory::{Message, Role};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容网关：持有 async_openai Client 与单次请求超时
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    timeout: Duration,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiGateway {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(base_url.trim_end_matches('/'))
            .with_api_key(api_key);

        Self {
            client: Client::with_config(config),
            timeout: Duration::from_secs(timeout_secs),
            usage: TokenUsage::new(),
        }
    }

    /// 从配置创建：API Key 优先取 [llm].api_key，否则读 [llm].api_key_env 指定的环境变量；缺失为致命配置错误
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AgentError> {
        let api_key = cfg
            .llm
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&cfg.llm.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::Config(format!("{} is not set", cfg.llm.api_key_env)))?;

        Ok(Self::new(&cfg.llm.base_url, &api_key, cfg.llm.timeouts.request))
    }

    fn build_request(&self, session: &ChatSession) -> Result<CreateChatCompletionRequest, LlmError> {
        let messages = session
            .messages()
            .iter()
            .map(to_openai_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut request = CreateChatCompletionRequest {
            model: session.model().to_string(),
            messages,
            ..Default::default()
        };

        if !session.tools().is_empty() {
            let tools: Vec<Value> = session
                .tools()
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            request.tools = Some(from_json(Value::Array(tools))?);
            if !session.tools_enabled() {
                request.tool_choice = Some(from_json(json!("none"))?);
            }
        }

        Ok(request)
    }
}

fn to_openai_message(m: &Message) -> Result<ChatCompletionRequestMessage, LlmError> {
    let message = match m.role {
        Role::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(m.content.clone())
                .build()
                .map_err(map_openai_error)?,
        ),
        Role::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(m.content.clone())
                .build()
                .map_err(map_openai_error)?,
        ),
        Role::Assistant if m.tool_calls.is_empty() => ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(m.content.clone())
                .build()
                .map_err(map_openai_error)?,
        ),
        Role::Assistant => {
            let calls: Vec<Value> = m
                .tool_calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": { "name": c.name, "arguments": c.arguments }
                    })
                })
                .collect();
            let content = if m.content.is_empty() {
                None
            } else {
                Some(ChatCompletionRequestAssistantMessageContent::Text(m.content.clone()))
            };
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content,
                refusal: None,
                name: None,
                audio: None,
                tool_calls: Some(from_json(Value::Array(calls))?),
                function_call: None,
            })
        }
        Role::ToolResult => ChatCompletionRequestMessage::Tool(
            ChatCompletionRequestToolMessageArgs::default()
                .tool_call_id(m.tool_call_id.clone().unwrap_or_default())
                .content(m.content.clone())
                .build()
                .map_err(map_openai_error)?,
        ),
    };
    Ok(message)
}

/// 工具 schema、tool_choice 与工具调用按 OpenAI 线上格式写出，再解码为 async_openai 的对应类型
fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, LlmError> {
    serde_json::from_value(value).map_err(|e| LlmError::Decode(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct ReturnedToolCall {
    #[serde(default)]
    id: String,
    /// 非 function 类工具调用（如 custom）没有该字段，直接跳过
    function: Option<ReturnedFunction>,
}

#[derive(Debug, Deserialize)]
struct ReturnedFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// 响应中的 tool_calls 转为 ToolCallRequest（只保留 function 调用）
fn to_tool_calls<T: Serialize>(calls: &[T]) -> Result<Vec<ToolCallRequest>, LlmError> {
    let value = serde_json::to_value(calls).map_err(|e| LlmError::Decode(e.to_string()))?;
    let returned: Vec<ReturnedToolCall> = from_json(value)?;
    Ok(returned
        .into_iter()
        .filter_map(|c| {
            c.function
                .map(|f| ToolCallRequest::new(c.id, f.name, f.arguments))
        })
        .collect())
}

/// async_openai 错误映射为 LlmError；ApiError 不带 HTTP 状态码，按 type / code 归到对应状态
fn map_openai_error(err: OpenAIError) -> LlmError {
    match err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let kind = api_err.r#type.as_deref().unwrap_or("");
            let status = if code == "invalid_api_key"
                || kind == "authentication_error"
                || api_err.message.contains("Incorrect API key")
            {
                401
            } else if code == "rate_limit_exceeded" || kind == "rate_limit_error" {
                429
            } else if code == "server_error" || kind == "server_error" || kind == "overloaded_error" {
                503
            } else {
                400
            };
            LlmError::Api {
                status,
                message: api_err.message,
            }
        }
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) => LlmError::Api {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => LlmError::Request(e.to_string()),
        },
        OpenAIError::JSONDeserialize(e, _) => LlmError::Decode(e.to_string()),
        other => LlmError::Request(other.to_string()),
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn sample(&self, session: &ChatSession) -> Result<Completion, LlmError> {
        let request = self.build_request(session)?;
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Request(format!("timed out after {:?}", self.timeout)))?
            .map_err(map_openai_error)?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(LlmError::EmptyResponse)?;

        let tool_calls = match &message.tool_calls {
            Some(calls) => to_tool_calls(calls.as_slice())?,
            None => Vec::new(),
        };

        Ok(Completion {
            content: message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}
