//! Agent 运行时
//!
//! 供 HTTP 等前端调用的对话入口：
//! run_turn 拼装会话并跑有界工具循环（整轮包在 RetryShell 中），
//! record_turn / submit_memory 把一轮对话写入记忆日志并刷新滚动摘要。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::Instrument;

use crate::core::{AgentError, RetryShell, TaskHandle, TaskScheduler};
use crate::llm::{ChatSession, CompletionGateway};
use crate::memory::{ChatMessage, Memory, TurnRecord};
use crate::react::{PromptAssembler, ToolOrchestrator, TurnOutcome};
use crate::skills::SkillCatalog;
use crate::tools::ToolExecutor;

/// 单轮选项；未指定的字段取自 [agent] / [llm] 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOptions {
    pub use_memory: bool,
    pub model: String,
    pub max_tool_loops: usize,
}

/// 对话智能体：可跨请求共享，每轮拥有独立的 ChatSession
pub struct Agent {
    pub(crate) gateway: Arc<dyn CompletionGateway>,
    pub(crate) executor: ToolExecutor,
    pub(crate) memory: Arc<Memory>,
    pub(crate) skills: SkillCatalog,
    pub(crate) persona_path: Option<PathBuf>,
    pub(crate) retry: RetryShell,
    pub(crate) scheduler: TaskScheduler,
    pub(crate) defaults: TurnOptions,
}

impl Agent {
    /// 配置给出的默认选项
    pub fn default_options(&self) -> TurnOptions {
        self.defaults.clone()
    }

    pub fn memory(&self) -> &Arc<Memory> {
        &self.memory
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.executor.tool_names()
    }

    /// 跑一轮对话：messages 为空返回 InvalidRequest；传输类错误整轮重试
    pub async fn run_turn(
        &self,
        messages: &[ChatMessage],
        options: &TurnOptions,
    ) -> Result<TurnOutcome, AgentError> {
        if messages.is_empty() {
            return Err(AgentError::InvalidRequest("messages must not be empty".to_string()));
        }
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "turn",
            request_id = %request_id,
            model = %options.model,
            use_memory = options.use_memory
        );

        async {
            let outcome = self
                .retry
                .run(|attempt| async move {
                    tracing::debug!(attempt, "starting turn attempt");
                    let session = self.build_session(messages, options).await?;
                    ToolOrchestrator::new(self.gateway.as_ref(), &self.executor)
                        .with_max_tool_loops(options.max_tool_loops)
                        .run(session)
                        .await
                })
                .await?;
            tracing::info!(
                tools_called = outcome.tool_history.len(),
                sleep = outcome.sleep,
                total_tokens = self.gateway.token_usage().2,
                "turn finished"
            );
            Ok::<_, AgentError>(outcome)
        }
        .instrument(span)
        .await
    }

    /// 同步处理一轮记忆：追加日志（messages 非空时）并刷新摘要
    pub async fn record_turn(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<TurnRecord, AgentError> {
        self.memory.record_turn(messages, model).await
    }

    /// 提交后台记忆任务；立即返回句柄，丢弃句柄不影响任务执行
    pub fn submit_memory(&self, messages: Vec<ChatMessage>, model: String) -> TaskHandle<TurnRecord> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let memory = self.memory.clone();
        self.scheduler.submit(request_id, async move {
            tracing::info!(messages = messages.len(), "processing memory");
            memory.record_turn(&messages, &model).await
        })
    }

    async fn build_session(
        &self,
        messages: &[ChatMessage],
        options: &TurnOptions,
    ) -> Result<ChatSession, AgentError> {
        let persona = match &self.persona_path {
            Some(path) => read_persona(path).await?,
            None => None,
        };
        let summary = if options.use_memory {
            self.memory.summary().await?
        } else {
            None
        };

        let prompt = PromptAssembler::new()
            .with_persona(persona.as_deref())
            .with_summary(summary.as_ref())
            .with_skills(&self.skills)
            .assemble(messages);

        let mut session = ChatSession::new(options.model.clone(), self.executor.describe());
        for m in prompt {
            session.append(m);
        }
        Ok(session)
    }
}

/// 读取人格文档；文件不存在视为无人格
async fn read_persona(path: &Path) -> Result<Option<String>, AgentError> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
