//! Eliza - 带长期记忆的对话智能体
//!
//! 模块划分：
//! - **agent**: 对话入口（run_turn / record_turn / submit_memory）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、整轮重试、后台任务调度、Agent 构建
//! - **integrations**: HTTP 接口（feature `server`）
//! - **llm**: 补全网关抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话消息、记忆日志、滚动摘要与存储
//! - **react**: Prompt 拼装与有界工具调用循环
//! - **skills**: 技能目录（skill/*.md）
//! - **tools**: 工具抽象、注册表与执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod integrations;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod skills;
pub mod tools;

pub use agent::{Agent, TurnOptions};
pub use core::{AgentBuilder, AgentError};
pub use react::{ToolCallRecord, TurnOutcome};
