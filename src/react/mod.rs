//! 对话层：Prompt 拼装与有界工具调用循环

pub mod loop_;
pub mod prompt;

pub use loop_::{ToolCallRecord, ToolOrchestrator, TurnOutcome, DEFAULT_MAX_TOOL_LOOPS};
pub use prompt::{detect_sleep, PromptAssembler, SLEEP_MARKER};
