//! 错误恢复引擎
//!
//! 根据 AgentError 类型与已用尝试次数返回 RecoveryAction，供 RetryShell 决定是否重跑整轮。

use crate::core::{AgentError, RecoveryAction};

/// 将错误映射为动作：传输错误在尝试次数未耗尽时重试，其余终止
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// attempt 从 1 开始计数；max_attempts 为整轮最多尝试次数
    pub fn handle(&self, err: &AgentError, attempt: usize, max_attempts: usize) -> RecoveryAction {
        if err.is_retryable() && attempt < max_attempts {
            RecoveryAction::Retry
        } else {
            RecoveryAction::Abort
        }
    }
}
