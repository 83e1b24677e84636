//! 整轮重试外壳
//!
//! 对整轮操作（构建会话 + 工具循环）做最多 R 次尝试，无退避；是否重试交给 RecoveryEngine 判定。

use std::future::Future;

use crate::core::{AgentError, RecoveryAction, RecoveryEngine};

/// 默认整轮最多尝试次数
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

pub struct RetryShell {
    recovery: RecoveryEngine,
    max_attempts: usize,
}

impl RetryShell {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            recovery: RecoveryEngine::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// 执行 op，attempt 从 1 开始传入；每次尝试都从头开始，不复用上一次的中间状态
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, AgentError>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, AgentError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) => match self.recovery.handle(&e, attempt, self.max_attempts) {
                    RecoveryAction::Retry => {
                        tracing::warn!(
                            attempt,
                            max_attempts = self.max_attempts,
                            error = %e,
                            "turn failed, retrying"
                        );
                        attempt += 1;
                    }
                    RecoveryAction::Abort => return Err(e),
                },
            }
        }
    }
}

impl Default for RetryShell {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failure() {
        let calls = AtomicUsize::new(0);
        let shell = RetryShell::new(3);
        let out = shell
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 1 {
                        Err(AgentError::Llm(LlmError::Request("reset".to_string())))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(out, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_surface_last_error() {
        let calls = AtomicUsize::new(0);
        let shell = RetryShell::new(3);
        let err = shell
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(AgentError::Storage("disk unavailable".to_string())) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Storage(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let shell = RetryShell::new(3);
        let err = shell
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(AgentError::UnknownTool("teleport".to_string())) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryShell::new(0).max_attempts(), 1);
    }
}
