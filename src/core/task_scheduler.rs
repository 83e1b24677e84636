//! 后台任务调度：记忆处理等不阻塞响应的工作
//!
//! submit 显式提交任务并返回带独立结果通道的句柄；丢弃句柄即丢弃结果，任务本身照常执行。
//! 任务失败时记录 error 日志，不影响调用方。

use std::future::Future;

use tokio::sync::oneshot;
use tracing::Instrument;

use crate::core::AgentError;

/// 已提交任务的句柄
#[derive(Debug)]
pub struct TaskHandle<T> {
    request_id: String,
    receiver: oneshot::Receiver<Result<T, AgentError>>,
}

impl<T> TaskHandle<T> {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// 等待任务结束；任务在返回前 panic 或被取消时为 TaskDropped
    pub async fn wait(self) -> Result<T, AgentError> {
        self.receiver
            .await
            .map_err(|_| AgentError::TaskDropped(self.request_id))?
    }
}

/// 后台任务调度器
#[derive(Debug, Default, Clone)]
pub struct TaskScheduler;

impl TaskScheduler {
    pub fn new() -> Self {
        Self
    }

    /// 在当前 tokio 运行时上启动任务，任务运行在带 request_id 的 span 中
    pub fn submit<T, F>(&self, request_id: impl Into<String>, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, AgentError>> + Send + 'static,
    {
        let request_id = request_id.into();
        let (tx, rx) = oneshot::channel();
        let span = tracing::info_span!("memory_task", request_id = %request_id);
        tokio::spawn(
            async move {
                let result = task.await;
                match &result {
                    Ok(_) => tracing::info!("background task finished"),
                    Err(e) => tracing::error!(error = %e, "background task failed"),
                }
                // 接收端已丢弃时结果直接丢弃
                let _ = tx.send(result);
            }
            .instrument(span),
        );
        TaskHandle {
            request_id,
            receiver: rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_wait_returns_result() {
        let handle = TaskScheduler::new().submit("req-1", async { Ok(42) });
        assert_eq!(handle.request_id(), "req-1");
        assert_eq!(handle.wait().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_failure_reaches_handle() {
        let handle = TaskScheduler::new()
            .submit("req-2", async { Err::<(), _>(AgentError::Storage("full".to_string())) });
        assert!(matches!(handle.wait().await, Err(AgentError::Storage(_))));
    }

    #[tokio::test]
    async fn test_dropped_handle_still_runs_task() {
        let done = Arc::new(Notify::new());
        let signal = done.clone();
        let handle = TaskScheduler::new().submit("req-3", async move {
            signal.notify_one();
            Ok(())
        });
        drop(handle);
        tokio::time::timeout(std::time::Duration::from_secs(5), done.notified())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_panicking_task_is_dropped() {
        let handle = TaskScheduler::new().submit("req-4", async {
            if true {
                panic!("boom");
            }
            Ok::<(), AgentError>(())
        });
        assert!(matches!(handle.wait().await, Err(AgentError::TaskDropped(ref id)) if id == "req-4"));
    }
}
