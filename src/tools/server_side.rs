//! 服务端执行的工具（如 web_search / x_search）：由补全服务自行执行，本地调用结果缺省
//!
//! 只登记名称以便解析模型回传的同名调用；不作为 function tool 下发。

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::tools::Tool;

pub struct ServerSideTool {
    name: String,
    description: String,
}

impl ServerSideTool {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = format!("{} (executed by the completion service)", name);
        Self { name, description }
    }
}

#[async_trait]
impl Tool for ServerSideTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn advertised(&self) -> bool {
        false
    }

    async fn invoke(&self, _args: Map<String, Value>) -> Result<Option<Value>, String> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_side_result_is_absent() {
        let tool = ServerSideTool::new("web_search");
        assert_eq!(tool.name(), "web_search");
        assert!(!tool.advertised());
        assert!(tool.invoke(Map::new()).await.unwrap().is_none());
    }
}
