//! 工具参数 JSON Schema 生成（schemars）
//!
//! 由参数结构体派生 schema，保证描述给模型的参数与实际反序列化的结构一致。

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 返回参数结构体的 JSON Schema（去掉 $schema / title 等模型不需要的顶层键）
pub fn args_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    });
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Args {
        /// 搜索词
        query: String,
        limit: Option<usize>,
    }

    #[test]
    fn test_args_schema_shape() {
        let schema = args_schema::<Args>();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["query"].is_object());
        assert_eq!(schema["required"], serde_json::json!(["query"]));
        assert!(schema.get("$schema").is_none());
    }
}
