//! 工具参数 JSON Schema 生成（schemars）
//!
//! 参数结构体上的文档注释即字段描述，生成的 schema 直接作为工具目录的 parameters 提供给模型。

use schemars::{schema_for, JsonSchema};
use serde_json::{json, Value};

/// 返回 T 的参数 schema（去掉 $schema / title 等模型不需要的元信息）
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.insert("type".to_string(), json!("object"));
        obj.entry("properties").or_insert_with(|| json!({}));
        obj.entry("required").or_insert_with(|| json!([]));
    }
    value
}
