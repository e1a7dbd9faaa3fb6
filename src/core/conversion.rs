use crate::domain::model::{ConversionOptions, Record, TypeKey};
use crate::domain::ports::InstanceConverter;
use crate::domain::schema::SchemaRegistry;
use crate::utils::error::{Result, TransformError};
use serde_json::{Map, Value};
use std::sync::Arc;

/// 依 DTO schema 把 plain JSON 物件轉成型別化實例
///
/// 沒有 schema 的型別原樣複製欄位。
pub struct SchemaConverter {
    schemas: Arc<SchemaRegistry>,
}

impl SchemaConverter {
    pub fn new(schemas: Arc<SchemaRegistry>) -> Self {
        Self { schemas }
    }
}

impl InstanceConverter for SchemaConverter {
    fn plain_to_instance(&self, type_key: &TypeKey, plain: &Value, options: &ConversionOptions) -> Result<Record> {
        let source = plain.as_object().ok_or_else(|| TransformError::ConversionFailed {
            message: format!("{} expects a JSON object, got {}", type_key, json_kind(plain)),
        })?;

        let schema = match self.schemas.get(type_key) {
            Some(schema) => schema,
            None => return Ok(Record::new(type_key.clone(), source.clone())),
        };

        let mut data = if options.exclude_extraneous_values.unwrap_or(false) {
            source
                .iter()
                .filter(|(key, _)| schema.is_declared(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Map<String, Value>>()
        } else {
            source.clone()
        };

        if options.expose_default_values.unwrap_or(false) {
            for field in &schema.fields {
                if let Some(default) = &field.default {
                    data.entry(field.name.clone()).or_insert_with(|| default.clone());
                }
            }
        }

        // 同步轉換只作用於存在的欄位
        for field in &schema.fields {
            if let Some(transform) = &field.transform {
                if let Some(value) = data.get(&field.name) {
                    let converted = transform(value, source);
                    data.insert(field.name.clone(), converted);
                }
            }
        }

        Ok(Record::new(type_key.clone(), data))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
