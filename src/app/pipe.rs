use crate::core::engine::TransformEngine;
use crate::domain::model::{ContextId, ConversionOptions, Payload, Record, TargetType};
use crate::domain::schema::SchemaRegistry;
use crate::utils::error::{Result, TransformError, ViolationMap};
use serde_json::Value;
use std::sync::Arc;

/// 要驗證的參數描述
#[derive(Debug, Clone, Default)]
pub struct ArgumentMetadata {
    pub metatype: Option<TargetType>,
}

impl ArgumentMetadata {
    pub fn of(target: TargetType) -> Self {
        Self { metatype: Some(target) }
    }
}

/// 先非同步轉換、再驗證規則的 pipe
///
/// 成功時回傳原始輸入，轉換結果只用於驗證。
pub struct ValidationPipe {
    engine: Arc<TransformEngine>,
    schemas: Arc<SchemaRegistry>,
}

impl ValidationPipe {
    pub fn new(engine: Arc<TransformEngine>, schemas: Arc<SchemaRegistry>) -> Self {
        Self { engine, schemas }
    }

    pub async fn transform(&self, value: Option<Value>, metadata: &ArgumentMetadata) -> Result<Value> {
        self.run(value, metadata, None).await
    }

    pub async fn transform_scoped(
        &self,
        value: Option<Value>,
        metadata: &ArgumentMetadata,
        context_id: ContextId,
    ) -> Result<Value> {
        self.run(value, metadata, Some(context_id)).await
    }

    async fn run(&self, value: Option<Value>, metadata: &ArgumentMetadata, context_id: Option<ContextId>) -> Result<Value> {
        let value = match value {
            Some(value) if !is_empty(&value) => value,
            _ => return Err(TransformError::NoDataSubmitted),
        };

        let type_key = match &metadata.metatype {
            Some(TargetType::Dto(type_key)) => type_key,
            _ => return Ok(value),
        };

        let options = ConversionOptions::default();
        let transformed = match context_id {
            Some(context_id) => {
                self.engine
                    .apply_transforms_scoped(type_key, &value, &options, context_id)
                    .await?
            }
            None => self.engine.apply_transforms(type_key, &value, &options).await?,
        };

        let errors = match self.schemas.get(type_key) {
            Some(schema) => collect_violations(&transformed, |record| schema.validate(record)),
            None => ViolationMap::new(),
        };

        if !errors.is_empty() {
            tracing::info!("❌ {} failed validation: {:?}", type_key, errors);
            return Err(TransformError::ValidationFailed { errors });
        }

        Ok(value)
    }
}

/// null、空字串、false 與數值 0 都視為沒有資料
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// 批次 payload 的欄位名稱加上索引前綴，例如 `1.age`
fn collect_violations<F>(payload: &Payload, validate: F) -> ViolationMap
where
    F: Fn(&Record) -> ViolationMap,
{
    match payload {
        Payload::Single(record) => validate(record),
        Payload::Batch(records) => records
            .iter()
            .enumerate()
            .flat_map(|(index, record)| {
                validate(record)
                    .into_iter()
                    .map(move |(field, rules)| (format!("{}.{}", index, field), rules))
            })
            .collect(),
    }
}
