use crate::core::context::{TransformContext, UseContainerOptions};
use crate::core::registry::TransformRegistry;
use crate::domain::model::{
    ContextId, ConversionOptions, FieldContext, Payload, Record, TransformEntry, TransformKind, TransformationKind,
    TypeKey,
};
use crate::domain::ports::{InstanceConverter, ServiceContainer};
use crate::utils::error::{Result, TransformError};
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// 非同步欄位轉換的協調者
///
/// 先把 payload 轉成型別化實例，再依宣告順序逐一套用欄位轉換。批次 payload
/// 的同一個宣告會同時派送給所有實例，全部完成後才進入下一個宣告。
pub struct TransformEngine {
    registry: Arc<TransformRegistry>,
    converter: Arc<dyn InstanceConverter>,
    context: OnceLock<TransformContext>,
}

impl TransformEngine {
    pub fn new(registry: Arc<TransformRegistry>, converter: Arc<dyn InstanceConverter>) -> Self {
        Self {
            registry,
            converter,
            context: OnceLock::new(),
        }
    }

    /// 只能呼叫一次
    pub fn use_container(&self, container: Arc<dyn ServiceContainer>, options: UseContainerOptions) -> Result<()> {
        self.context
            .set(TransformContext::new(container, options))
            .map_err(|_| TransformError::DoubleInitialization)?;
        tracing::info!("🔧 Async transform context initialized");
        Ok(())
    }

    pub fn context(&self) -> Result<&TransformContext> {
        self.context.get().ok_or(TransformError::NotInitialized)
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub async fn apply_transforms(
        &self,
        type_key: &TypeKey,
        payload: &Value,
        options: &ConversionOptions,
    ) -> Result<Payload> {
        let context = self.context()?;
        self.run(context, type_key, payload, options).await
    }

    /// 以指定請求範圍執行，scoped transformer 會綁定到 `context_id`
    ///
    /// 呼叫結束（含失敗或被取消）時釋放該範圍的實例。
    pub async fn apply_transforms_scoped(
        &self,
        type_key: &TypeKey,
        payload: &Value,
        options: &ConversionOptions,
        context_id: ContextId,
    ) -> Result<Payload> {
        let context = self.context()?.for_request(context_id);
        let _scope = ScopeGuard(&context);
        self.run(&context, type_key, payload, options).await
    }

    async fn run(
        &self,
        context: &TransformContext,
        type_key: &TypeKey,
        payload: &Value,
        options: &ConversionOptions,
    ) -> Result<Payload> {
        let entries = self.registry.list(type_key);
        let mut converted = self.convert(type_key, payload, options)?;

        tracing::debug!(
            "Applying {} transform(s) to {} {} instance(s)",
            entries.len(),
            converted.records().len(),
            type_key
        );

        for entry in entries {
            match &mut converted {
                Payload::Single(record) => {
                    apply_entry(context, entry, record, options).await?;
                }
                Payload::Batch(records) => {
                    try_join_all(
                        records
                            .iter_mut()
                            .map(|record| apply_entry(context, entry, record, options)),
                    )
                    .await?;
                }
            }
        }

        Ok(converted)
    }

    fn convert(&self, type_key: &TypeKey, payload: &Value, options: &ConversionOptions) -> Result<Payload> {
        match payload {
            Value::Array(items) => {
                let records = items
                    .iter()
                    .map(|item| self.converter.plain_to_instance(type_key, item, options))
                    .collect::<Result<Vec<Record>>>()?;
                Ok(Payload::Batch(records))
            }
            plain => Ok(Payload::Single(self.converter.plain_to_instance(type_key, plain, options)?)),
        }
    }
}

struct ScopeGuard<'a>(&'a TransformContext);

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// 對單一實例套用一個宣告，結果寫回該欄位
async fn apply_entry(
    context: &TransformContext,
    entry: &TransformEntry,
    record: &mut Record,
    base: &ConversionOptions,
) -> Result<()> {
    let key = entry.property_key.as_str();
    let merged = entry.options.merged_with(base);
    let value = record.get(key).cloned().unwrap_or(Value::Null);

    let transformed = match &entry.options.kind {
        Some(TransformKind::Inline(body)) => {
            let ctx = FieldContext {
                value,
                key,
                obj: record,
                kind: TransformationKind::PlainToClass,
                options: &merged,
            };
            Some(body(ctx).await?)
        }
        Some(TransformKind::Resolved(reference)) => match context.get_transformer(reference, &merged).await? {
            Some(transformer) => {
                let ctx = FieldContext {
                    value,
                    key,
                    obj: record,
                    kind: TransformationKind::PlainToClass,
                    options: &merged,
                };
                Some(transformer.transform(ctx).await?)
            }
            None => None,
        },
        None => {
            return Err(TransformError::InvalidTransformConfiguration { key: key.to_string() });
        }
    };

    if let Some(value) = transformed {
        tracing::debug!("Field '{}' rewritten to {}", key, value);
        record.set(key, value);
    }

    Ok(())
}
