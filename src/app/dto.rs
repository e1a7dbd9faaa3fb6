use crate::adapters::container::ContainerBuilder;
use crate::core::registry::TransformRegistryBuilder;
use crate::domain::model::{FieldContext, TargetType};
use crate::domain::ports::Transformer;
use crate::domain::schema::{DtoSchema, FieldSchema, Rule, SchemaRegistry};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub const CREATE_DTO: &str = "CreateDto";
pub const TRIM_TRANSFORMER: &str = "TrimTransformer";

/// `size` 的模擬非同步延遲
pub const SIZE_TRANSFORM_DELAY: Duration = Duration::from_millis(500);

pub fn create_dto_target() -> TargetType {
    TargetType::dto(CREATE_DTO)
}

/// 去除字串前後空白；非字串原樣回傳
pub struct TrimTransformer;

#[async_trait]
impl Transformer for TrimTransformer {
    async fn transform(&self, ctx: FieldContext<'_>) -> Result<Value> {
        Ok(match ctx.value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        })
    }
}

/// 整數維持整數
fn double(value: &Value) -> Option<Value> {
    match value.as_i64() {
        Some(n) => n.checked_mul(2).map(Value::from),
        None => value.as_f64().map(|n| json!(n * 2.0)),
    }
}

pub fn register_create_dto(schemas: &mut SchemaRegistry, transforms: &mut TransformRegistryBuilder) {
    schemas.register(
        DtoSchema::new(CREATE_DTO)
            .field(FieldSchema::new("name").rule(Rule::IsNotEmpty).rule(Rule::IsString))
            .field(
                FieldSchema::new("age")
                    .rule(Rule::IsNotEmpty)
                    .rule(Rule::IsNumber)
                    .rule(Rule::Equals(json!(6)))
                    .transform(|value, _| {
                        let doubled = double(value).unwrap_or_else(|| value.clone());
                        tracing::debug!("new value: {}", doubled);
                        doubled
                    }),
            )
            .field(FieldSchema::new("size").rule(Rule::IsNotEmpty).rule(Rule::IsNumber)),
    );

    transforms
        .declare_resolved_transform(CREATE_DTO, "name", TRIM_TRANSFORMER, None)
        .declare_inline_transform(
            CREATE_DTO,
            "size",
            |ctx| {
                Box::pin(async move {
                    tokio::time::sleep(SIZE_TRANSFORM_DELAY).await;
                    // 非數字保留原值，交給 isNumber 回報
                    let doubled = double(&ctx.value).unwrap_or(ctx.value);
                    ctx.obj.set(ctx.key, doubled.clone());
                    Ok(doubled)
                })
            },
            None,
        );
}

pub fn register_transformers(container: ContainerBuilder) -> ContainerBuilder {
    container.singleton(TRIM_TRANSFORMER, TrimTransformer)
}
