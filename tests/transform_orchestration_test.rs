use async_transform::core::conversion::SchemaConverter;
use async_transform::core::registry::TransformRegistryBuilder;
use async_transform::domain::ports::ResolverOptions;
use async_transform::domain::schema::SchemaRegistry;
use async_transform::{
    ContainerBuilder, ContextId, ConversionOptions, FieldContext, InMemoryContainer, Result, TransformEngine,
    TransformError, TransformOptions, TransformRegistry, Transformer, TransformerRef, TransformerResolver,
    TransformerToken, TypeKey, UseContainerOptions,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct UpperCase;

#[async_trait]
impl Transformer for UpperCase {
    async fn transform(&self, ctx: FieldContext<'_>) -> Result<Value> {
        Ok(match ctx.value {
            Value::String(s) => Value::String(s.to_uppercase()),
            other => other,
        })
    }
}

/// 每個實例帶著建立它的請求範圍 id
struct StampContext(ContextId);

#[async_trait]
impl Transformer for StampContext {
    async fn transform(&self, _ctx: FieldContext<'_>) -> Result<Value> {
        Ok(json!(self.0.get()))
    }
}

fn engine_with(declare: impl FnOnce(&mut TransformRegistryBuilder), container: ContainerBuilder) -> TransformEngine {
    engine_with_options(declare, container, UseContainerOptions::default())
}

fn engine_with_options(
    declare: impl FnOnce(&mut TransformRegistryBuilder),
    container: ContainerBuilder,
    options: UseContainerOptions,
) -> TransformEngine {
    let mut builder = TransformRegistry::builder();
    declare(&mut builder);

    let engine = TransformEngine::new(
        builder.build(),
        Arc::new(SchemaConverter::new(Arc::new(SchemaRegistry::new()))),
    );
    engine.use_container(container.build(), options).unwrap();
    engine
}

fn item() -> TypeKey {
    TypeKey::from("Item")
}

#[tokio::test]
async fn test_later_entry_observes_earlier_mutation() -> anyhow::Result<()> {
    let engine = engine_with(
        |builder| {
            builder
                .declare_inline_transform(
                    "Item",
                    "x",
                    |ctx| Box::pin(async move { Ok(json!(ctx.value.as_i64().unwrap_or(0) * 2)) }),
                    None,
                )
                .declare_inline_transform(
                    "Item",
                    "y",
                    |ctx| {
                        Box::pin(async move {
                            let x = ctx.obj.get("x").and_then(Value::as_i64).unwrap_or(0);
                            Ok(json!(x + 1))
                        })
                    },
                    None,
                );
        },
        InMemoryContainer::builder(),
    );

    let payload = engine
        .apply_transforms(&item(), &json!({"x": 3}), &ConversionOptions::default())
        .await?;

    assert_eq!(payload.into_value(), json!({"x": 6, "y": 7}));
    Ok(())
}

#[tokio::test]
async fn test_batch_instances_are_transformed_concurrently() -> anyhow::Result<()> {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (in_flight_c, peak_c) = (in_flight.clone(), peak.clone());

    let engine = engine_with(
        move |builder| {
            builder.declare_inline_transform(
                "Item",
                "x",
                move |ctx| {
                    let in_flight = in_flight_c.clone();
                    let peak = peak_c.clone();
                    Box::pin(async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(json!(ctx.value.as_i64().unwrap_or(0) * 10))
                    })
                },
                None,
            );
        },
        InMemoryContainer::builder(),
    );

    let payload = json!([{"x": 1}, {"x": 2}, {"x": 3}, {"x": 4}, {"x": 5}]);
    let started = Instant::now();
    let result = engine
        .apply_transforms(&item(), &payload, &ConversionOptions::default())
        .await?;
    let elapsed = started.elapsed();

    assert_eq!(peak.load(Ordering::SeqCst), 5);
    assert!(elapsed < Duration::from_millis(400), "took {:?}", elapsed);
    assert_eq!(
        result.into_value(),
        json!([{"x": 10}, {"x": 20}, {"x": 30}, {"x": 40}, {"x": 50}])
    );
    Ok(())
}

#[tokio::test]
async fn test_resolved_transformer_rewrites_field() -> anyhow::Result<()> {
    let engine = engine_with(
        |builder| {
            builder.declare_resolved_transform(
                "Item",
                "name",
                TransformerRef::thunk(TransformerToken::of::<UpperCase>),
                None,
            );
        },
        InMemoryContainer::builder().singleton(TransformerToken::of::<UpperCase>(), UpperCase),
    );

    let payload = engine
        .apply_transforms(&item(), &json!({"name": "alice"}), &ConversionOptions::default())
        .await?;

    assert_eq!(payload.into_value(), json!({"name": "ALICE"}));
    Ok(())
}

#[tokio::test]
async fn test_strict_miss_fails_with_token_name() {
    let engine = engine_with(
        |builder| {
            builder.declare_resolved_transform("Item", "name", "MissingTransformer", None);
        },
        InMemoryContainer::builder(),
    );

    let err = engine
        .apply_transforms(&item(), &json!({"name": "alice"}), &ConversionOptions::default())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, TransformError::TransformerNotFound { ref token } if token == "MissingTransformer"));
    assert!(err.to_string().contains("MissingTransformer"));
}

#[tokio::test]
async fn test_non_strict_miss_leaves_field_untouched() -> anyhow::Result<()> {
    let engine = engine_with(
        |builder| {
            builder.declare_resolved_transform(
                "Item",
                "name",
                TransformOptions::resolved("MissingTransformer").strict(false),
                None,
            );
        },
        InMemoryContainer::builder(),
    );

    let payload = engine
        .apply_transforms(&item(), &json!({"name": "alice"}), &ConversionOptions::default())
        .await?;

    assert_eq!(payload.into_value(), json!({"name": "alice"}));
    Ok(())
}

#[tokio::test]
async fn test_non_strict_lookup_searches_other_scopes() -> anyhow::Result<()> {
    let engine = engine_with(
        |builder| {
            builder.declare_resolved_transform(
                "Item",
                "name",
                "UpperCase",
                Some(TransformOptions::default().strict(false)),
            );
        },
        InMemoryContainer::builder().module("text", ContainerBuilder::new().singleton("UpperCase", UpperCase)),
    );

    let payload = engine
        .apply_transforms(&item(), &json!({"name": "bob"}), &ConversionOptions::default())
        .await?;

    assert_eq!(payload.into_value(), json!({"name": "BOB"}));
    Ok(())
}

#[tokio::test]
async fn test_scoped_transformer_is_bound_to_request() -> anyhow::Result<()> {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();

    let engine = engine_with(
        |builder| {
            builder.declare_resolved_transform(
                "Item",
                "ctx",
                TransformOptions::resolved("Stamp").scoped(true),
                None,
            );
        },
        InMemoryContainer::builder().scoped("Stamp", move |context_id| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(StampContext(context_id)) as Arc<dyn Transformer>
        }),
    );

    // 沒有請求範圍 id
    let err = engine
        .apply_transforms(&item(), &json!({}), &ConversionOptions::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, TransformError::UnscopedResolution { .. }));

    let first = ContextId::new();
    let second = ContextId::new();
    let payload = json!([{}, {}]);

    let a = engine
        .apply_transforms_scoped(&item(), &payload, &ConversionOptions::default(), first)
        .await?;
    let b = engine
        .apply_transforms_scoped(&item(), &payload, &ConversionOptions::default(), second)
        .await?;

    assert_eq!(a.into_value(), json!([{"ctx": first.get()}, {"ctx": first.get()}]));
    assert_eq!(b.into_value(), json!([{"ctx": second.get()}, {"ctx": second.get()}]));
    assert_eq!(created.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_context_id_from_initialization_is_used() -> anyhow::Result<()> {
    let fixed = ContextId::from_raw(42);
    let engine = engine_with_options(
        |builder| {
            builder.declare_resolved_transform(
                "Item",
                "ctx",
                TransformOptions::resolved("Stamp").scoped(true),
                None,
            );
        },
        InMemoryContainer::builder().scoped("Stamp", |context_id| {
            Arc::new(StampContext(context_id)) as Arc<dyn Transformer>
        }),
        UseContainerOptions {
            context_id: Some(fixed),
            resolver: None,
        },
    );

    let payload = engine
        .apply_transforms(&item(), &json!({}), &ConversionOptions::default())
        .await?;

    assert_eq!(payload.into_value(), json!({"ctx": 42}));
    Ok(())
}

/// 所有 token 都解析成 UpperCase 的策略
struct AlwaysUpperCase;

#[async_trait]
impl TransformerResolver for AlwaysUpperCase {
    async fn resolve_transformer(&self, _options: &ResolverOptions) -> Result<Option<Arc<dyn Transformer>>> {
        Ok(Some(Arc::new(UpperCase)))
    }
}

#[tokio::test]
async fn test_pluggable_resolver_takes_over_resolution() -> anyhow::Result<()> {
    let engine = engine_with_options(
        |builder| {
            builder.declare_resolved_transform("Item", "name", "NotBoundAnywhere", None);
        },
        InMemoryContainer::builder().resolver("resolver", AlwaysUpperCase),
        UseContainerOptions {
            context_id: None,
            resolver: Some(TransformerToken::name("resolver")),
        },
    );

    let payload = engine
        .apply_transforms(&item(), &json!({"name": "carol"}), &ConversionOptions::default())
        .await?;

    assert_eq!(payload.into_value(), json!({"name": "CAROL"}));
    Ok(())
}

#[tokio::test]
async fn test_call_options_are_merged_into_field_context() -> anyhow::Result<()> {
    let engine = engine_with(
        |builder| {
            builder.declare_inline_transform(
                "Item",
                "flags",
                |ctx| {
                    Box::pin(async move {
                        Ok(json!({
                            "exclude": ctx.options.conversion.exclude_extraneous_values,
                            "expose": ctx.options.conversion.expose_default_values,
                        }))
                    })
                },
                Some(TransformOptions::default().with_conversion(ConversionOptions {
                    exclude_extraneous_values: None,
                    expose_default_values: Some(false),
                })),
            );
        },
        InMemoryContainer::builder(),
    );

    let call_options = ConversionOptions {
        exclude_extraneous_values: Some(true),
        expose_default_values: Some(true),
    };
    let payload = engine.apply_transforms(&item(), &json!({}), &call_options).await?;

    assert_eq!(
        payload.into_value(),
        json!({"flags": {"exclude": true, "expose": false}})
    );
    Ok(())
}
