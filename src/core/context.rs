use crate::core::token::{resolve_token, TransformerRef, TransformerToken};
use crate::domain::model::{ContextId, MergedOptions};
use crate::domain::ports::{ResolverOptions, ServiceContainer, Transformer, TransformerResolver};
use crate::utils::error::{Result, TransformError};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Default)]
pub struct UseContainerOptions {
    pub context_id: Option<ContextId>,
    /// 自訂解析策略在容器中的 token
    pub resolver: Option<TransformerToken>,
}

/// 容器橋接：依 token 解析 transformer 實例
#[derive(Clone)]
pub struct TransformContext {
    container: Arc<dyn ServiceContainer>,
    context_id: Option<ContextId>,
    resolver_token: Option<TransformerToken>,
}

impl TransformContext {
    pub(crate) fn new(container: Arc<dyn ServiceContainer>, options: UseContainerOptions) -> Self {
        Self {
            container,
            context_id: options.context_id,
            resolver_token: options.resolver,
        }
    }

    pub fn context_id(&self) -> Option<ContextId> {
        self.context_id
    }

    /// 同一容器、綁定到指定請求範圍的視圖
    pub fn for_request(&self, context_id: ContextId) -> Self {
        Self {
            context_id: Some(context_id),
            ..self.clone()
        }
    }

    /// 釋放此請求範圍的 scoped 實例
    pub fn release(&self) {
        if let Some(context_id) = self.context_id {
            self.container.release(context_id);
        }
    }

    /// 非 strict 查找不到時回傳 `Ok(None)`
    pub async fn get_transformer(
        &self,
        reference: &TransformerRef,
        merged: &MergedOptions,
    ) -> Result<Option<Arc<dyn Transformer>>> {
        let container = match &merged.select {
            Some(scope) => self.container.select(scope)?,
            None => self.container.clone(),
        };
        let token = resolve_token(reference);
        let resolver_options = ResolverOptions {
            token,
            strict: merged.strict,
            scoped: merged.scoped,
            context_id: self.context_id,
            container: container.clone(),
        };

        let instance = match &self.resolver_token {
            Some(resolver_token) => {
                let resolver = container.get_resolver(resolver_token, merged.strict).ok_or_else(|| {
                    TransformError::ResolverNotFound {
                        token: resolver_token.to_string(),
                    }
                })?;
                resolver.resolve_transformer(&resolver_options).await?
            }
            None => self.resolve_transformer(&resolver_options).await?,
        };

        match instance {
            Some(instance) => Ok(Some(instance)),
            None if resolver_options.strict => Err(TransformError::TransformerNotFound {
                token: resolver_options.token.to_string(),
            }),
            None => {
                tracing::warn!(
                    "⚠️ Transformer {} not found (non-strict), leaving field untouched",
                    resolver_options.token
                );
                Ok(None)
            }
        }
    }
}

/// 預設解析策略：scoped 走請求範圍，否則 singleton
#[async_trait]
impl TransformerResolver for TransformContext {
    async fn resolve_transformer(&self, options: &ResolverOptions) -> Result<Option<Arc<dyn Transformer>>> {
        if options.scoped {
            let context_id = options.context_id.ok_or_else(|| TransformError::UnscopedResolution {
                token: options.token.to_string(),
            })?;
            return options.container.resolve(&options.token, context_id, options.strict).await;
        }

        options.container.get(&options.token, options.strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::container::{ContainerBuilder, InMemoryContainer};
    use crate::domain::model::{ConversionOptions, FieldContext, TransformKind, TransformOptions};
    use serde_json::Value;

    struct Echo;

    #[async_trait]
    impl Transformer for Echo {
        async fn transform(&self, ctx: FieldContext<'_>) -> Result<Value> {
            Ok(ctx.value)
        }
    }

    /// 永遠找不到的解析策略
    struct NothingResolver;

    #[async_trait]
    impl TransformerResolver for NothingResolver {
        async fn resolve_transformer(&self, _options: &ResolverOptions) -> Result<Option<Arc<dyn Transformer>>> {
            Ok(None)
        }
    }

    fn context(container: Arc<InMemoryContainer>, options: UseContainerOptions) -> TransformContext {
        TransformContext::new(container, options)
    }

    async fn lookup(ctx: &TransformContext, options: TransformOptions) -> Result<Option<Arc<dyn Transformer>>> {
        let merged = options.merged_with(&ConversionOptions::default());
        match &options.kind {
            Some(TransformKind::Resolved(reference)) => ctx.get_transformer(reference, &merged).await,
            other => panic!("expected a resolved transform, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_strict_miss_names_the_token() {
        let ctx = context(InMemoryContainer::builder().build(), UseContainerOptions::default());

        let err = lookup(&ctx, TransformOptions::resolved("MissingTransformer")).await.err().unwrap();
        match err {
            TransformError::TransformerNotFound { token } => assert_eq!(token, "MissingTransformer"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_strict_miss_is_tolerated() {
        let ctx = context(InMemoryContainer::builder().build(), UseContainerOptions::default());

        let found = lookup(&ctx, TransformOptions::resolved("MissingTransformer").strict(false))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_select_resolves_against_child_scope() {
        let container = InMemoryContainer::builder()
            .module("users", ContainerBuilder::new().singleton("Echo", Echo))
            .build();
        let ctx = context(container, UseContainerOptions::default());

        assert!(lookup(&ctx, TransformOptions::resolved("Echo")).await.is_err());
        assert!(lookup(&ctx, TransformOptions::resolved("Echo").select("users"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_scoped_without_context_id_fails() {
        let container = InMemoryContainer::builder()
            .scoped("Echo", |_| Arc::new(Echo) as Arc<dyn Transformer>)
            .build();
        let ctx = context(container, UseContainerOptions::default());

        let err = lookup(&ctx, TransformOptions::resolved("Echo").scoped(true)).await.err().unwrap();
        assert!(matches!(err, TransformError::UnscopedResolution { .. }));

        let scoped = ctx.for_request(ContextId::new());
        assert!(lookup(&scoped, TransformOptions::resolved("Echo").scoped(true))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_custom_resolver_is_used() {
        let container = InMemoryContainer::builder()
            .singleton("Echo", Echo)
            .resolver("Nothing", NothingResolver)
            .build();
        let ctx = context(
            container,
            UseContainerOptions {
                context_id: None,
                resolver: Some(TransformerToken::name("Nothing")),
            },
        );

        // 自訂策略找不到，即使容器中有綁定
        let err = lookup(&ctx, TransformOptions::resolved("Echo")).await.err().unwrap();
        assert!(matches!(err, TransformError::TransformerNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_custom_resolver_fails() {
        let container = InMemoryContainer::builder().singleton("Echo", Echo).build();
        let ctx = context(
            container,
            UseContainerOptions {
                context_id: None,
                resolver: Some(TransformerToken::name("Nothing")),
            },
        );

        let err = lookup(&ctx, TransformOptions::resolved("Echo")).await.err().unwrap();
        assert!(matches!(err, TransformError::ResolverNotFound { token } if token == "Nothing"));
    }
}
