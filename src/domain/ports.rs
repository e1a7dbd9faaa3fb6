use crate::core::token::TransformerToken;
use crate::domain::model::{ContextId, ConversionOptions, FieldContext, Record, ScopeKey, TypeKey};
use crate::utils::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// 宣告在欄位上的 inline 非同步轉換函式
pub type TransformFn = Arc<dyn for<'a> Fn(FieldContext<'a>) -> BoxFuture<'a, Result<Value>> + Send + Sync>;

/// 可由容器解析的欄位轉換服務
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(&self, ctx: FieldContext<'_>) -> Result<Value>;
}

pub struct ResolverOptions {
    pub token: TransformerToken,
    pub strict: bool,
    pub scoped: bool,
    pub context_id: Option<ContextId>,
    pub container: Arc<dyn ServiceContainer>,
}

/// 可插拔的 transformer 解析策略
#[async_trait]
pub trait TransformerResolver: Send + Sync {
    async fn resolve_transformer(&self, options: &ResolverOptions) -> Result<Option<Arc<dyn Transformer>>>;
}

/// 外部 DI 容器
#[async_trait]
pub trait ServiceContainer: Send + Sync {
    /// singleton 查找
    fn get(&self, token: &TransformerToken, strict: bool) -> Result<Option<Arc<dyn Transformer>>>;

    /// 綁定在請求範圍的查找
    async fn resolve(
        &self,
        token: &TransformerToken,
        context_id: ContextId,
        strict: bool,
    ) -> Result<Option<Arc<dyn Transformer>>>;

    fn get_resolver(&self, token: &TransformerToken, strict: bool) -> Option<Arc<dyn TransformerResolver>>;

    fn select(&self, scope: &ScopeKey) -> Result<Arc<dyn ServiceContainer>>;

    /// 請求結束時釋放該範圍建立的實例
    fn release(&self, context_id: ContextId);
}

/// plain → 型別化實例的轉換器
pub trait InstanceConverter: Send + Sync {
    fn plain_to_instance(&self, type_key: &TypeKey, plain: &Value, options: &ConversionOptions) -> Result<Record>;
}
