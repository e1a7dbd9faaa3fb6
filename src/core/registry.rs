use crate::core::token::TransformerRef;
use crate::domain::model::{FieldContext, TransformEntry, TransformKind, TransformOptions, TypeKey};
use crate::utils::error::Result;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// 每個 payload 型別的欄位轉換宣告表
///
/// 宣告只在啟動階段發生，`build()` 之後以 `Arc` 共享，唯讀。
#[derive(Debug, Default)]
pub struct TransformRegistry {
    entries: HashMap<TypeKey, Vec<TransformEntry>>,
}

impl TransformRegistry {
    pub fn builder() -> TransformRegistryBuilder {
        TransformRegistryBuilder::default()
    }

    /// 依宣告順序回傳；未宣告則為空
    pub fn list(&self, type_key: &TypeKey) -> &[TransformEntry] {
        self.entries.get(type_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeKey> {
        self.entries.keys()
    }
}

#[derive(Debug, Default)]
pub struct TransformRegistryBuilder {
    registry: TransformRegistry,
}

impl TransformRegistryBuilder {
    /// 追加到該型別既有的宣告之後，不覆寫
    pub fn declare(&mut self, type_key: impl Into<TypeKey>, entry: TransformEntry) -> &mut Self {
        let type_key = type_key.into();
        tracing::debug!("Declaring transform for {}.{}", type_key, entry.property_key);
        self.registry.entries.entry(type_key).or_default().push(entry);
        self
    }

    /// 宣告 inline 非同步轉換
    pub fn declare_inline_transform<F>(
        &mut self,
        type_key: impl Into<TypeKey>,
        property_key: &str,
        body: F,
        options: Option<TransformOptions>,
    ) -> &mut Self
    where
        F: for<'a> Fn(FieldContext<'a>) -> BoxFuture<'a, Result<Value>> + Send + Sync + 'static,
    {
        let options = TransformOptions {
            kind: Some(TransformKind::Inline(Arc::new(body))),
            ..options.unwrap_or_default()
        };
        self.declare(type_key, TransformEntry::new(property_key, options))
    }

    /// 宣告由容器解析的轉換；`target` 可以是 token、thunk，或已帶 token 的選項
    pub fn declare_resolved_transform(
        &mut self,
        type_key: impl Into<TypeKey>,
        property_key: &str,
        target: impl Into<ResolvedTarget>,
        options: Option<TransformOptions>,
    ) -> &mut Self {
        let options = match target.into() {
            ResolvedTarget::Token(reference) => TransformOptions {
                kind: Some(TransformKind::Resolved(reference)),
                ..options.unwrap_or_default()
            },
            ResolvedTarget::Options(options) => options,
        };
        self.declare(type_key, TransformEntry::new(property_key, options))
    }

    pub fn build(self) -> Arc<TransformRegistry> {
        Arc::new(self.registry)
    }
}

pub enum ResolvedTarget {
    Token(TransformerRef),
    Options(TransformOptions),
}

impl From<TransformerRef> for ResolvedTarget {
    fn from(reference: TransformerRef) -> Self {
        Self::Token(reference)
    }
}

impl From<&str> for ResolvedTarget {
    fn from(name: &str) -> Self {
        Self::Token(TransformerRef::from(name))
    }
}

impl From<crate::core::token::TransformerToken> for ResolvedTarget {
    fn from(token: crate::core::token::TransformerToken) -> Self {
        Self::Token(TransformerRef::from(token))
    }
}

impl From<TransformOptions> for ResolvedTarget {
    fn from(options: TransformOptions) -> Self {
        Self::Options(options)
    }
}
