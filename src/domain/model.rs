use crate::core::token::TransformerRef;
use crate::domain::ports::TransformFn;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Payload 型別的穩定識別碼（取代反射）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(String);

impl TypeKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// 容器中的子範圍（模組）名稱
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey(String);

impl ScopeKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// 請求範圍識別碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub fn new() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipe 的目標型別；前五種為原始包裝型別，不做轉換與驗證
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    Text,
    Boolean,
    Numeric,
    Collection,
    Object,
    Dto(TypeKey),
}

impl TargetType {
    pub fn dto(name: impl Into<String>) -> Self {
        Self::Dto(TypeKey::new(name))
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Dto(_))
    }
}

/// 已轉換的型別化實例
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_key: Option<TypeKey>,
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(type_key: TypeKey, data: Map<String, Value>) -> Self {
        Self {
            type_key: Some(type_key),
            data,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

/// Orchestrator 的輸入輸出：單一實例或有序的實例序列
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(Record),
    Batch(Vec<Record>),
}

impl Payload {
    pub fn records(&self) -> &[Record] {
        match self {
            Self::Single(record) => std::slice::from_ref(record),
            Self::Batch(records) => records,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Single(record) => record.into_value(),
            Self::Batch(records) => Value::Array(records.into_iter().map(Record::into_value).collect()),
        }
    }
}

/// 轉型方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationKind {
    PlainToClass,
    ClassToPlain,
    ClassToClass,
}

/// plain → instance 轉換選項
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    pub exclude_extraneous_values: Option<bool>,
    pub expose_default_values: Option<bool>,
}

impl ConversionOptions {
    /// `overrides` 中有設定的欄位優先
    pub fn merge(&self, overrides: &ConversionOptions) -> ConversionOptions {
        ConversionOptions {
            exclude_extraneous_values: overrides
                .exclude_extraneous_values
                .or(self.exclude_extraneous_values),
            expose_default_values: overrides.expose_default_values.or(self.expose_default_values),
        }
    }
}

#[derive(Clone)]
pub enum TransformKind {
    Inline(TransformFn),
    Resolved(TransformerRef),
}

impl fmt::Debug for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(_) => f.write_str("Inline(..)"),
            Self::Resolved(reference) => f.debug_tuple("Resolved").field(reference).finish(),
        }
    }
}

/// 欄位轉換宣告的設定
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    pub kind: Option<TransformKind>,
    pub select: Option<ScopeKey>,
    pub strict: Option<bool>,
    pub scoped: Option<bool>,
    pub conversion: ConversionOptions,
}

impl TransformOptions {
    pub fn inline<F>(body: F) -> Self
    where
        F: for<'a> Fn(FieldContext<'a>) -> futures::future::BoxFuture<'a, crate::utils::error::Result<Value>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            kind: Some(TransformKind::Inline(std::sync::Arc::new(body))),
            ..Self::default()
        }
    }

    pub fn resolved(token: impl Into<TransformerRef>) -> Self {
        Self {
            kind: Some(TransformKind::Resolved(token.into())),
            ..Self::default()
        }
    }

    pub fn select(mut self, scope: impl Into<ScopeKey>) -> Self {
        self.select = Some(scope.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn scoped(mut self, scoped: bool) -> Self {
        self.scoped = Some(scoped);
        self
    }

    pub fn with_conversion(mut self, conversion: ConversionOptions) -> Self {
        self.conversion = conversion;
        self
    }

    /// 呼叫端選項與宣告選項合併，宣告選項優先
    pub fn merged_with(&self, base: &ConversionOptions) -> MergedOptions {
        MergedOptions {
            conversion: base.merge(&self.conversion),
            select: self.select.clone(),
            strict: self.strict.unwrap_or(true),
            scoped: self.scoped.unwrap_or(false),
        }
    }
}

/// 傳給每次轉換呼叫的已合併設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedOptions {
    pub conversion: ConversionOptions,
    pub select: Option<ScopeKey>,
    pub strict: bool,
    pub scoped: bool,
}

#[derive(Debug, Clone)]
pub struct TransformEntry {
    pub property_key: String,
    pub options: TransformOptions,
}

impl TransformEntry {
    pub fn new(property_key: impl Into<String>, options: TransformOptions) -> Self {
        Self {
            property_key: property_key.into(),
            options,
        }
    }
}

/// 單次欄位轉換的上下文
#[derive(Debug)]
pub struct FieldContext<'a> {
    pub value: Value,
    pub key: &'a str,
    pub obj: &'a mut Record,
    pub kind: TransformationKind,
    pub options: &'a MergedOptions,
}
