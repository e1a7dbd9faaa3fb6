use crate::domain::model::{Record, TypeKey};
use crate::utils::error::ViolationMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 轉換期間執行的同步欄位轉換：(目前值, 原始 plain 物件) → 新值
pub type SyncTransformFn = Arc<dyn Fn(&Value, &Map<String, Value>) -> Value + Send + Sync>;

/// 欄位驗證規則，名稱沿用 class-validator 的 constraint key
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    IsNotEmpty,
    IsString,
    IsNumber,
    Equals(Value),
    Min(f64),
    Max(f64),
    MaxLength(usize),
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::IsNotEmpty => "isNotEmpty",
            Rule::IsString => "isString",
            Rule::IsNumber => "isNumber",
            Rule::Equals(_) => "equals",
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::MaxLength(_) => "maxLength",
        }
    }

    /// `value` 為 `None` 代表欄位不存在
    pub fn check(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Rule::IsNotEmpty, Some(Value::String(s))) => !s.is_empty(),
            (Rule::IsNotEmpty, Some(Value::Null) | None) => false,
            (Rule::IsNotEmpty, Some(_)) => true,
            (Rule::IsString, Some(v)) => v.is_string(),
            (Rule::IsNumber, Some(v)) => v.as_f64().map(f64::is_finite).unwrap_or(false),
            (Rule::Equals(expected), Some(v)) => numeric_eq(expected, v).unwrap_or(expected == v),
            (Rule::Min(min), Some(v)) => v.as_f64().map(|n| n >= *min).unwrap_or(false),
            (Rule::Max(max), Some(v)) => v.as_f64().map(|n| n <= *max).unwrap_or(false),
            (Rule::MaxLength(max), Some(Value::String(s))) => s.chars().count() <= *max,
            (_, _) => false,
        }
    }
}

// 6 與 6.0 在 JSON 中視為相等
fn numeric_eq(a: &Value, b: &Value) -> Option<bool> {
    Some(a.as_f64()? == b.as_f64()?)
}

#[derive(Clone)]
pub struct FieldSchema {
    pub name: String,
    pub rules: Vec<Rule>,
    pub transform: Option<SyncTransformFn>,
    pub default: Option<Value>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            transform: None,
            default: None,
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Map<String, Value>) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("name", &self.name)
            .field("rules", &self.rules)
            .field("transform", &self.transform.is_some())
            .field("default", &self.default)
            .finish()
    }
}

/// DTO 的欄位宣告與驗證規則
#[derive(Debug, Clone)]
pub struct DtoSchema {
    pub type_key: TypeKey,
    pub fields: Vec<FieldSchema>,
}

impl DtoSchema {
    pub fn new(type_key: impl Into<String>) -> Self {
        Self {
            type_key: TypeKey::new(type_key),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// 依宣告順序檢查每個欄位的規則，只回傳有違規的欄位
    pub fn validate(&self, record: &Record) -> ViolationMap {
        let mut violations = ViolationMap::new();

        for field in &self.fields {
            let value = record.get(&field.name);
            let failed: Vec<String> = field
                .rules
                .iter()
                .filter(|rule| !rule.check(value))
                .map(|rule| rule.name().to_string())
                .collect();

            if !failed.is_empty() {
                violations.insert(field.name.clone(), failed);
            }
        }

        violations
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<TypeKey, DtoSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: DtoSchema) {
        self.schemas.insert(schema.type_key.clone(), schema);
    }

    pub fn get(&self, type_key: &TypeKey) -> Option<&DtoSchema> {
        self.schemas.get(type_key)
    }
}
