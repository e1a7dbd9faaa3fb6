use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// 容器查找用的具體 key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransformerToken {
    Name(String),
    /// 每次建立都唯一，即使描述相同
    Symbol { id: u64, description: String },
    Type { id: TypeId, name: &'static str },
}

impl TransformerToken {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn symbol(description: impl Into<String>) -> Self {
        Self::Symbol {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Display for TransformerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Symbol { description, .. } => write!(f, "Symbol({})", description),
            // 只顯示短型別名稱
            Self::Type { name, .. } => f.write_str(name.rsplit("::").next().unwrap_or(name)),
        }
    }
}

impl From<&str> for TransformerToken {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for TransformerToken {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// 宣告時的 transformer 參照：字面 token 或延遲求值的 thunk
#[derive(Clone)]
pub enum TransformerRef {
    Literal(TransformerToken),
    Thunk(Arc<dyn Fn() -> TransformerToken + Send + Sync>),
}

impl TransformerRef {
    pub fn thunk<F>(f: F) -> Self
    where
        F: Fn() -> TransformerToken + Send + Sync + 'static,
    {
        Self::Thunk(Arc::new(f))
    }
}

impl fmt::Debug for TransformerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(token) => f.debug_tuple("Literal").field(token).finish(),
            Self::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

impl From<TransformerToken> for TransformerRef {
    fn from(token: TransformerToken) -> Self {
        Self::Literal(token)
    }
}

impl From<&str> for TransformerRef {
    fn from(name: &str) -> Self {
        Self::Literal(TransformerToken::from(name))
    }
}

pub fn resolve_token(reference: &TransformerRef) -> TransformerToken {
    match reference {
        TransformerRef::Literal(token) => token.clone(),
        TransformerRef::Thunk(thunk) => thunk(),
    }
}
