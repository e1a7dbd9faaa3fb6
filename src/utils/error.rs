use std::collections::BTreeMap;
use thiserror::Error;

/// 欄位 → 違反的規則名稱列表
pub type ViolationMap = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Async transform context was not initialized yet")]
    NotInitialized,

    #[error("The async transform mechanism was already initialized")]
    DoubleInitialization,

    #[error("No instance for transformer {token} was created")]
    TransformerNotFound { token: String },

    #[error("No transformer resolver registered under {token}")]
    ResolverNotFound { token: String },

    #[error("Container scope not found: {scope}")]
    ScopeNotFound { scope: String },

    #[error("Scoped resolution of {token} requires a request context id")]
    UnscopedResolution { token: String },

    #[error("Invalid transform configuration for field '{key}'")]
    InvalidTransformConfiguration { key: String },

    #[error("No data submitted")]
    NoDataSubmitted,

    #[error("Input data validation failed")]
    ValidationFailed { errors: ViolationMap },

    #[error("Conversion error: {message}")]
    ConversionFailed { message: String },

    #[error("Transform of field '{key}' failed: {message}")]
    TransformFailed { key: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl TransformError {
    /// 供自訂 transformer 回報失敗
    pub fn transform_failed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransformFailed {
            key: key.into(),
            message: message.into(),
        }
    }

    /// 是否屬於用戶端錯誤（HTTP 400）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NoDataSubmitted
                | Self::ValidationFailed { .. }
                | Self::ConversionFailed { .. }
                | Self::SerializationError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
