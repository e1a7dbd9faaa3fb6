pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::container::{ContainerBuilder, InMemoryContainer};
pub use app::pipe::{ArgumentMetadata, ValidationPipe};
pub use config::{ServerArgs, ServerConfig};
pub use crate::core::{
    context::{TransformContext, UseContainerOptions},
    engine::TransformEngine,
    registry::TransformRegistry,
    token::{resolve_token, TransformerRef, TransformerToken},
};
pub use domain::model::{
    ContextId, ConversionOptions, FieldContext, Payload, Record, TargetType, TransformEntry, TransformOptions,
    TypeKey,
};
pub use domain::ports::{ServiceContainer, Transformer, TransformerResolver};
pub use utils::error::{Result, TransformError};
