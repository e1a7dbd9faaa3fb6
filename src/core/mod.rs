pub mod context;
pub mod conversion;
pub mod engine;
pub mod registry;
pub mod token;

pub use crate::domain::model::{Payload, Record, TransformEntry};
pub use crate::domain::ports::{InstanceConverter, ServiceContainer, Transformer};
pub use crate::utils::error::Result;
