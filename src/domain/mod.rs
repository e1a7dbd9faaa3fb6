// Domain layer: core models, DTO schemas and ports (interfaces).

pub mod model;
pub mod ports;
pub mod schema;
