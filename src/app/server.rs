use crate::adapters::container::InMemoryContainer;
use crate::app::dto::{create_dto_target, register_create_dto, register_transformers};
use crate::app::pipe::{ArgumentMetadata, ValidationPipe};
use crate::config::ServerConfig;
use crate::core::context::UseContainerOptions;
use crate::core::conversion::SchemaConverter;
use crate::core::engine::TransformEngine;
use crate::core::registry::TransformRegistry;
use crate::domain::model::ContextId;
use crate::domain::schema::SchemaRegistry;
use crate::utils::error::{Result, TransformError};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pipe: Arc<ValidationPipe>,
    pub request_scoped: bool,
}

/// 建立 DTO 宣告、容器與轉換引擎
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let mut schemas = SchemaRegistry::new();
    let mut transforms = TransformRegistry::builder();
    register_create_dto(&mut schemas, &mut transforms);

    let schemas = Arc::new(schemas);
    let registry = transforms.build();
    tracing::info!(
        "📋 Transform declarations loaded for: {:?}",
        registry.types().map(|t| t.as_str()).collect::<Vec<_>>()
    );

    let engine = TransformEngine::new(registry, Arc::new(SchemaConverter::new(schemas.clone())));
    let container = register_transformers(InMemoryContainer::builder()).build();
    engine.use_container(
        container,
        UseContainerOptions {
            context_id: config.context_id,
            resolver: None,
        },
    )?;

    Ok(AppState {
        pipe: Arc::new(ValidationPipe::new(Arc::new(engine), schemas)),
        request_scoped: config.request_scoped,
    })
}

pub fn create_router(state: AppState) -> Router {
    Router::new().route("/", get(hello).post(create)).with_state(state)
}

async fn hello() -> &'static str {
    "Hello World!"
}

async fn create(State(state): State<AppState>, body: Bytes) -> std::result::Result<Json<Value>, ApiError> {
    let value = if body.is_empty() {
        None
    } else {
        Some(serde_json::from_slice::<Value>(&body)?)
    };
    let metadata = ArgumentMetadata::of(create_dto_target());

    let value = if state.request_scoped {
        state.pipe.transform_scoped(value, &metadata, ContextId::new()).await?
    } else {
        state.pipe.transform(value, &metadata).await?
    };

    tracing::info!("✅ Payload accepted");
    Ok(Json(value))
}

/// 把領域錯誤轉成 HTTP 回應
#[derive(Debug)]
pub struct ApiError(pub TransformError);

impl From<TransformError> for ApiError {
    fn from(error: TransformError) -> Self {
        Self(error)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self(TransformError::SerializationError(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            TransformError::ValidationFailed { errors } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "message": "Input data validation failed",
                    "errors": errors,
                }),
            ),
            error if error.is_client_error() => (StatusCode::BAD_REQUEST, bad_request(&error.to_string())),
            error => {
                tracing::error!("❌ Request failed: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "statusCode": 500,
                        "message": "Internal server error",
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn bad_request(message: &str) -> Value {
    json!({
        "statusCode": 400,
        "message": message,
        "error": "Bad Request",
    })
}
