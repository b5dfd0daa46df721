use std::sync::Arc;
use axum::{extract::Path, routing::{get, post}, Router, Json};
use tower_http::cors::{CorsLayer, Any};
use serde::Serialize;
use axum::http::StatusCode;
use tracing::{info, warn};
use crate::construct::{Area, CategoryWithFields};
use crate::error::FieldkeeperError;
use crate::interface::{Action, ActionInterface, ActionResponse};

#[derive(Serialize)]
pub struct ConfigurationResponse {
    pub status: String,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryWithFields>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn status_of(error: &FieldkeeperError) -> StatusCode {
    match error {
        FieldkeeperError::NotFound { .. } => StatusCode::NOT_FOUND,
        FieldkeeperError::InvalidScope(_)
        | FieldkeeperError::InvalidTarget { .. }
        | FieldkeeperError::UnknownFieldType(_)
        | FieldkeeperError::InvalidField(_) => StatusCode::BAD_REQUEST,
        e if e.is_transient() => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn router(interface: Arc<ActionInterface>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);
    let for_actions = Arc::clone(&interface);
    Router::new()
        .route("/v1/action", post(move |Json(action): Json<Action>| {
        let iface = Arc::clone(&for_actions);
        async move {
            // The database is synchronous, so actions run on a blocking thread.
            let started = std::time::Instant::now();
            let result = tokio::task::spawn_blocking(move || iface.execute(&action))
                .await
                .map_err(|e| {
                    warn!(error=%e, "Join error");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Join error")
                })?;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            match result {
                Ok(response) => {
                    info!(ms=elapsed_ms, id=?response.id, "action complete");
                    Ok::<_, (StatusCode, &'static str)>((StatusCode::OK, Json(response)))
                }
                Err(e) => {
                    let status = status_of(&e);
                    warn!(error=%e, code=%status.as_u16(), "action error");
                    Ok((status, Json(ActionResponse::failed(&e))))
                }
            }
        }
    }))
        .route("/v1/areas/:component/:area/:itemid", get(move |Path((component, area, itemid)): Path<(String, String, i64)>| {
        let iface = Arc::clone(&interface);
        async move {
            let started = std::time::Instant::now();
            let area = Area::new(component, area, itemid);
            let result = tokio::task::spawn_blocking(move || iface.database().configuration(&area))
                .await
                .map_err(|e| {
                    warn!(error=%e, "Join error");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Join error")
                })?;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            let (status, body) = match result {
                Ok(categories) => (StatusCode::OK, ConfigurationResponse { status: "ok".into(), elapsed_ms, categories: Some(categories), error: None }),
                Err(e) => {
                    let status = status_of(&e);
                    warn!(error=%e, code=%status.as_u16(), "configuration error");
                    (status, ConfigurationResponse { status: "error".into(), elapsed_ms, categories: None, error: Some(e.to_string()) })
                }
            };
            Ok::<_, (StatusCode, &'static str)>((status, Json(body)))
        }
    }))
    .layer(cors)
}
