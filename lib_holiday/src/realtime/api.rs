//! # HTTP Surface
//!
//! Thin routes around the pipeline: subscription get/put, `/health`, and the CORS layer
//! shared by every role's router.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::store::SubscriptionStore;

/// Wire shape of a subscription on the HTTP API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub country_codes: Vec<String>,
}

/// `GET` and `PUT /api/subscriptions/{user_id}`.
pub fn subscription_routes(store: Arc<dyn SubscriptionStore>) -> Router {
    Router::new()
        .route(
            "/api/subscriptions/{user_id}",
            get(get_subscription).put(put_subscription),
        )
        .with_state(store)
}

/// `GET /health`, answering `OK`.
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// CORS for browser dashboards. An empty origin list allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(allowed)
    }
}

async fn get_subscription(
    State(store): State<Arc<dyn SubscriptionStore>>,
    Path(user_id): Path<String>,
) -> Response {
    match store.get(&user_id).await {
        Ok(Some(sub)) => Json(SubscriptionView {
            user_id: Some(sub.user_id),
            country_codes: sub.country_codes.into_iter().collect(),
        })
        .into_response(),
        Ok(None) => Json(SubscriptionView {
            user_id: Some(user_id),
            country_codes: Vec::new(),
        })
        .into_response(),
        Err(e) => store_failure(e),
    }
}

async fn put_subscription(
    State(store): State<Arc<dyn SubscriptionStore>>,
    Path(user_id): Path<String>,
    Json(body): Json<SubscriptionView>,
) -> Response {
    if body.user_id.as_deref().is_some_and(|id| id != user_id) {
        return (StatusCode::BAD_REQUEST, "UserId in body must match route.").into_response();
    }

    match store.upsert(&user_id, &body.country_codes).await {
        Ok(sub) => {
            info!(user_id = %sub.user_id, countries = ?sub.country_codes, "Subscription saved");
            Json(SubscriptionView {
                user_id: Some(sub.user_id),
                country_codes: sub.country_codes.into_iter().collect(),
            })
            .into_response()
        }
        Err(e) => store_failure(e),
    }
}

fn store_failure(e: StoreError) -> Response {
    match e {
        StoreError::EmptyUserId => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        other => {
            error!(error = %other, "Subscription store failure");
            (StatusCode::SERVICE_UNAVAILABLE, other.to_string()).into_response()
        }
    }
}
