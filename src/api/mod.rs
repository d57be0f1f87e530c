pub mod admin;
pub mod health;
pub mod routes;
pub mod viewer;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::health::HealthState;
    use super::routes::{router, ApiState};
    use crate::db::{test_pool, TipStore};
    use crate::state::TierStatsCache;

    pub async fn test_state(allow_augmentation: bool) -> (Router, ApiState) {
        let state = ApiState {
            store: TipStore::new(test_pool().await),
            tz: chrono_tz::Europe::Warsaw,
            stats_cache: TierStatsCache::new(),
            health: Arc::new(HealthState::new()),
            allow_augmentation,
        };
        (router(state.clone()), state)
    }

    /// Non-JSON bodies (error messages) come back as a JSON string.
    pub async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request_builder = Request::builder().method(method).uri(uri);
        for (key, value) in headers {
            request_builder = request_builder.header(*key, *value);
        }

        let request = if let Some(payload) = body {
            request_builder
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("failed to build json request")
        } else {
            request_builder
                .body(Body::empty())
                .expect("failed to build empty request")
        };

        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router request failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));

        (status, body)
    }
}
