use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use movequote_chat::SessionRegistry;
use movequote_rates::RateStore;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    rates: Arc<RateStore>,
    sessions: Arc<SessionRegistry>,
}

impl HealthState {
    pub fn new(rates: Arc<RateStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self { rates, sessions }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RatesCheck {
    pub status: &'static str,
    pub source: Option<String>,
    pub loaded_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub rates: RatesCheck,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

/// Ready once a rate table is loaded. Without one, quotes cannot be priced.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let rates = match state.rates.current().await {
        Some(snapshot) => RatesCheck {
            status: "ready",
            source: Some(snapshot.source.clone()),
            loaded_at: Some(snapshot.loaded_at.to_rfc3339()),
        },
        None => RatesCheck { status: "degraded", source: None, loaded_at: None },
    };
    let ready = rates.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "movequote-server runtime initialized".to_string(),
        },
        rates,
        active_sessions: state.sessions.len(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::{extract::State, Json};
    use chrono::Utc;
    use movequote_chat::{ChatKey, SessionRegistry};
    use movequote_core::rates::RateTable;
    use movequote_rates::{RateSourceChain, RateStore};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};

    fn loaded_store() -> Arc<RateStore> {
        let table = RateTable::from_value(json!({"boundary_km": 60})).expect("table");
        Arc::new(RateStore::with_table(RateSourceChain::new(Vec::new()), table, "sheet"))
    }

    #[tokio::test]
    async fn health_is_ready_when_rates_are_loaded() {
        let sessions = Arc::new(SessionRegistry::new());
        sessions.with_session(ChatKey::new(1, 1), false, Utc::now(), |_| ());

        let (status, Json(payload)) = health(State(HealthState::new(loaded_store(), sessions))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.rates.source.as_deref(), Some("sheet"));
        assert!(payload.rates.loaded_at.is_some());
        assert_eq!(payload.active_sessions, 1);
    }

    #[tokio::test]
    async fn health_is_degraded_before_any_rate_table_loads() {
        let store = Arc::new(RateStore::new(RateSourceChain::new(Vec::new())));

        let (status, Json(payload)) =
            health(State(HealthState::new(store, Arc::new(SessionRegistry::new())))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.rates.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_route_serves_json() {
        let app = router(HealthState::new(loaded_store(), Arc::new(SessionRegistry::new())));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(payload["rates"]["source"], "sheet");
        assert_eq!(payload["active_sessions"], 0);
    }
}
