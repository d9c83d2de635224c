//! Assistant backend HTTP server
//!
//! Axum server exposing intent triage, tool metadata, user context editing,
//! hosted checkout creation and the checkout provider's webhook.

mod billing;
mod config;
mod error;
mod handlers;
mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::handlers::{
    checkout_webhook, classify_intent, create_checkout, edit_context, get_checkout, get_context,
    get_metadata, health_check, list_metadata,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let state = AppState::from_config(&config)?;

    if state.stripe.is_some() {
        tracing::info!("Stripe configured");
    } else {
        tracing::warn!("Stripe not configured - checkout creation disabled");
        tracing::warn!("  Set STRIPE_SECRET_KEY in .env");
    }
    if state.webhook_secret.is_none() {
        tracing::warn!("CHECKOUT_WEBHOOK_SECRET not set - webhook signatures are not verified");
    }

    tracing::info!(
        capabilities = ?state.metadata.names(),
        themes = ?config.default_themes,
        billing_theme = %config.billing_theme,
        "Initialized services"
    );

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Assistant backend listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health_check))
        // Assistant integration
        .route("/api/intent", post(classify_intent))
        .route("/api/tools/metadata", get(list_metadata))
        .route("/api/tools/metadata/{capability}", get(get_metadata))
        // User context
        .route("/api/users/{user_id}/context", get(get_context).post(edit_context))
        // Payments
        .route("/api/checkout", post(create_checkout))
        .route("/api/checkout/{session_id}", get(get_checkout))
        .route("/webhook/checkout", post(checkout_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use assistant_context::{ThemeId, UserId};
    use assistant_payments::{compute_signature, CheckoutSession, CheckoutStatus, SessionStore};

    use crate::billing::BillingContextObserver;
    use crate::handlers::SIGNATURE_HEADER;

    const SECRET: &str = "whsec_test";

    fn test_state() -> AppState {
        let config = ServerConfig {
            webhook_secret: Some(SECRET.into()),
            default_themes: vec![ThemeId(1), ThemeId(2)],
            billing_theme: ThemeId(7),
            ..ServerConfig::default()
        };
        AppState::from_config(&config).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn signed_webhook(body: &Value) -> Request<Body> {
        let payload = body.to_string();
        let ts = chrono::Utc::now().timestamp();
        let signature = compute_signature(&payload, SECRET, ts).unwrap();
        Request::builder()
            .method("POST")
            .uri("/webhook/checkout")
            .header(SIGNATURE_HEADER, format!("t={ts},v1={signature}"))
            .body(Body::from(payload))
            .unwrap()
    }

    #[tokio::test]
    async fn test_intent_endpoint() {
        let app = router(test_state());

        let (status, body) = send(&app, post_json("/api/intent", &json!({ "label": "ANALYZE" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "intent": "analyze", "actionable": true }));

        let (_, body) = send(&app, post_json("/api/intent", &json!({ "label": "rm -rf" }))).await;
        assert_eq!(body, json!({ "intent": "illegal", "actionable": false }));
    }

    #[tokio::test]
    async fn test_metadata_endpoints() {
        let app = router(test_state());

        let request = Request::get("/api/tools/metadata/widget").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["widgetPrefersBorder"], true);

        let request = Request::get("/api/tools/metadata/nope").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_CAPABILITY");
    }

    #[tokio::test]
    async fn test_context_roundtrip_and_rejections() {
        let app = router(test_state());
        let user = UserId::new();
        let uri = format!("/api/users/{user}/context");

        let edits = json!([
            { "theme_id": 1, "operation": "upsert", "key": "tone", "value": "formal" },
            { "theme_id": 2, "operation": "upsert", "key": "goal", "value": 3 },
            { "theme_id": 1, "operation": "delete", "key": "missing" }
        ]);
        let (status, _) = send(&app, post_json(&uri, &edits)).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::get(format!("{uri}?themes=2")).body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["contexts"].as_array().unwrap().len(), 1);
        assert_eq!(body["contexts"][0]["entries"][0], json!({ "key": "goal", "value": 3 }));

        let bad = json!([{ "theme_id": 1, "operation": "upsert", "key": "tone" }]);
        let (status, body) = send(&app, post_json(&uri, &bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_EDIT");

        let unknown = json!([{ "theme_id": 99, "operation": "delete", "key": "tone" }]);
        let (status, body) = send(&app, post_json(&uri, &unknown)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "UNKNOWN_THEME");

        let request = Request::get(format!("{uri}?themes=1")).body(Body::empty()).unwrap();
        let (_, body) = send(&app, request).await;
        assert_eq!(body["contexts"][0]["entries"][0]["value"], "formal");
    }

    #[tokio::test]
    async fn test_webhook_flow_updates_billing_context() {
        let state = test_state();
        let user = UserId::new();
        state
            .sessions
            .save_session(
                &CheckoutSession::new(
                    "cs_1",
                    "https://pay.example/cs_1",
                    CheckoutStatus::Pending,
                    "https://app.example/ok",
                    Some(user.to_string()),
                )
                .unwrap(),
            )
            .unwrap();
        let app = router(state.clone());

        let event = json!({ "event_type": "checkout.session.completed", "id": "evt_1", "session_id": "cs_1" });
        let (status, body) = send(&app, signed_webhook(&event)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "applied");

        let (status, body) = send(&app, signed_webhook(&event)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "duplicate");

        let request = Request::get("/api/checkout/cs_1").body(Body::empty()).unwrap();
        let (_, body) = send(&app, request).await;
        assert_eq!(body["status"], "completed");

        let ctx = state.contexts.get_context(user, &[ThemeId(7)]).unwrap();
        let key = BillingContextObserver::entry_key("cs_1");
        let entry = ctx.contexts[0].get(&key).unwrap();
        assert_eq!(entry["status"], "completed");
    }

    #[tokio::test]
    async fn test_webhook_rejections() {
        let app = router(test_state());

        let unsigned = post_json(
            "/webhook/checkout",
            &json!({ "event_type": "checkout.session.completed", "id": "evt_1", "session_id": "cs_1" }),
        );
        let (status, _) = send(&app, unsigned).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = json!({ "event_type": "customer.created", "id": "evt_2" });
        let (status, body) = send(&app, signed_webhook(&unknown)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unrecognized");

        let malformed = json!({ "event_type": "checkout.session.expired", "id": "evt_3" });
        let (status, body) = send(&app, signed_webhook(&malformed)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MALFORMED_PAYLOAD");

        let orphan = json!({ "event_type": "checkout.session.expired", "id": "evt_4", "session_id": "cs_x" });
        let (status, _) = send(&app, signed_webhook(&orphan)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_checkout_disabled_without_stripe() {
        let app = router(test_state());
        let request = post_json(
            "/api/checkout",
            &json!({
                "product_name": "Pro",
                "amount_cents": 900,
                "success_url": "https://app.example/ok",
                "cancel_url": "https://app.example/cancel"
            }),
        );
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "PAYMENTS_DISABLED");
    }
}
