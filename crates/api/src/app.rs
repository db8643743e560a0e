//! Router assembly.

use axum::{
    Router,
    body::Body,
    http::{
        HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::{from_fn, from_fn_with_state},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::middleware::{
    admission_middleware, request_id_middleware, security_headers_middleware, track_metrics,
};
use crate::routes;
use crate::state::AppState;

/// Build the full application router with its middleware stack.
///
/// Sentry layers are added by the binary on top of this.
pub fn router(state: AppState) -> Router {
    let mut app = routes::routes();

    if let Some(dir) = &state.config().static_dir {
        app = app.nest_service("/app", ServeDir::new(dir));
    }

    app.fallback(routes::not_found)
        .layer(cors_layer(&state))
        .layer(from_fn_with_state(state.clone(), admission_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn_with_state(state.clone(), track_metrics))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// CORS for the allowed front-ends, sharing the admission allow-list.
fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state.origins();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request| {
                origin
                    .to_str()
                    .is_ok_and(|origin| origins.is_allowed(Some(origin)))
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::{
        body::to_bytes,
        http::{StatusCode, header::ORIGIN},
        response::Response,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::ApiConfig;
    use crate::db::{GuestStore, MemoryGuestStore};
    use crate::error::RATE_LIMITED_MESSAGE;
    use crate::middleware::REQUEST_ID_HEADER;
    use crate::models::BalanceRecord;

    const SECRET_SHA256: &str = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b";

    struct TestApp {
        router: Router,
        store: Arc<MemoryGuestStore>,
    }

    impl TestApp {
        fn new(vars: &[(&str, &str)]) -> Self {
            Self::with_store(vars, MemoryGuestStore::new())
        }

        fn with_store(vars: &[(&str, &str)], store: MemoryGuestStore) -> Self {
            let mut map: HashMap<String, String> = HashMap::from([
                ("DATABASE_URL".to_string(), "postgres://localhost/loyalty".to_string()),
                ("PASSWORD_HASH".to_string(), SECRET_SHA256.to_string()),
            ]);
            for (k, v) in vars {
                map.insert((*k).to_string(), (*v).to_string());
            }
            let config = ApiConfig::from_lookup(|key| map.get(key).cloned()).unwrap();

            let store = Arc::new(store);
            let dyn_store: Arc<dyn GuestStore> = store.clone();
            let state = AppState::new(config, dyn_store).unwrap();

            Self {
                router: router(state),
                store,
            }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn get(&self, uri: &str) -> Response {
            self.send(Request::get(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn post_json(&self, uri: &str, body: &Value) -> Response {
            self.send(
                Request::post(uri)
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn balance(phone: &str, level: Option<&str>, visit: (i32, u32, u32)) -> BalanceRecord {
        BalanceRecord {
            guest_phone: phone.to_string(),
            last_name: "Petrova".to_string(),
            first_name: "Anna".to_string(),
            loyalty_level: level.map(str::to_string),
            current_balance: Decimal::from(1500),
            visits_count: 4,
            last_visit_date: NaiveDate::from_ymd_opt(visit.0, visit.1, visit.2),
        }
    }

    fn checkout_body() -> Value {
        json!({
            "guest_phone": "+7 (999) 123-45-67",
            "last_name": " Petrova ",
            "first_name": "Anna",
            "checkin_date": "05.01.2024",
            "loyalty_level": "2 сезона",
            "shelter_booking_id": "SH-1001",
            "total_amount": 12500.50,
            "bonus_spent": "300",
        })
    }

    // =========================================================================
    // Auth
    // =========================================================================

    #[tokio::test]
    async fn test_auth_disabled_accepts_empty_body() {
        let app = TestApp::new(&[("AUTH_DISABLED", "true")]);

        let response = app.post_json("/auth", &json!({})).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);
    }

    #[tokio::test]
    async fn test_auth_disabled_accepts_malformed_body() {
        let app = TestApp::new(&[("AUTH_DISABLED", "true")]);

        let response = app
            .send(
                Request::post("/auth")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_auth_padded_password_is_granted() {
        let app = TestApp::new(&[]);

        let response = app.post_json("/auth", &json!({ "password": " secret " })).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_auth_wrong_password_is_unauthorized() {
        let app = TestApp::new(&[]);

        let response = app.post_json("/auth", &json!({ "password": "guess" })).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid password");
    }

    #[tokio::test]
    async fn test_auth_missing_password_is_bad_request() {
        let app = TestApp::new(&[]);

        for body in [json!({}), json!({ "password": "   " }), json!({ "password": 42 })] {
            let response = app.post_json("/auth", &body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_auth_attempts_are_counted() {
        let app = TestApp::new(&[]);
        app.post_json("/auth", &json!({ "password": "secret" })).await;
        app.post_json("/auth", &json!({ "password": "nope" })).await;

        let response = app.get("/metrics").await;
        let text = String::from_utf8(
            to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec(),
        )
        .unwrap();
        assert!(text.contains("loyalty_api_auth_attempts_total{outcome=\"granted\"} 1"));
        assert!(text.contains("loyalty_api_auth_attempts_total{outcome=\"denied\"} 1"));
    }

    #[tokio::test]
    async fn test_config_reports_auth_state() {
        let enabled = TestApp::new(&[]);
        assert_eq!(
            json_body(enabled.get("/config").await).await,
            json!({ "authDisabled": false })
        );

        let disabled = TestApp::new(&[("AUTH_DISABLED", "true")]);
        assert_eq!(
            json_body(disabled.get("/config").await).await,
            json!({ "authDisabled": true })
        );
    }

    // =========================================================================
    // Admission
    // =========================================================================

    #[tokio::test]
    async fn test_rate_limit_ceiling() {
        let app = TestApp::new(&[("RATE_LIMIT_MAX", "2")]);

        assert_eq!(app.get("/config").await.status(), StatusCode::OK);
        assert_eq!(app.get("/config").await.status(), StatusCode::OK);

        let response = app.get("/config").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert!(headers.contains_key("retry-after"));
        assert_eq!(headers.get("ratelimit-limit").unwrap(), "2");
        assert_eq!(headers.get("ratelimit-remaining").unwrap(), "0");
        let body = json_body(response).await;
        assert_eq!(body["message"], RATE_LIMITED_MESSAGE);
    }

    #[tokio::test]
    async fn test_rate_limit_is_per_forwarded_client() {
        let app = TestApp::new(&[("RATE_LIMIT_MAX", "1")]);

        let from = |ip: &str| {
            Request::get("/config")
                .header("x-forwarded-for", ip)
                .body(Body::empty())
                .unwrap()
        };

        assert_eq!(app.send(from("203.0.113.1")).await.status(), StatusCode::OK);
        assert_eq!(
            app.send(from("203.0.113.1")).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(app.send(from("203.0.113.2")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_disallowed_origin_is_forbidden() {
        let app = TestApp::new(&[]);

        let response = app
            .send(
                Request::get("/config")
                    .header(ORIGIN, "https://evil.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_non_ascii_origin_is_forbidden() {
        let app = TestApp::new(&[("ALLOWED_ORIGINS", "https://*.usadba4.ru")]);

        for raw in [&b"https://evil\xff.com"[..], &b"https://evil\xff.usadba4.ru"[..]] {
            let response = app
                .send(
                    Request::get("/config")
                        .header(ORIGIN, HeaderValue::from_bytes(raw).unwrap())
                        .body(Body::empty())
                        .unwrap(),
                )
                .await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_allowed_origin_gets_cors_headers() {
        let app = TestApp::new(&[("ALLOWED_ORIGINS", "https://*.usadba4.ru")]);

        let response = app
            .send(
                Request::get("/config")
                    .header(ORIGIN, "https://desk.usadba4.ru")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "https://desk.usadba4.ru"
        );
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-credentials")
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_preflight_from_allowed_origin() {
        let app = TestApp::new(&[]);

        let response = app
            .send(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/guests")
                    .header(ORIGIN, "https://usadba4.ru")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let methods = response
            .headers()
            .get("access-control-allow-methods")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
    }

    #[tokio::test]
    async fn test_request_without_origin_is_allowed() {
        let app = TestApp::new(&[]);
        assert_eq!(app.get("/config").await.status(), StatusCode::OK);
    }

    // =========================================================================
    // Bonuses
    // =========================================================================

    #[tokio::test]
    async fn test_search_normalizes_phone_and_advances_tier() {
        let store = MemoryGuestStore::new().with_balances(vec![
            balance("9991234567", Some("1 сезон"), (2023, 6, 1)),
            balance("9991234567", Some(" 2   СЕЗОНА "), (2024, 2, 1)),
        ]);
        let app = TestApp::with_store(&[], store);

        let response = app.get("/bonuses/search?phone=%2B7%20(999)%20123-45-67").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["guest_phone"], "9991234567");
        assert_eq!(body["data"]["loyalty_level"], "3 СЕЗОНА");
        assert_eq!(body["data"]["last_visit_date"], "2024-02-01");
    }

    #[tokio::test]
    async fn test_search_top_tier_saturates() {
        let store = MemoryGuestStore::new()
            .with_balances(vec![balance("9991234567", Some("4 СЕЗОНА"), (2024, 1, 1))]);
        let app = TestApp::with_store(&[], store);

        let body = json_body(app.get("/bonuses/search?phone=9991234567").await).await;
        assert_eq!(body["data"]["loyalty_level"], "4 СЕЗОНА");
    }

    #[tokio::test]
    async fn test_search_unknown_phone_returns_null() {
        let app = TestApp::new(&[]);

        let body = json_body(app.get("/bonuses/search?phone=89990000000").await).await;
        assert_eq!(body, json!({ "success": true, "data": null }));
    }

    #[tokio::test]
    async fn test_search_rejects_bad_phone() {
        let app = TestApp::new(&[]);

        assert_eq!(
            app.get("/bonuses/search").await.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            app.get("/bonuses/search?phone=").await.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            app.get("/bonuses/search?phone=12345").await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_bonuses_list() {
        let store = MemoryGuestStore::new().with_balances(vec![
            balance("9990000001", None, (2023, 1, 1)),
            balance("9990000002", None, (2024, 1, 1)),
        ]);
        let app = TestApp::with_store(&[], store);

        let body = json_body(app.get("/bonuses").await).await;
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["guest_phone"], "9990000002");
        assert_eq!(rows[0]["loyalty_level"], Value::Null);
    }

    // =========================================================================
    // Guests
    // =========================================================================

    #[tokio::test]
    async fn test_checkout_is_recorded() {
        let app = TestApp::new(&[]);

        let response = app.post_json("/guests", &checkout_body()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["guest_phone"], "9991234567");
        assert_eq!(body["data"]["last_name"], "Petrova");
        assert_eq!(body["data"]["checkin_date"], "2024-01-05");
        assert_eq!(body["data"]["shelter_booking_id"], "SH-1001");
        assert_eq!(body["data"]["bonus_spent"], 300);

        let stored = app.store.checkouts();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].total_amount, Decimal::new(1_250_050, 2));
    }

    #[tokio::test]
    async fn test_checkout_validation_failures() {
        let app = TestApp::new(&[]);

        let cases = [
            ("total_amount", json!(0)),
            ("total_amount", json!("1000001")),
            ("shelter_booking_id", json!("x".repeat(81))),
            ("checkin_date", json!("13-13-2024")),
            ("guest_phone", json!("12345")),
            ("last_name", json!("   ")),
            ("bonus_spent", json!(1_000_001)),
        ];

        for (field, value) in cases {
            let mut body = checkout_body();
            body[field] = value.clone();
            let response = app.post_json("/guests", &body).await;
            assert_eq!(
                response.status(),
                StatusCode::BAD_REQUEST,
                "{field} = {value}"
            );
            assert_eq!(json_body(response).await["success"], false);
        }

        assert!(app.store.checkouts().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_amount_bounds_are_inclusive() {
        let app = TestApp::new(&[]);

        for amount in [json!(1), json!("1000000")] {
            let mut body = checkout_body();
            body["total_amount"] = amount;
            assert_eq!(
                app.post_json("/guests", &body).await.status(),
                StatusCode::OK
            );
        }
    }

    #[tokio::test]
    async fn test_checkout_malformed_json() {
        let app = TestApp::new(&[]);

        let response = app
            .send(
                Request::post("/guests")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"guest_phone\":"))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_guests_list_newest_first() {
        let app = TestApp::new(&[]);
        for booking in ["SH-1", "SH-2"] {
            let mut body = checkout_body();
            body["shelter_booking_id"] = json!(booking);
            app.post_json("/guests", &body).await;
        }

        let body = json_body(app.get("/guests").await).await;
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["shelter_booking_id"], "SH-2");
    }

    #[tokio::test]
    async fn test_store_failure_hides_detail_in_production() {
        let app = TestApp::new(&[]);
        app.store.set_available(false);

        let response = app.post_json("/guests", &checkout_body()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Failed to record checkout");
    }

    #[tokio::test]
    async fn test_store_failure_shows_detail_in_development() {
        let app = TestApp::new(&[("APP_ENV", "development")]);
        app.store.set_available(false);

        let body = json_body(app.get("/guests").await).await;
        assert_eq!(body["message"], "store unavailable: connection refused");
    }

    // =========================================================================
    // Health, metrics, fallback
    // =========================================================================

    #[tokio::test]
    async fn test_health_ok() {
        let app = TestApp::new(&[]);

        let response = app.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "connected");
        assert!(body["uptime"].is_number());
    }

    #[tokio::test]
    async fn test_health_reports_store_outage() {
        let app = TestApp::new(&[]);
        app.store.set_available(false);

        let response = app.get("/health").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "database unavailable");
    }

    #[tokio::test]
    async fn test_metrics_track_routes() {
        let app = TestApp::new(&[]);
        app.get("/health").await;

        let response = app.get("/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        let text = String::from_utf8(
            to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec(),
        )
        .unwrap();
        assert!(text.contains("route=\"/health\""));
        assert!(!text.contains("route=\"/metrics\""));
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let app = TestApp::new(&[]);

        let response = app.get("/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await, json!({ "error": "Not Found" }));
    }

    #[tokio::test]
    async fn test_responses_carry_request_id_and_security_headers() {
        let app = TestApp::new(&[]);

        let response = app.get("/config").await;
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    }
}
