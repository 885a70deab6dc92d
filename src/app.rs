use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth;
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Login API v1.0" }))
        .route("/health", get(|| async { "ok" }))
        .merge(auth::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "3000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.expect("infallible");
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_me(token: Option<&str>) -> Request<Body> {
        let mut req = Request::get("/me");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        req.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn register_login_and_access_protected_resource() {
        let app = build_app(AppState::fake().await);

        let (status, body) = call(
            &app,
            post_json("/register", json!({"username": "alice", "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"userID": 1, "username": "alice"}));

        let (status, body) = call(
            &app,
            post_json("/register", json!({"username": "alice", "password": "other"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Username already in use");
        assert_eq!(body["kind"], "username_taken");

        let (status, body) = call(
            &app,
            post_json("/login", json!({"username": "alice", "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userID"], 1);
        assert_eq!(body["username"], "alice");
        let token = body["token"].as_str().expect("token").to_string();
        assert!(!token.is_empty());

        let (status, body) = call(&app, get_me(Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"userID": 1, "username": "alice"}));

        let (status, body) = call(&app, get_me(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("userID").is_none());

        let mut tampered = token.clone();
        let dot = tampered.rfind('.').expect("signature segment");
        tampered.replace_range(dot + 1.., "c2lnbmF0dXJlLXRoYXQtZG9lcy1ub3QtbWF0Y2g");
        let (status, body) = call(&app, get_me(Some(&tampered))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "invalid_token");
        assert!(body.get("userID").is_none());
    }

    #[tokio::test]
    async fn login_failures_share_shape() {
        let app = build_app(AppState::fake().await);
        call(
            &app,
            post_json("/register", json!({"username": "alice", "password": "s3cret"})),
        )
        .await;

        let wrong_pw = call(
            &app,
            post_json("/login", json!({"username": "alice", "password": "nope"})),
        )
        .await;
        let unknown = call(
            &app,
            post_json("/login", json!({"username": "nobody", "password": "s3cret"})),
        )
        .await;

        assert_eq!(wrong_pw.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_pw, unknown);
    }

    #[tokio::test]
    async fn bad_input_is_bad_request() {
        let app = build_app(AppState::fake().await);

        let (status, body) = call(
            &app,
            post_json("/register", json!({"username": "", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");

        let (status, body) = call(
            &app,
            post_json("/login", json!({"username": "alice", "password": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");

        let req = Request::post("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn token_from_other_secret_is_rejected() {
        let state = AppState::fake().await;
        let foreign = crate::auth::jwt::JwtKeys::new(&crate::config::JwtConfig {
            secret: "someone-else".into(),
            ..state.config.jwt.clone()
        });
        let app = build_app(state);
        let token = foreign.issue(1).expect("issue");

        let (status, _) = call(&app, get_me(Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_and_banner() {
        let app = build_app(AppState::fake().await);
        let res = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let res = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
