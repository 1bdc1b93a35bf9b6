use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, chat, journal, mindfulness, preferences};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(journal::router())
                .merge(chat::router())
                .merge(preferences::router())
                .merge(mindfulness::router())
                .route("/health", get(|| async { "ok" })),
        )
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
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::jwt::JwtKeys;
    use crate::chat::CannedModel;
    use crate::notify::RecordingMailer;

    async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_bytes(res: Response) -> Vec<u8> {
        res.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    async fn body_json(res: Response) -> Value {
        serde_json::from_slice(&body_bytes(res).await).unwrap()
    }

    async fn sign_up(app: &Router, username: &str) -> String {
        let res = send(
            app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": username,
                "password": "Str0ng!Pw",
                "confirm_password": "Str0ng!Pw",
            })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        body_json(res).await["access_token"].as_str().unwrap().to_string()
    }

    async fn create(app: &Router, token: &str, title: &str, content: &str) -> Value {
        let res = send(
            app,
            Method::POST,
            "/api/v1/entries",
            Some(token),
            Some(json!({ "title": title, "content": content })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        body_json(res).await
    }

    fn titles(v: &Value) -> Vec<String> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|e| e["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = send(&app, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_bytes(res).await, b"ok");
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let app = build_app(AppState::fake());
        for uri in ["/api/v1/entries", "/api/v1/trash", "/api/v1/me", "/api/v1/preferences"] {
            let res = send(&app, Method::GET, uri, None, None).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
        let res = send(&app, Method::GET, "/api/v1/entries", Some("garbage"), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tokens_for_unknown_users_are_refused() {
        let state = AppState::fake();
        let ghost = JwtKeys::from_ref(&state).issue(Uuid::new_v4()).unwrap();
        let app = build_app(state);

        let res = send(
            &app,
            Method::POST,
            "/api/v1/entries",
            Some(&ghost.access),
            Some(json!({ "content": "hello" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_bytes(res).await,
            b"Logged-in user not found. Please log in again."
        );

        for uri in ["/api/v1/me", "/api/v1/entries", "/api/v1/chat/history", "/api/v1/mindfulness/course"] {
            let res = send(&app, Method::GET, uri, Some(&ghost.access), None).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn register_login_and_me() {
        let app = build_app(AppState::fake());
        let token = sign_up(&app, "alice_1").await;

        let res = send(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
        let me = body_json(res).await;
        assert_eq!(me["username"], "alice_1");

        let res = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "alice_1", "password": "Str0ng!Pw" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["user"]["id"], me["id"]);

        let res = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "alice_1", "password": "Wr0ng!Pw" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "alice_1",
                "password": "Str0ng!Pw",
                "confirm_password": "Str0ng!Pw",
            })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn refresh_token_only_works_on_refresh_route() {
        let app = build_app(AppState::fake());
        let res = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "ivy_9",
                "password": "Str0ng!Pw",
                "confirm_password": "Str0ng!Pw",
            })),
        )
        .await;
        let tokens = body_json(res).await;
        let refresh = tokens["refresh_token"].as_str().unwrap();

        let res = send(&app, Method::GET, "/api/v1/me", Some(refresh), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(
            &app,
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let access = body_json(res).await["access_token"].as_str().unwrap().to_string();
        let res = send(&app, Method::GET, "/api/v1/me", Some(&access), None).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn journal_trash_restore_scenario() {
        let app = build_app(AppState::fake());
        let token = sign_up(&app, "alice_1").await;

        let morning = create(&app, &token, "Morning", "I am grateful for the sunrise").await;
        create(&app, &token, "Evening", "A quiet walk home").await;
        assert_eq!(morning["sentiment"], "Positive");
        assert_eq!(morning["sentiment_label"], "Positive");

        let res = send(
            &app,
            Method::POST,
            "/api/v1/entries/trash",
            Some(&token),
            Some(json!({ "ids": [morning["id"]] })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["affected"], 1);

        let active = body_json(send(&app, Method::GET, "/api/v1/entries", Some(&token), None).await).await;
        let trash = body_json(send(&app, Method::GET, "/api/v1/trash", Some(&token), None).await).await;
        assert_eq!(titles(&active), ["Evening"]);
        assert_eq!(titles(&trash), ["Morning"]);

        let res = send(
            &app,
            Method::POST,
            "/api/v1/trash/restore",
            Some(&token),
            Some(json!({ "all": true })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let active = body_json(
            send(&app, Method::GET, "/api/v1/entries?sort=title_asc", Some(&token), None).await,
        )
        .await;
        assert_eq!(titles(&active), ["Evening", "Morning"]);
        let desc = body_json(
            send(&app, Method::GET, "/api/v1/entries?sort=title_desc", Some(&token), None).await,
        )
        .await;
        assert_eq!(titles(&desc), ["Morning", "Evening"]);
    }

    #[tokio::test]
    async fn empty_content_and_empty_selection_are_rejected() {
        let app = build_app(AppState::fake());
        let token = sign_up(&app, "bob_22").await;

        let res = send(
            &app,
            Method::POST,
            "/api/v1/entries",
            Some(&token),
            Some(json!({ "content": "   " })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_bytes(res).await, b"Please write something before saving!");

        let res = send(&app, Method::POST, "/api/v1/trash/delete", Some(&token), Some(json!({}))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn exports_text_pdf_and_archive() {
        let app = build_app(AppState::fake());
        let token = sign_up(&app, "carol_3").await;

        let res = send(&app, Method::GET, "/api/v1/entries/archive", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let entry = create(&app, &token, "Day one", "Thankful for friends").await;
        let id = entry["id"].as_str().unwrap();

        let res = send(&app, Method::GET, &format!("/api/v1/entries/{id}/export"), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Day one.txt\""
        );
        let text = String::from_utf8(body_bytes(res).await).unwrap();
        assert!(text.starts_with("Title: Day one\nDate: "));
        assert!(text.ends_with("\n\nThankful for friends"));

        let res = send(
            &app,
            Method::GET,
            &format!("/api/v1/entries/{id}/export?format=pdf"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
        assert!(body_bytes(res).await.starts_with(b"%PDF"));

        let res = send(&app, Method::GET, "/api/v1/entries/archive", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/zip");
        assert!(body_bytes(res).await.starts_with(b"PK"));

        let res = send(&app, Method::GET, "/api/v1/entries/metadata", Some(&token), None).await;
        let meta: Value = serde_json::from_slice(&body_bytes(res).await).unwrap();
        assert_eq!(titles(&meta), ["Day one"]);

        let missing = uuid::Uuid::new_v4();
        let res = send(&app, Method::GET, &format!("/api/v1/entries/{missing}/export"), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn email_validates_recipient_then_sends() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::fake_with(Arc::new(CannedModel(Some("ok".into()))), mailer.clone());
        let app = build_app(state);
        let token = sign_up(&app, "dave_4").await;
        create(&app, &token, "Sunday", "Pancakes").await;

        let res = send(
            &app,
            Method::POST,
            "/api/v1/entries/email",
            Some(&token),
            Some(json!({ "recipient": "not-an-address", "all": true })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(mailer.sent.lock().await.is_empty());

        let res = send(
            &app,
            Method::POST,
            "/api/v1/entries/email",
            Some(&token),
            Some(json!({ "recipient": "friend@example.com", "all": true })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "My Gratitude Journal Entry");
    }

    #[tokio::test]
    async fn email_failure_is_a_bad_gateway() {
        let state = AppState::fake_with(
            Arc::new(CannedModel(Some("ok".into()))),
            Arc::new(RecordingMailer::failing()),
        );
        let app = build_app(state);
        let token = sign_up(&app, "erin_5").await;
        create(&app, &token, "Sunday", "Pancakes").await;

        let res = send(
            &app,
            Method::POST,
            "/api/v1/entries/email",
            Some(&token),
            Some(json!({ "recipient": "friend@example.com", "all": true })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn chat_records_history_only_on_success() {
        let app = build_app(AppState::fake());
        let token = sign_up(&app, "frank_6").await;

        let res = send(
            &app,
            Method::POST,
            "/api/v1/chat",
            Some(&token),
            Some(json!({ "prompt": "How can I relax?" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let reply = body_json(res).await;
        assert_eq!(reply["sentiment"], "Positive");

        let history = body_json(send(&app, Method::GET, "/api/v1/chat/history", Some(&token), None).await).await;
        assert_eq!(history[0]["user"], "How can I relax?");

        let res = send(&app, Method::DELETE, "/api/v1/chat/history", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let history = body_json(send(&app, Method::GET, "/api/v1/chat/history", Some(&token), None).await).await;
        assert_eq!(history, json!([]));

        let down = build_app(AppState::fake_with(
            Arc::new(CannedModel(None)),
            Arc::new(RecordingMailer::default()),
        ));
        let token = sign_up(&down, "frank_6").await;
        let res = send(&down, Method::POST, "/api/v1/chat", Some(&token), Some(json!({ "prompt": "hi" }))).await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let history = body_json(send(&down, Method::GET, "/api/v1/chat/history", Some(&token), None).await).await;
        assert_eq!(history, json!([]));
    }

    #[tokio::test]
    async fn preferences_round_trip() {
        let app = build_app(AppState::fake());
        let token = sign_up(&app, "gina_7").await;

        let prefs = body_json(send(&app, Method::GET, "/api/v1/preferences", Some(&token), None).await).await;
        assert_eq!(prefs["theme"], "Light");
        assert_eq!(prefs["primary_color"], "#4CAF50");
        assert_eq!(prefs["palette"]["background"], "#E8F5E9");

        let res = send(
            &app,
            Method::PUT,
            "/api/v1/preferences",
            Some(&token),
            Some(json!({ "theme": "Dark", "primary_color": "#112233" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let prefs = body_json(send(&app, Method::GET, "/api/v1/preferences", Some(&token), None).await).await;
        assert_eq!(prefs["theme"], "Dark");
        assert_eq!(prefs["palette"]["background"], "#121212");

        let res = send(
            &app,
            Method::PUT,
            "/api/v1/preferences",
            Some(&token),
            Some(json!({ "theme": "Dark", "primary_color": "blue" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn course_progress_and_timer_validation() {
        let app = build_app(AppState::fake());
        let token = sign_up(&app, "hank_8").await;

        let course = body_json(send(&app, Method::GET, "/api/v1/mindfulness/course", Some(&token), None).await).await;
        assert_eq!(course["step"], 0);
        assert_eq!(course["section"]["title"], "What is Mindfulness?");

        for _ in 0..6 {
            send(&app, Method::POST, "/api/v1/mindfulness/course/complete", Some(&token), None).await;
        }
        let course = body_json(send(&app, Method::GET, "/api/v1/mindfulness/course", Some(&token), None).await).await;
        assert_eq!(course["step"], 5);
        assert_eq!(course["fraction"], 1.0);
        assert_eq!(course["completed"], true);

        let back = body_json(
            send(&app, Method::POST, "/api/v1/mindfulness/course/back", Some(&token), None).await,
        )
        .await;
        assert_eq!(back["step"], 4);

        let res = send(&app, Method::GET, "/api/v1/mindfulness/timer?minutes=31", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(&app, Method::GET, "/api/v1/mindfulness/timer?minutes=1", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/event-stream");
    }
}
