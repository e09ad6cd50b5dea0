use std::net::SocketAddr;
use anyhow::Context;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use crate::state::AppState;
use crate::{contributions, images, stats, users};

pub fn build_app(state: AppState) -> Router {
    let max_mask_bytes = state.config.max_mask_bytes;
    Router::new()
        .merge(users::router())
        .merge(images::router())
        .merge(contributions::router(max_mask_bytes))
        .merge(stats::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
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
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", host, port))?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod app_tests {
    use super::*;
    use crate::config::ResubmitPolicy;
    use crate::state::test_support::{seed_images, state_with};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::util::ServiceExt; // for `oneshot`

    const BOUNDARY: &str = "eelgrass-test-boundary";

    fn form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn mask_req(user_id: i64, image_id: i64, file: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in [("user_id", user_id), ("image_id", image_id)] {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"mask.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/mask")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (st, _dir) = state_with(ResubmitPolicy::Overwrite).await;
        let app = build_app(st);
        let res = app.oneshot(get_req("/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn serve_rejects_unparsable_listen_address() {
        let (st, _dir) = state_with(ResubmitPolicy::Overwrite).await;
        let err = serve(build_app(st), "not a host", 8080).await.unwrap_err();
        assert!(err.to_string().contains("invalid listen address"), "{err}");
    }

    #[tokio::test]
    async fn alice_labels_the_whole_pool() {
        let (st, _dir) = state_with(ResubmitPolicy::Overwrite).await;
        seed_images(&st, &["A.jpg", "B.jpg"]).await;
        let app = build_app(st);

        let (status, body) = call(&app, form("/login", "name=alice&mode=new")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], 1);

        let mut seen = Vec::new();
        for _ in 0..2 {
            let (status, img) = call(&app, get_req("/image?user=1")).await;
            assert_eq!(status, StatusCode::OK);
            let id = img["id"].as_i64().expect("assigned image");
            let filename = img["filename"].as_str().unwrap();
            assert_eq!(img["url"], format!("/images/{filename}"));
            assert!(!seen.contains(&id), "image {id} handed out twice");
            seen.push(id);

            let (status, saved) =
                call(&app, form("/label", &format!("user_id=1&image_id={id}&label=eelgrass"))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(saved["status"], "saved");
        }

        let (status, done) = call(&app, get_req("/image?user=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done, serde_json::json!({ "done": true }));

        let (_, stats) = call(&app, get_req("/stats/1")).await;
        assert_eq!(stats["count"], 2);
    }

    #[tokio::test]
    async fn login_errors_map_to_statuses() {
        let (st, _dir) = state_with(ResubmitPolicy::Overwrite).await;
        let app = build_app(st);

        let (status, _) = call(&app, form("/login", "name=bob&mode=returning")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, form("/login", "name=bob&mode=new")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, form("/login", "name=bob&mode=new")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("already exists"));

        let (status, body) = call(&app, form("/login", "name=bob&mode=returning")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], 1);

        let (status, _) = call(&app, form("/login", "name=%20%20&mode=new")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mask_upload_and_lookup() {
        let (st, dir) = state_with(ResubmitPolicy::Reject).await;
        let image_id = seed_images(&st, &["A.jpg"]).await[0];
        let app = build_app(st);
        call(&app, form("/login", "name=alice&mode=new")).await;

        let (status, saved) = call(&app, mask_req(1, image_id, b"\x89PNG mask")).await;
        assert_eq!(status, StatusCode::OK, "{saved}");

        let (status, _) = call(&app, mask_req(1, image_id, b"second")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, c) = call(&app, get_req(&format!("/contributions/1/{image_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        let key = c["mask_path"].as_str().unwrap().to_string();
        assert_eq!(c["mask_url"], format!("/masks/{key}"));
        assert_eq!(std::fs::read(dir.path().join(&key)).unwrap(), b"\x89PNG mask");

        let (status, _) = call(&app, mask_req(1, image_id + 1, b"x")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn oversized_mask_is_payload_too_large() {
        let (mut st, dir) = state_with(ResubmitPolicy::Overwrite).await;
        let mut cfg = (*st.config).clone();
        cfg.max_mask_bytes = 1024;
        st.config = std::sync::Arc::new(cfg);
        let image_id = seed_images(&st, &["A.jpg"]).await[0];
        let app = build_app(st);
        call(&app, form("/login", "name=alice&mode=new")).await;

        let (status, body) = call(&app, mask_req(1, image_id, &[7u8; 4096])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{body}");
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());

        let (status, _) = call(&app, mask_req(1, image_id, &[7u8; 64])).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn leaderboard_respects_limit() {
        let (st, _dir) = state_with(ResubmitPolicy::Overwrite).await;
        seed_images(&st, &["A.jpg", "B.jpg"]).await;
        let app = build_app(st);
        for name in ["alice", "bob", "carol"] {
            call(&app, form("/login", &format!("name={name}&mode=new"))).await;
        }
        for (user, image) in [(1, 1), (2, 1), (2, 2), (3, 2)] {
            let (status, _) =
                call(&app, form("/label", &format!("user_id={user}&image_id={image}&label=x"))).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, board) = call(&app, get_req("/leaderboard?limit=2")).await;
        let board = board.as_array().unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0]["name"], "bob");
        assert_eq!(board[0]["count"], 2);
        assert_eq!(board[1]["user_id"], 1);

        let (_, all) = call(&app, get_req("/leaderboard")).await;
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unknown_user_stats_and_image_are_not_found() {
        let (st, _dir) = state_with(ResubmitPolicy::Overwrite).await;
        let app = build_app(st);
        let (status, _) = call(&app, get_req("/stats/9")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, get_req("/image?user=9")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
