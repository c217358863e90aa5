use axum::{
    body::{to_bytes, Body},
    http::Request,
};
use finlink_server::{api::app_router, build_state, config::Config};
use tempfile::tempdir;
use tower::ServiceExt;

#[tokio::test]
async fn healthz_works_with_sqlite_store() {
    let tmp = tempdir().unwrap();
    std::env::set_var("FL_DB_PATH", tmp.path().join("db").join("test.db"));
    std::env::set_var("FL_SYNC_INTERVAL_SECS", "0");
    let config = Config::from_env().unwrap();
    let state = build_state(&config).await.unwrap();
    let app = app_router(state, &config);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");

    assert!(tmp.path().join("db").join("test.db").exists());

    for key in ["FL_DB_PATH", "FL_SYNC_INTERVAL_SECS"] {
        std::env::remove_var(key);
    }
}
