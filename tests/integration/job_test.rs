//! Integration tests for job status, listing, and service endpoints.

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_job_not_found() {
    let app = TestApp::new().await;

    let r = app
        .request("GET", "/api/status/00000000-0000-0000-0000-999999999999", None)
        .await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
    assert_eq!(r.body["error"], "NOT_FOUND");

    let r = app.request("GET", "/api/status/not-a-uuid", None).await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_jobs_newest_first() {
    let app = TestApp::new().await;

    let r = app.request("GET", "/api/jobs", None).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body, json!({"jobs": []}));

    let registry = app.state.registry();
    let first = registry.create("first.svs", 1);
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = registry.create("second.svs", 2);

    let r = app.request("GET", "/api/jobs", None).await;
    let jobs = r.body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"], second.to_string());
    assert_eq!(jobs[1]["id"], first.to_string());
    assert_eq!(jobs[1]["status"], "pending");

    let r = app.request("GET", &format!("/api/status/{first}"), None).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["original_filename"], "first.svs");
    assert_eq!(r.body["progress"], 0);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let r = app.request("GET", "/api/health", None).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["status"], "ok");
    assert_eq!(r.body["version"], env!("CARGO_PKG_VERSION"));
    assert!(r.body["uptime_seconds"].is_u64());
    assert_eq!(r.body["queue_depth"], 0);
    assert_eq!(r.body["active_sessions"], 0);
}

#[tokio::test]
async fn test_service_banner_lists_endpoints() {
    let app = TestApp::new().await;

    let r = app.request("GET", "/", None).await;
    assert_eq!(r.status, StatusCode::OK);
    let paths: Vec<&str> = r.body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert!(paths.contains(&"/api/upload/chunk"));
    assert!(paths.contains(&"/api/status/{job_id}"));
}
