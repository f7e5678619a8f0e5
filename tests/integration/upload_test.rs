//! Integration tests for chunked and single-request uploads.

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::{MultipartForm, STUB_TILES, StubGenerator, TestApp, count_files};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chunked_upload_is_published() {
    let app = TestApp::new().await;

    // Chunks may arrive in any order.
    let r = app.post_chunk("s1", 1, 3, "CMU-1.svs", b"def").await;
    assert_eq!(r.status, StatusCode::OK, "{:?}", r.body);
    assert_eq!(r.body["received_count"], 1);
    assert_eq!(r.body["complete"], false);

    let r = app.post_chunk("s1", 0, 3, "CMU-1.svs", b"abc").await;
    assert_eq!(r.body["received_count"], 2);

    // A re-sent chunk is acknowledged without being counted twice.
    let r = app.post_chunk("s1", 0, 3, "CMU-1.svs", b"abc").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["received_count"], 2);

    let r = app.post_chunk("s1", 2, 3, "CMU-1.svs", b"gh").await;
    assert_eq!(r.body["received_count"], 3);
    assert_eq!(r.body["bytes_in_chunk"], 2);
    assert_eq!(r.body["complete"], true);

    let status = app.request("GET", "/api/upload/status/s1", None).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["complete"], true);
    assert_eq!(status.body["progress_percent"], 100.0);
    assert_eq!(status.body["filename"], "CMU-1.svs");

    let r = app
        .request("POST", "/api/upload/complete", Some(json!({"session_id": "s1"})))
        .await;
    assert_eq!(r.status, StatusCode::OK, "{:?}", r.body);
    assert_eq!(r.body["status"], "pending");
    assert_eq!(r.body["file_size_bytes"], 8);
    let job_id = r.body["job_id"].as_str().unwrap().to_string();
    assert_eq!(r.body["status_url"], format!("/api/status/{job_id}"));

    // The merged session is gone.
    let gone = app.request("GET", "/api/upload/status/s1", None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let job = app.wait_for_job(&job_id).await;
    assert_eq!(job["status"], "completed", "{job:?}");
    assert_eq!(job["progress"], 100);
    assert_eq!(job["message"], "Conversion and upload completed successfully!");
    assert_eq!(job["original_filename"], "CMU-1.svs");

    let job_root = app.published_root().join("dzi").join(&job_id);
    assert!(job_root.join("CMU-1.dzi").is_file());
    assert!(job_root.join("CMU-1_thumbnail.jpg").is_file());
    assert!(job_root.join("CMU-1_files/2/1_1.jpg").is_file());
    let tiles: usize = STUB_TILES.iter().map(|(_, names)| names.len()).sum();
    assert_eq!(count_files(&job_root), tiles + 2);

    let dzi = job["result_refs"]["dzi"].as_str().unwrap();
    assert!(dzi.ends_with(&format!("dzi/{job_id}/CMU-1.dzi")), "{dzi}");
    let thumbnail = job["result_refs"]["thumbnail"].as_str().unwrap();
    assert!(thumbnail.ends_with("CMU-1_thumbnail.jpg"), "{thumbnail}");

    // Local working files are removed once the job settles.
    let data = std::path::Path::new(&app.config.storage.data_root);
    assert!(!data.join("uploads").join(&job_id).exists());
    assert!(!data.join("output").join(&job_id).exists());

    app.shutdown().await;
}

#[tokio::test]
async fn test_complete_incomplete_session_conflicts() {
    let app = TestApp::new().await;
    app.post_chunk("half", 0, 2, "slide.ndpi", b"one").await;

    let r = app
        .request("POST", "/api/upload/complete", Some(json!({"session_id": "half"})))
        .await;
    assert_eq!(r.status, StatusCode::CONFLICT);
    assert_eq!(r.body["error"], "CONFLICT");

    let jobs = app.request("GET", "/api/jobs", None).await;
    assert_eq!(jobs.body["jobs"], json!([]));

    // The session is still usable.
    let r = app.post_chunk("half", 1, 2, "slide.ndpi", b"two").await;
    assert_eq!(r.body["complete"], true);
}

#[tokio::test]
async fn test_total_mismatch_is_rejected() {
    let app = TestApp::new().await;
    app.post_chunk("mm", 0, 3, "a.svs", b"x").await;

    let r = app.post_chunk("mm", 1, 4, "a.svs", b"y").await;
    assert_eq!(r.status, StatusCode::CONFLICT);
    assert_eq!(r.body["error"], "PROTOCOL_MISMATCH");

    let status = app.request("GET", "/api/upload/status/mm", None).await;
    assert_eq!(status.body["received_count"], 1);
    assert_eq!(status.body["total_chunks"], 3);
}

#[tokio::test]
async fn test_chunk_form_validation() {
    let app = TestApp::new().await;

    let missing_payload = MultipartForm::new()
        .text("session_id", "v1")
        .text("chunk_index", "0")
        .text("total_chunks", "1")
        .text("filename", "a.svs");
    let r = app.post_form("/api/upload/chunk", missing_payload).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.body["error"], "VALIDATION_ERROR");

    let bad_index = MultipartForm::new()
        .text("session_id", "v1")
        .text("chunk_index", "first")
        .text("total_chunks", "1")
        .text("filename", "a.svs")
        .file("chunk", "blob", b"x");
    let r = app.post_form("/api/upload/chunk", bad_index).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);

    let out_of_range = app.post_chunk("v1", 5, 2, "a.svs", b"x").await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);

    let bad_session = app.post_chunk("../escape", 0, 1, "a.svs", b"x").await;
    assert_eq!(bad_session.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_session() {
    let app = TestApp::new().await;

    let r = app.request("GET", "/api/upload/status/nope", None).await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
    assert_eq!(r.body["error"], "NOT_FOUND");

    let r = app
        .request("POST", "/api/upload/complete", Some(json!({"session_id": "nope"})))
        .await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_complete_rejects_unsupported_type_and_bad_json() {
    let app = TestApp::new().await;
    app.post_chunk("txt", 0, 1, "notes.txt", b"hello").await;

    let r = app
        .request("POST", "/api/upload/complete", Some(json!({"session_id": "txt"})))
        .await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert!(r.body["message"].as_str().unwrap().contains("not supported"));

    let r = app
        .request("POST", "/api/upload/complete", Some(json!({"session": "txt"})))
        .await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.body["error"], "VALIDATION_ERROR");

    let r = app
        .request("POST", "/api/upload/complete", Some(json!({"session_id": ""})))
        .await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_request_upload() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().file("file", "whole.tiff", b"tiff-bytes");
    let r = app.post_form("/api/upload?provider=local", form).await;
    assert_eq!(r.status, StatusCode::OK, "{:?}", r.body);
    assert_eq!(r.body["file_size_bytes"], 10);
    let job_id = r.body["job_id"].as_str().unwrap().to_string();

    let job = app.wait_for_job(&job_id).await;
    assert_eq!(job["status"], "completed", "{job:?}");
    assert!(
        app.published_root()
            .join("dzi")
            .join(&job_id)
            .join("whole.dzi")
            .is_file()
    );

    let empty = MultipartForm::new().text("note", "no file here");
    let r = app.post_form("/api/upload", empty).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bucket_outside_naming_rules_fails_the_job() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().file("file", "slide.svs", b"svs");
    let r = app.post_form("/api/upload?bucket=..%2Fescaped", form).await;
    assert_eq!(r.status, StatusCode::OK);
    let job_id = r.body["job_id"].as_str().unwrap().to_string();

    let job = app.wait_for_job(&job_id).await;
    assert_eq!(job["status"], "failed");
    assert_eq!(job["message"], "Upload failed: Invalid bucket name '../escaped'");

    let local_root = std::path::PathBuf::from(&app.config.publisher.local_root);
    let escaped = local_root.parent().unwrap().join("escaped");
    assert!(!escaped.exists());

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_provider_fails_the_job() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().file("file", "slide.svs", b"svs");
    let r = app.post_form("/api/upload?provider=oss", form).await;
    assert_eq!(r.status, StatusCode::OK);
    let job_id = r.body["job_id"].as_str().unwrap().to_string();

    let job = app.wait_for_job(&job_id).await;
    assert_eq!(job["status"], "failed");
    let message = job["message"].as_str().unwrap();
    assert!(message.starts_with("Upload failed: Unknown provider 'oss'"), "{message}");

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_conversion_failure_is_reported() {
    let app = TestApp::with_generator(StubGenerator { fail: true }).await;

    app.post_chunk("bad", 0, 1, "broken.svs", b"garbage").await;
    let r = app
        .request("POST", "/api/upload/complete", Some(json!({"session_id": "bad"})))
        .await;
    let job_id = r.body["job_id"].as_str().unwrap().to_string();

    let job = app.wait_for_job(&job_id).await;
    assert_eq!(job["status"], "failed");
    assert_eq!(
        job["message"],
        "Conversion failed: the tile generator exited with an error"
    );
    assert!(!job["message"].as_str().unwrap().contains("broken.svs"));
    assert_eq!(job["result_refs"], json!({}));
    assert_eq!(count_files(&app.published_root()), 0);

    app.shutdown().await;
}
