//! HTTP level tests running the full application stack against a temporary
//! upload directory.

use actix_web::{http::header, http::StatusCode, test, web};
use serde_json::Value;
use std::{collections::HashMap, path::Path, sync::Arc};

use crate::{
    configs,
    constants::Env,
    modules::{
        file_upload::{FileUploadService, LocalFileRepository, UploadConfig},
        health::StartedAt,
    },
};

const BOUNDARY: &str = "----file-api-test-boundary";
const BASE_URL: &str = "http://files.test";

fn test_env(dir: &Path, extra: &[(&str, &str)]) -> Env {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("UPLOAD_DIR".into(), dir.display().to_string());
    vars.insert("BASE_URL".into(), BASE_URL.into());
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    Env::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

macro_rules! init_app {
    ($env:expr) => {{
        let env: Env = $env;
        let file_repo = LocalFileRepository::new(env.upload_dir.clone());
        let file_service = web::Data::new(FileUploadService::new(
            Arc::new(file_repo),
            UploadConfig::from_env(&env),
        ));
        test::init_service(configs::create_app(
            web::Data::new(env),
            file_service,
            web::Data::new(StartedAt::now()),
        ))
        .await
    }};
}

enum Part<'a> {
    File { field: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8] },
    Text { name: &'a str, value: &'a str },
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File { field, filename, content_type, data } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        field, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(parts: &[Part]) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/upload")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(parts))
}

fn file_part<'a>(filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Part<'a> {
    Part::File { field: "file", filename, content_type, data }
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

fn path_of(url: &str) -> String {
    url.strip_prefix(BASE_URL).expect("url under the configured base").to_string()
}

#[actix_web::test]
async fn test_upload_then_download_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));
    let png: &[u8] = b"\x89PNG\r\n\x1a\n fake image bytes";

    let req = upload_request(&[file_part("cat photo.png", "image/png", png)]).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "File uploaded successfully");
    assert_eq!(body["originalName"], "cat photo.png");
    assert_eq!(body["mimetype"], "image/png");
    assert_eq!(body["size"], png.len() as u64);

    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with("-cat_photo.png"));
    let url = body["url"].as_str().unwrap();
    assert_eq!(url, format!("{}/api/files/{}", BASE_URL, filename));

    let req = test::TestRequest::get().uri(&path_of(url)).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert!(res.headers().contains_key(header::LAST_MODIFIED));
    let bytes = test::read_body(res).await;
    assert_eq!(bytes.as_ref(), png);
}

#[actix_web::test]
async fn test_same_name_twice_gives_two_files() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    let mut urls = Vec::new();
    for content in [&b"first"[..], &b"second"[..]] {
        let req = upload_request(&[file_part("notes.txt", "text/plain", content)]).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        urls.push(body["url"].as_str().unwrap().to_string());
    }
    assert_ne!(urls[0], urls[1]);
    assert_eq!(entries(dir.path()), 2);

    for (url, expected) in urls.iter().zip([&b"first"[..], &b"second"[..]]) {
        let req = test::TestRequest::get().uri(&path_of(url)).to_request();
        let bytes = test::call_and_read_body(&app, req).await;
        assert_eq!(bytes.as_ref(), expected);
    }
}

#[actix_web::test]
async fn test_missing_file_field() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    let req = upload_request(&[Part::Text { name: "note", value: "no attachment" }]).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "File validation error");
    assert_eq!(body["message"], "No file uploaded");
}

#[actix_web::test]
async fn test_non_multipart_request_has_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload(r#"{"file":"nope"}"#)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "File validation error");
}

#[actix_web::test]
async fn test_text_fields_next_to_file_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    let req = upload_request(&[
        Part::Text { name: "description", value: "quarterly report" },
        file_part("report.pdf", "application/pdf", b"%PDF-1.7"),
    ])
    .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(entries(dir.path()), 1);
}

#[actix_web::test]
async fn test_oversized_upload_is_rejected_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[("MAX_FILE_SIZE", "16")]));

    let req = upload_request(&[file_part("big.txt", "text/plain", &[b'x'; 64])]).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "File too large");
    assert_eq!(entries(dir.path()), 0);
}

#[actix_web::test]
async fn test_declared_length_over_limit_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[("MAX_FILE_SIZE", "16")]));

    let req = upload_request(&[file_part("big.txt", "text/plain", &[b'x'; 64])])
        .insert_header((header::CONTENT_LENGTH, (200 * 1024 * 1024).to_string()))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(entries(dir.path()), 0);
}

#[actix_web::test]
async fn test_disallowed_type_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    let req = upload_request(&[file_part("tool", "application/x-executable", b"\x7fELF")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "File validation error");
    assert_eq!(body["message"], "File type 'application/x-executable' is not allowed");
    assert_eq!(entries(dir.path()), 0);
}

#[actix_web::test]
async fn test_unexpected_fields() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    let req = upload_request(&[Part::File {
        field: "avatar",
        filename: "me.png",
        content_type: "image/png",
        data: b"png",
    }])
    .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "Unexpected field");

    // The first file is discarded when a second one follows it
    let req = upload_request(&[
        file_part("one.txt", "text/plain", b"1"),
        file_part("two.txt", "text/plain", b"2"),
    ])
    .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "Unexpected field");
    assert_eq!(entries(dir.path()), 0);
}

#[actix_web::test]
async fn test_traversal_attempts_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    for uri in [
        "/api/files/..%2f..%2fetc%2fpasswd",
        "/api/files/..%5C..%5Cwindows%5Cwin.ini",
        "/api/files/..",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "Invalid filename", "{}", uri);
    }
}

#[actix_web::test]
async fn test_unknown_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    let req = test::TestRequest::get().uri("/api/files/1700000000000-never.txt").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "File not found");
}

#[actix_web::test]
async fn test_directory_is_not_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    let req = test::TestRequest::get().uri("/api/files/nested").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "Invalid file");
}

#[actix_web::test]
async fn test_health_always_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    let req = test::TestRequest::get().uri("/api/files/..").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(res.headers().get("X-Frame-Options").unwrap(), "DENY");

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "API is healthy");
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    assert!(body["timestamp"].is_string());
}

#[actix_web::test]
async fn test_unmatched_route() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[]));

    let req = test::TestRequest::delete().uri("/api/nothing-here").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Route not found");
    assert_eq!(body["message"], "Cannot DELETE /api/nothing-here");
}

#[actix_web::test]
async fn test_cors_policy() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(test_env(dir.path(), &[("ALLOWED_ORIGINS", "http://allowed.test")]));

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::OPTIONS)
        .uri("/api/upload")
        .insert_header((header::ORIGIN, "http://allowed.test"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
    assert_eq!(
        res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://allowed.test"
    );

    let req = test::TestRequest::get()
        .uri("/api/health")
        .insert_header((header::ORIGIN, "http://evil.test"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "CORS Error");
}

#[actix_web::test]
async fn test_internal_errors_are_verbose_only_in_development() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the upload directory should be
    let blocked = dir.path().join("not-a-directory");
    std::fs::write(&blocked, b"").unwrap();

    for (mode, verbose) in [("production", false), ("development", true)] {
        let app = init_app!(test_env(&blocked, &[("APP_ENV", mode)]));

        let req = upload_request(&[file_part("a.txt", "text/plain", b"a")]).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", mode);

        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body.get("stack").is_some(), verbose, "{}", mode);
        assert_eq!(body["message"] == "Something went wrong", !verbose, "{}", mode);
    }
}
