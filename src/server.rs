/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{NoteboardError, NoteboardResult},
};
use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let body_limit = ctx.config.service.body_limit;

    // Raw drawings live under /files because /drawings/:filename answers with JSON
    let uploads = ServeDir::new(&ctx.config.storage.uploads_directory)
        .not_found_service(not_found.into_service());
    let drawings = ServeDir::new(&ctx.config.storage.drawings_directory)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/health", get(health_check))
        .merge(crate::api::routes())
        .with_state(ctx)
        .nest_service("/uploads", uploads)
        .nest_service("/files/drawings", drawings)
        .fallback(not_found)
        .layer(middleware::map_response(method_not_allowed_body))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 404 handler
async fn not_found() -> NoteboardError {
    NoteboardError::NotFound("Endpoint not found".to_string())
}

/// Give the router's bodiless 405s the standard error body, keeping `Allow`
async fn method_not_allowed_body(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let mut replacement = NoteboardError::MethodNotAllowed.into_response();
    if let Some(allow) = response.headers().get(header::ALLOW) {
        replacement.headers_mut().insert(header::ALLOW, allow.clone());
    }
    replacement
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> NoteboardResult<()> {
    let addr = ctx.config.bind_address();

    info!("Noteboard listening on {}", addr);
    info!("   Uploads:  {:?}", ctx.config.storage.uploads_directory);
    info!("   Drawings: {:?}", ctx.config.storage.drawings_directory);

    let db = ctx.db.clone();
    let app = build_router(ctx);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| NoteboardError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| NoteboardError::Internal(format!("Server error: {}", e)))?;

    db.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blob_store::decode_data_uri, blob_store::encode_data_uri, config::ServerConfig};
    use axum::{
        body::{Body, Bytes},
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde_json::Value;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    const BOUNDARY: &str = "noteboard-test-boundary";

    async fn test_app() -> (TempDir, AppContext, Router) {
        test_app_with(|_| {}).await
    }

    async fn test_app_with(configure: impl FnOnce(&mut ServerConfig)) -> (TempDir, AppContext, Router) {
        let dir = tempdir().unwrap();
        let mut config = ServerConfig::with_data_directory(dir.path());
        configure(&mut config);
        let ctx = AppContext::new(config).await.unwrap();
        let app = build_router(ctx.clone());
        (dir, ctx, app)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, value: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    fn raw_request(method: &str, uri: &str, content_type: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn edit_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
        json_request(
            "PUT",
            &format!("/edit-drawing/{}", file_name),
            json!({ "dataURL": encode_data_uri("image/png", bytes) }),
        )
    }

    fn upload_request(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    async fn save_drawing(app: &Router, bytes: &[u8]) -> String {
        let (status, body) = send_json(
            app,
            json_request(
                "POST",
                "/save-drawing",
                json!({ "dataURL": encode_data_uri("image/png", bytes) }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["imageUrl"].as_str().unwrap().to_string()
    }

    async fn fetch_drawing(app: &Router, file_name: &str) -> (StatusCode, Value) {
        send_json(app, get(&format!("/drawings/{}", file_name))).await
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() {
        let (_dir, _ctx, app) = test_app().await;

        let (status, body) = send_json(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send_json(&app, get("/no-such-route")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");
    }

    #[tokio::test]
    async fn test_upload_stores_record_and_file() {
        let (_dir, _ctx, app) = test_app().await;
        let payload = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF".to_vec();

        let (status, record) = send_json(
            &app,
            upload_request(
                &[("title", "A"), ("description", "B"), ("author", "C")],
                Some(("paper.pdf", payload.as_slice())),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["title"], "A");
        assert_eq!(record["description"], "B");
        assert_eq!(record["author"], "C");
        assert_eq!(record["size"], payload.len() as u64);
        assert!(record["uploadDate"].is_string());

        let file_path = record["filePath"].as_str().unwrap();
        assert!(file_path.starts_with("uploads/file-"));
        assert!(file_path.ends_with(".pdf"));

        // The stored path is served back verbatim
        let (status, body) = send(&app, get(&format!("/{}", file_path))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), payload.as_slice());

        let (status, pdfs) = send_json(&app, get("/pdfs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pdfs.as_array().unwrap().len(), 1);
        assert_eq!(pdfs[0]["id"], record["id"]);
    }

    #[tokio::test]
    async fn test_upload_without_file_is_rejected() {
        let (_dir, ctx, app) = test_app().await;

        let (status, body) = send_json(&app, upload_request(&[("title", "A")], None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No file uploaded");

        assert_eq!(file_count(&ctx.config.storage.uploads_directory), 0);
        let (_, pdfs) = send_json(&app, get("/pdfs")).await;
        assert!(pdfs.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drawing_round_trip() {
        let (_dir, _ctx, app) = test_app().await;
        let original = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

        let image_url = save_drawing(&app, &original).await;
        let file_name = image_url.strip_prefix("/drawings/").unwrap();
        assert!(file_name.starts_with("drawing-"));

        let (status, body) = fetch_drawing(&app, file_name).await;
        assert_eq!(status, StatusCode::OK);
        let data_url = body["dataURL"].as_str().unwrap();
        assert!(data_url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_uri(data_url).unwrap(), original);

        let (status, raw) = send(&app, get(&format!("/files/drawings/{}", file_name))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(raw.as_ref(), &original[..]);

        let (_, paths) = send_json(&app, get("/drawings")).await;
        assert_eq!(paths, json!([image_url]));
    }

    #[tokio::test]
    async fn test_edit_overwrites_drawing() {
        let (_dir, ctx, app) = test_app().await;

        let image_url = save_drawing(&app, b"original strokes").await;
        let file_name = image_url.strip_prefix("/drawings/").unwrap();

        let (status, body) = send_json(
            &app,
            json_request(
                "PUT",
                &format!("/edit-drawing/{}", file_name),
                json!({ "dataURL": encode_data_uri("image/png", b"edited strokes") }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imageUrl"], image_url);
        assert_eq!(body["message"], "Drawing updated successfully.");

        let (_, body) = fetch_drawing(&app, file_name).await;
        let data = decode_data_uri(body["dataURL"].as_str().unwrap()).unwrap();
        assert_eq!(data, b"edited strokes");

        // Same record, no new one
        let (_, paths) = send_json(&app, get("/drawings")).await;
        assert_eq!(paths, json!([image_url]));
        assert_eq!(file_count(&ctx.config.storage.drawings_directory), 1);
    }

    #[tokio::test]
    async fn test_edit_without_data_is_rejected() {
        let (_dir, _ctx, app) = test_app().await;

        let image_url = save_drawing(&app, b"keep me").await;
        let file_name = image_url.strip_prefix("/drawings/").unwrap();

        let (status, _) = send_json(
            &app,
            json_request("PUT", &format!("/edit-drawing/{}", file_name), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = fetch_drawing(&app, file_name).await;
        let data = decode_data_uri(body["dataURL"].as_str().unwrap()).unwrap();
        assert_eq!(data, b"keep me");
    }

    #[tokio::test]
    async fn test_delete_removes_blob_and_record() {
        let (_dir, ctx, app) = test_app().await;

        let image_url = save_drawing(&app, b"short lived").await;
        let file_name = image_url.strip_prefix("/drawings/").unwrap();

        let (status, body) = send_json(&app, delete(&format!("/drawings/{}", file_name))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Image deleted successfully.");

        let (status, body) = fetch_drawing(&app, file_name).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");

        let (_, paths) = send_json(&app, get("/drawings")).await;
        assert_eq!(paths, json!([]));
        assert_eq!(file_count(&ctx.config.storage.drawings_directory), 0);

        let (status, _) = send_json(&app, delete(&format!("/drawings/{}", file_name))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_save_without_data_writes_nothing() {
        let (_dir, ctx, app) = test_app().await;

        let (status, body) = send_json(&app, json_request("POST", "/save-drawing", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No drawing data received");

        let (status, _) = send_json(
            &app,
            json_request("POST", "/save-drawing", json!({ "dataURL": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(file_count(&ctx.config.storage.drawings_directory), 0);
        let (_, paths) = send_json(&app, get("/drawings")).await;
        assert_eq!(paths, json!([]));
    }

    #[tokio::test]
    async fn test_traversal_filenames_are_rejected() {
        let (_dir, _ctx, app) = test_app().await;

        let (status, _) = fetch_drawing(&app, "..%2Fnoteboard.sqlite").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_json(&app, delete("/drawings/..%2Fnoteboard.sqlite")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_failed_insert_removes_written_blob() {
        let (_dir, ctx, app) = test_app().await;

        sqlx::query("DROP TABLE drawings").execute(&ctx.db).await.unwrap();
        sqlx::query("DROP TABLE pdfs").execute(&ctx.db).await.unwrap();

        let (status, body) = send_json(
            &app,
            json_request(
                "POST",
                "/save-drawing",
                json!({ "dataURL": encode_data_uri("image/png", b"orphan") }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(file_count(&ctx.config.storage.drawings_directory), 0);

        let (status, _) = send_json(&app, upload_request(&[], Some(("x.pdf", &b"%PDF"[..])))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(file_count(&ctx.config.storage.uploads_directory), 0);
    }

    #[tokio::test]
    async fn test_notes_are_filtered_by_pdf() {
        let (_dir, _ctx, app) = test_app().await;

        for (pdf_id, content) in [("pdf-1", "first"), ("pdf-2", "elsewhere"), ("pdf-1", "second")] {
            let (status, note) = send_json(
                &app,
                json_request("POST", "/notes", json!({ "pdfId": pdf_id, "content": content })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(note["pdfId"], pdf_id);
            assert!(note["id"].is_string());
            assert!(note["createdAt"].is_string());
        }

        let (status, notes) = send_json(&app, get("/notes/pdf-1")).await;
        assert_eq!(status, StatusCode::OK);
        let contents: Vec<&str> = notes
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_note_requires_content() {
        let (_dir, _ctx, app) = test_app().await;

        let (status, body) = send_json(
            &app,
            json_request("POST", "/notes", json!({ "pdfId": "pdf-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");

        let (_, notes) = send_json(&app, get("/notes/pdf-1")).await;
        assert_eq!(notes, json!([]));
    }

    #[tokio::test]
    async fn test_static_misses_and_wrong_methods_get_json_errors() {
        let (_dir, _ctx, app) = test_app().await;

        for uri in ["/uploads/missing.pdf", "/files/drawings/missing.png"] {
            let (status, body) = send_json(&app, get(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert_eq!(body["error"], "NotFound");
        }

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/pdfs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().contains_key(header::ALLOW));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "MethodNotAllowed");
        assert_eq!(body["message"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_edit_of_untracked_drawing_records_it() {
        let (_dir, _ctx, app) = test_app().await;

        let (status, body) = send_json(&app, edit_request("drawing-42.png", b"from elsewhere")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imageUrl"], "/drawings/drawing-42.png");

        let (_, paths) = send_json(&app, get("/drawings")).await;
        assert_eq!(paths, json!(["/drawings/drawing-42.png"]));

        // A second edit refreshes the same record
        let (status, _) = send_json(&app, edit_request("drawing-42.png", b"again")).await;
        assert_eq!(status, StatusCode::OK);
        let (_, paths) = send_json(&app, get("/drawings")).await;
        assert_eq!(paths, json!(["/drawings/drawing-42.png"]));

        let (_, body) = fetch_drawing(&app, "drawing-42.png").await;
        let data = decode_data_uri(body["dataURL"].as_str().unwrap()).unwrap();
        assert_eq!(data, b"again");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_edits_of_untracked_drawing_both_succeed() {
        let (_dir, _ctx, app) = test_app().await;

        for i in 0..20 {
            let file_name = format!("untracked-{}.png", i);
            let ((first, _), (second, _)) = tokio::join!(
                send_json(&app, edit_request(&file_name, b"left")),
                send_json(&app, edit_request(&file_name, b"right")),
            );
            assert_eq!(first, StatusCode::OK, "{}", file_name);
            assert_eq!(second, StatusCode::OK, "{}", file_name);
        }

        let (_, paths) = send_json(&app, get("/drawings")).await;
        assert_eq!(paths.as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_malformed_json_bodies_are_rejected() {
        let (_dir, ctx, app) = test_app().await;

        let (status, body) = send_json(
            &app,
            raw_request("POST", "/save-drawing", "application/json", "{\"dataURL\": "),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");

        let (status, body) = send_json(
            &app,
            raw_request("POST", "/notes", "text/plain", r#"{"pdfId":"pdf-1","content":"hi"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");

        assert_eq!(file_count(&ctx.config.storage.drawings_directory), 0);
        let (_, notes) = send_json(&app, get("/notes/pdf-1")).await;
        assert_eq!(notes, json!([]));
    }

    #[tokio::test]
    async fn test_malformed_data_urls_are_rejected() {
        let (_dir, ctx, app) = test_app().await;

        let (status, body) = send_json(
            &app,
            json_request("POST", "/save-drawing", json!({ "dataURL": "not a data url" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");
        assert_eq!(file_count(&ctx.config.storage.drawings_directory), 0);

        let image_url = save_drawing(&app, b"keep me").await;
        let file_name = image_url.strip_prefix("/drawings/").unwrap();

        let (status, _) = send_json(
            &app,
            json_request(
                "PUT",
                &format!("/edit-drawing/{}", file_name),
                json!({ "dataURL": "data:image/png;base64,@@@" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = fetch_drawing(&app, file_name).await;
        let data = decode_data_uri(body["dataURL"].as_str().unwrap()).unwrap();
        assert_eq!(data, b"keep me");
    }

    #[tokio::test]
    async fn test_malformed_multipart_is_rejected() {
        let (_dir, ctx, app) = test_app().await;

        // No boundary parameter
        let (status, body) = send_json(
            &app,
            raw_request("POST", "/upload", "multipart/form-data", "whatever"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");

        // Stream cut off inside the file part
        let truncated = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"x.pdf\"\r\n\r\n%PDF-1.4"
        );
        let (status, body) = send_json(
            &app,
            raw_request(
                "POST",
                "/upload",
                &format!("multipart/form-data; boundary={BOUNDARY}"),
                &truncated,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");

        assert_eq!(file_count(&ctx.config.storage.uploads_directory), 0);
        let (_, pdfs) = send_json(&app, get("/pdfs")).await;
        assert_eq!(pdfs, json!([]));
    }

    #[tokio::test]
    async fn test_oversized_json_body_is_413() {
        let (_dir, ctx, app) = test_app_with(|config| config.service.body_limit = 1024).await;

        let (status, body) = send_json(
            &app,
            json_request(
                "POST",
                "/save-drawing",
                json!({ "dataURL": encode_data_uri("image/png", &[7u8; 4096]) }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "PayloadTooLarge");
        assert_eq!(file_count(&ctx.config.storage.drawings_directory), 0);
    }
}
