//! API-level tests against the local backend.

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use lopdf::content::Content;
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};
use permitseal_core::{AppConfig, BackendProvider};
use tempfile::TempDir;

struct TestApp {
    server: TestServer,
    _dir: TempDir,
}

async fn setup_test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = AppConfig {
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        public_origin: "https://permits.example.com".to_string(),
        backend: BackendProvider::Local,
        permit_id_prefix: "PERMIT".to_string(),
        environment: "test".to_string(),
        max_document_size_bytes: 10 * 1024 * 1024,
        allowed_extensions: vec!["pdf".to_string()],
        allowed_content_types: vec!["application/pdf".to_string()],
        database_url: None,
        db_max_connections: 5,
        storage_endpoint: None,
        storage_region: None,
        firebase_project_id: None,
        firebase_storage_bucket: None,
        firebase_auth_token: None,
        firebase_poll_interval_secs: 5,
        local_data_path: Some(dir.path().join("meta").to_string_lossy().into_owned()),
        local_storage_path: Some(dir.path().join("files").to_string_lossy().into_owned()),
        local_storage_base_url: Some("https://permits.example.com/files".to_string()),
        stale_threshold_secs: 900,
    };

    let (_state, router) = permitseal_api::initialize_app(config).await.unwrap();
    TestApp {
        server: TestServer::new(router).unwrap(),
        _dir: dir,
    }
}

fn sample_pdf() -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        Content {
            operations: Vec::new(),
        }
        .encode()
        .unwrap(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn pdf_upload_form(filename: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(sample_pdf())
            .file_name(filename)
            .mime_type("application/pdf"),
    )
}

#[tokio::test]
async fn test_upload_then_fetch_and_download() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post("/api/v0/documents")
        .multipart(pdf_upload_form("permit.pdf"))
        .await;
    assert_eq!(response.status_code(), 200);

    let doc: serde_json::Value = response.json();
    assert_eq!(doc["name"], "permit.pdf");
    assert_eq!(doc["status"], "processed");
    let id = doc["id"].as_str().unwrap().to_string();
    assert_eq!(
        doc["shareable_url"].as_str().unwrap(),
        format!("https://permits.example.com/document/{}", id)
    );

    // Record fetch on the API path and on the shareable viewer path
    for path in [format!("/api/v0/documents/{}", id), format!("/document/{}", id)] {
        let response = app.server.get(&path).await;
        assert_eq!(response.status_code(), 200);
        let fetched: serde_json::Value = response.json();
        assert_eq!(fetched["id"].as_str(), Some(id.as_str()));
    }

    // Stamped file download is a PDF
    let response = app
        .server
        .get(&format!("/api/v0/documents/{}/file", id))
        .await;
    assert_eq!(response.status_code(), 200);
    let bytes = response.as_bytes();
    assert!(bytes.starts_with(b"%PDF"));

    // Listing shows the one document, newest first
    let response = app.server.get("/api/v0/documents").await;
    assert_eq!(response.status_code(), 200);
    let listed: Vec<serde_json::Value> = response.json();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_get_unknown_document_is_distinct_not_found() {
    let app = setup_test_app().await;

    let response = app.server.get("/api/v0/documents/PERMIT-999").await;
    assert_eq!(response.status_code(), 404);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["recoverable"], false);
}

#[tokio::test]
async fn test_upload_non_pdf_rejected() {
    let app = setup_test_app().await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"hello".to_vec())
            .file_name("notes.txt")
            .mime_type("text/plain"),
    );
    let response = app.server.post("/api/v0/documents").multipart(form).await;
    assert_eq!(response.status_code(), 400);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");

    // No record was created
    let listed: Vec<serde_json::Value> = app.server.get("/api/v0/documents").await.json();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_delete_removes_record_and_files() {
    let app = setup_test_app().await;

    let doc: serde_json::Value = app
        .server
        .post("/api/v0/documents")
        .multipart(pdf_upload_form("permit.pdf"))
        .await
        .json();
    let id = doc["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .delete(&format!("/api/v0/documents/{}", id))
        .await;
    assert_eq!(response.status_code(), 204);

    // Record gone
    let response = app.server.get(&format!("/api/v0/documents/{}", id)).await;
    assert_eq!(response.status_code(), 404);

    // Files gone on both kinds
    for kind in ["original", "processed"] {
        let response = app
            .server
            .get(&format!("/api/v0/documents/{}/file?kind={}", id, kind))
            .await;
        assert_eq!(response.status_code(), 404);
    }

    // Deleting again reports not found
    let response = app
        .server
        .delete(&format!("/api/v0/documents/{}", id))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_owner_filter_on_listing() {
    let app = setup_test_app().await;

    for owner in ["alice", "bob", "alice"] {
        let form = MultipartForm::new()
            .add_part(
                "file",
                Part::bytes(sample_pdf())
                    .file_name("permit.pdf")
                    .mime_type("application/pdf"),
            )
            .add_text("owner_user_id", owner);
        let response = app.server.post("/api/v0/documents").multipart(form).await;
        assert_eq!(response.status_code(), 200);
    }

    let listed: Vec<serde_json::Value> = app
        .server
        .get("/api/v0/documents?owner_user_id=alice")
        .await
        .json();
    assert_eq!(listed.len(), 2);
    assert!(listed
        .iter()
        .all(|d| d["owner_user_id"].as_str() == Some("alice")));
}

#[tokio::test]
async fn test_retry_on_processed_document_is_noop() {
    let app = setup_test_app().await;

    let doc: serde_json::Value = app
        .server
        .post("/api/v0/documents")
        .multipart(pdf_upload_form("permit.pdf"))
        .await
        .json();
    let id = doc["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .post(&format!("/api/v0/documents/{}/retry", id))
        .await;
    assert_eq!(response.status_code(), 200);
    let retried: serde_json::Value = response.json();
    assert_eq!(retried["status"], "processed");
    assert_eq!(retried["processed_date"], doc["processed_date"]);
}

#[tokio::test]
async fn test_stale_admin_empty_when_healthy() {
    let app = setup_test_app().await;

    app.server
        .post("/api/v0/documents")
        .multipart(pdf_upload_form("permit.pdf"))
        .await
        .assert_status_ok();

    let stale: Vec<serde_json::Value> = app.server.get("/api/v0/admin/stale").await.json();
    assert!(stale.is_empty());
}

#[tokio::test]
async fn test_health() {
    let app = setup_test_app().await;
    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), 200);
}
