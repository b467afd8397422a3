mod common;

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use common::TestContext;
use krishi_backend::middleware::ACTOR_HEADER;
use krishi_backend::models::object_id::{generate_object_id, is_valid_object_id};
use serde_json::{json, Value};

/// Sends a request and decodes the JSON body (`Null` when there is none).
macro_rules! call {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service($app, $req.to_request()).await;
        let status = resp.status();
        let bytes = test::read_body(resp).await;
        (status, serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null))
    }};
}

/// Activity entries are written in the background; waits until `count` are visible.
macro_rules! activity_after {
    ($app:expr, $count:expr) => {{
        let mut logs: Vec<Value> = Vec::new();
        for _ in 0..100 {
            let (_, body) = call!($app, get("/api/activity-logs"));
            logs = body["activityLogs"].as_array().cloned().unwrap_or_default();
            if logs.len() >= $count {
                break;
            }
            actix_web::rt::time::sleep(Duration::from_millis(20)).await;
        }
        logs
    }};
}

fn post(path: &str, body: Value) -> TestRequest {
    TestRequest::post().uri(path).set_json(body)
}

fn put(path: &str, body: Value) -> TestRequest {
    TestRequest::put().uri(path).set_json(body)
}

fn get(path: &str) -> TestRequest {
    TestRequest::get().uri(path)
}

fn delete(path: &str) -> TestRequest {
    TestRequest::delete().uri(path)
}

fn layer_feed() -> Value {
    json!({
        "name": "Layer Feed", "description": "Complete feed for laying hens",
        "price": "Rs. 2,450 / 50kg", "category": "dana", "subcategory": "poultry"
    })
}

fn multipart(boundary: &str, filename: &str, mime: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {m}\r\n\r\n",
            b = boundary,
            f = filename,
            m = mime
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

fn upload(resource: &str, filename: &str, mime: &str, content: &[u8]) -> TestRequest {
    let boundary = "krishiboundary42";
    TestRequest::post()
        .uri(&format!("/api/upload?resource={}", resource))
        .insert_header(("Content-Type", format!("multipart/form-data; boundary={}", boundary)))
        .set_payload(multipart(boundary, filename, mime, content))
}

#[actix_web::test]
async fn server_reports_active() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let resp = test::call_service(&app, get("/api/is_server_active").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "active");
}

#[actix_web::test]
async fn notice_lifecycle_is_logged() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::post()
        .uri("/api/notices")
        .insert_header((ACTOR_HEADER, "Sita"))
        .set_json(json!({"title": "Maintenance", "content": "Office closed on Friday", "priority": "high"}));
    let (status, body) = call!(&app, req);
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    let notice = body["notice"].clone();
    let id = notice["id"].as_str().unwrap().to_string();
    assert!(is_valid_object_id(&id));
    assert_eq!(notice["version"], 1);
    assert_eq!(notice["isActive"], true);
    assert_eq!(notice["category"], "general");
    assert_eq!(activity_after!(&app, 1).len(), 1);

    let (_, body) = call!(&app, get("/api/notices"));
    assert_eq!(body["notices"].as_array().unwrap().len(), 1);

    let mut edited = notice.clone();
    edited["title"] = json!("Maintenance (rescheduled)");
    let (status, body) = call!(&app, put("/api/notices", edited.clone()));
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["notice"]["version"], 2);
    assert_eq!(body["notice"]["createdAt"], notice["createdAt"]);
    assert_eq!(activity_after!(&app, 2).len(), 2);

    // Same stale copy again: someone else's change must not be overwritten.
    let (status, body) = call!(&app, put("/api/notices", edited));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("current version 2"));

    let (status, _) = call!(&app, delete(&format!("/api/notices?id={}", id)));
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call!(&app, get("/api/notices"));
    assert!(body["notices"].as_array().unwrap().is_empty());

    let (status, body) = call!(&app, delete(&format!("/api/notices?id={}", id)));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Notice not found.");

    let logs = activity_after!(&app, 3);
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0]["action"], "delete");
    assert_eq!(logs[0]["detail"], "Deleted notice: Maintenance (rescheduled)");
    assert_eq!(logs[0]["module"], "Notices");
    assert_eq!(logs[1]["action"], "update");
    assert_eq!(logs[2]["detail"], "Created notice: Maintenance");
    assert_eq!(logs[2]["actor"], "Sita");
    assert_eq!(logs[0]["actor"], "admin");
}

#[actix_web::test]
async fn malformed_ids_are_rejected_before_storage() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let (_, body) = call!(&app, post("/api/products", layer_feed()));
    let product = body["product"].clone();

    let (status, body) = call!(&app, delete("/api/products?id=12345"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = call!(&app, delete("/api/products"));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad = product.clone();
    bad["id"] = json!("not-an-object-id");
    let (status, _) = call!(&app, put("/api/products", bad));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut numeric = product.clone();
    numeric["id"] = json!(42);
    let (status, _) = call!(&app, put("/api/products", numeric));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Ids are taken exactly as sent; surrounding whitespace is not stripped.
    let id = product["id"].as_str().unwrap().to_string();
    let mut padded = product.clone();
    padded["id"] = json!(format!(" {} ", id));
    let (status, body) = call!(&app, put("/api/products", padded));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid id format"), "{body}");
    let (status, _) = call!(&app, delete(&format!("/api/products?id=%20{}%20", id)));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call!(&app, get("/api/products"));
    assert_eq!(body["products"], json!([product]));
}

#[actix_web::test]
async fn unknown_ids_are_not_found() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let ghost = generate_object_id();

    let (status, body) = call!(&app, delete(&format!("/api/team-members?id={}", ghost)));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Team member not found.");

    let mut payload = layer_feed();
    payload["id"] = json!(ghost);
    let (status, _) = call!(&app, put("/api/products", payload));
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Uppercase hex is well formed, so it reaches the store and simply misses.
    let (_, body) = call!(&app, post("/api/products", layer_feed()));
    let shouted = body["product"]["id"].as_str().unwrap().to_uppercase();
    let (status, _) = call!(&app, delete(&format!("/api/products?id={}", shouted)));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn notice_file_type_is_limited_to_image_or_pdf() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let word = json!({
        "title": "Tender", "content": "See attached", "fileUrl": "/media/uploads/notices/x.docx", "fileType": "word"
    });
    let (status, body) = call!(&app, post("/api/notices", word));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid fileType"));

    let untyped = json!({"title": "Tender", "content": "See attached", "fileUrl": "/media/uploads/notices/x.pdf"});
    let (status, _) = call!(&app, post("/api/notices", untyped));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let pdf = json!({
        "title": "Tender", "content": "See attached", "fileUrl": "/media/uploads/notices/x.pdf", "fileType": "pdf"
    });
    let (status, body) = call!(&app, post("/api/notices", pdf));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"]["fileType"], "pdf");
}

#[actix_web::test]
async fn product_subcategory_must_fit_category() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let mut bran = layer_feed();
    bran["category"] = json!("bhus");
    let (status, body) = call!(&app, post("/api/products", bran));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Category 'bhus' does not have subcategories.");

    let (status, body) = call!(&app, post("/api/products", layer_feed()));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["inStock"], true);
}

#[actix_web::test]
async fn invalid_bodies_are_bad_requests() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::post()
        .uri("/api/factories")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json");
    let (status, body) = call!(&app, req);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request body is not valid JSON.");

    let (status, _) = call!(&app, post("/api/factories", json!([1, 2])));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut nameless = layer_feed();
    nameless["name"] = json!("   ");
    let (status, body) = call!(&app, post("/api/products", nameless));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "'name' cannot be empty.");

    let (status, _) = call!(&app, get("/api/activity-logs?limit=lots"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn activity_log_is_capped_and_newest_first() {
    let ctx = TestContext::with_activity_limit(3);
    let app = test::init_service(ctx.app()).await;

    for n in 1..=5 {
        let mut product = layer_feed();
        product["name"] = json!(format!("Feed {}", n));
        let (status, _) = call!(&app, post("/api/products", product));
        assert_eq!(status, StatusCode::OK);
        // Wait for this entry before the next write so the order is fixed.
        let newest = format!("Created product: Feed {}", n);
        for _ in 0..100 {
            let logs = activity_after!(&app, 1);
            if logs.first().map_or(false, |e| e["detail"] == newest.as_str()) {
                break;
            }
            actix_web::rt::time::sleep(Duration::from_millis(20)).await;
        }
    }

    let logs = activity_after!(&app, 3);
    let details: Vec<&str> = logs
        .iter()
        .map(|e| e["detail"].as_str().unwrap())
        .collect();
    assert_eq!(details, ["Created product: Feed 5", "Created product: Feed 4", "Created product: Feed 3"]);

    let (_, body) = call!(&app, get("/api/activity-logs?limit=1"));
    assert_eq!(body["activityLogs"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn public_routes_filter_for_visitors() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    for (title, active, popup) in [("Open", true, false), ("Hidden", false, true), ("Banner", true, true)] {
        let notice = json!({"title": title, "content": "c", "isActive": active, "showAsPopup": popup});
        let (status, _) = call!(&app, post("/api/notices", notice));
        assert_eq!(status, StatusCode::OK);
    }
    let mut sold_out = layer_feed();
    sold_out["inStock"] = json!(false);
    call!(&app, post("/api/products", sold_out));
    call!(&app, post("/api/products", layer_feed()));

    let titles = |body: &Value| -> Vec<String> {
        body["notices"].as_array().unwrap().iter().map(|n| n["title"].as_str().unwrap().to_string()).collect()
    };
    let (_, body) = call!(&app, get("/api/public/notices"));
    assert_eq!(titles(&body), ["Open", "Banner"]);
    let (_, body) = call!(&app, get("/api/public/notices/popup"));
    assert_eq!(titles(&body), ["Banner"]);

    let (_, body) = call!(&app, get("/api/public/products?inStock=true"));
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
    let (_, body) = call!(&app, get("/api/public/products"));
    assert_eq!(body["products"].as_array().unwrap().len(), 2);

    // The admin list is unfiltered.
    let (_, body) = call!(&app, get("/api/notices"));
    assert_eq!(body["notices"].as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn uploaded_document_file_is_removed_with_its_record() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let content = b"%PDF-1.4 annual report";
    let (status, receipt) = call!(&app, upload("documents", "annual-report.pdf", "application/pdf", content));
    assert_eq!(status, StatusCode::OK, "{receipt}");
    assert_eq!(receipt["fileType"], "pdf");
    assert_eq!(receipt["mimeType"], "application/pdf");
    assert_eq!(receipt["byteSize"], content.len());
    let storage_id = receipt["storageId"].as_str().unwrap().to_string();
    assert!(storage_id.starts_with("documents/"));
    let stored = ctx.media_path().join("uploads").join(&storage_id);
    assert!(stored.exists());

    let document = json!({
        "name": "Annual Report", "description": "FY 2080/81", "category": "report",
        "attachment": {
            "url": receipt["url"], "size": receipt["byteSize"], "originalName": receipt["originalName"],
            "mimeType": receipt["mimeType"], "storageId": storage_id
        }
    });
    let (status, body) = call!(&app, post("/api/documents", document));
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["document"]["fileType"], "pdf");
    let id = body["document"]["id"].as_str().unwrap().to_string();

    let (status, _) = call!(&app, delete(&format!("/api/documents?id={}", id)));
    assert_eq!(status, StatusCode::OK);
    assert!(!stored.exists());
}

fn brochure(file_type: &str) -> Value {
    json!({
        "name": "Brochure", "description": "Product range", "category": "brochure",
        "fileType": file_type, "uploadedAt": "2024-01-15T10:00:00Z",
        "attachment": {
            "url": "/media/uploads/documents/b.pdf", "size": 512, "originalName": "brochure.pdf",
            "mimeType": "application/pdf"
        }
    })
}

#[actix_web::test]
async fn document_file_type_follows_the_attachment() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let (status, body) = call!(&app, post("/api/documents", brochure("image")));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("does not match"), "{body}");

    let (status, body) = call!(&app, post("/api/documents", brochure("pdf")));
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["document"]["fileType"], "pdf");
}

#[actix_web::test]
async fn document_update_keeps_upload_time_when_omitted() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let (_, body) = call!(&app, post("/api/documents", brochure("pdf")));
    let created = body["document"].clone();
    let uploaded_at = created["uploadedAt"].clone();
    assert!(uploaded_at.as_str().unwrap().starts_with("2024-01-15T10:00:00"));

    let mut edited = created.clone();
    edited["description"] = json!("Full product range");
    edited.as_object_mut().unwrap().remove("uploadedAt");
    let (status, body) = call!(&app, put("/api/documents", edited));
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["document"]["description"], "Full product range");
    assert_eq!(body["document"]["uploadedAt"], uploaded_at);

    let mut nulled = body["document"].clone();
    nulled["uploadedAt"] = Value::Null;
    let (status, body) = call!(&app, put("/api/documents", nulled));
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["document"]["uploadedAt"], uploaded_at);
}

#[actix_web::test]
async fn disallowed_uploads_are_rejected() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let (status, body) = call!(&app, upload("documents", "setup.exe", "application/octet-stream", b"MZ"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Unsupported file type"));

    let (status, _) = call!(&app, upload("posts", "photo.png", "image/png", b"\x89PNG"));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call!(&app, upload("notices", "minutes.docx", "application/msword", b"PK"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
