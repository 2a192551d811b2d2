//! API Integration Tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use grocademy::api::routes::{CompleteModuleRequest, CreateUserRequest, IncrementBalanceRequest};

mod common;

const BOUNDARY: &str = "grocademy-test-boundary";

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, user: Option<Uuid>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("X-API-Key", common::API_KEY);
    if let Some(user_id) = user {
        builder = builder.header("X-Request-User-Id", user_id.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, user: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header("X-API-Key", common::API_KEY);
    if let Some(user_id) = user {
        builder = builder.header("X-Request-User-Id", user_id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn multipart_request(
    method: &str,
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("X-API-Key", common::API_KEY)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let pool = common::setup_test_db().await;
    let app = common::app(&pool);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_key_is_required() {
    let pool = common::setup_test_db().await;
    let app = common::app(&pool);

    let request = Request::builder()
        .uri("/api/courses")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "missing_header");

    let request = Request::builder()
        .uri("/api/courses")
        .header("X-API-Key", "wrong")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_admin_routes_need_admin_permission() {
    let pool = common::setup_test_db().await;
    let app = common::app(&pool);

    let request = Request::builder()
        .uri("/api/users")
        .header("X-API-Key", common::READ_ONLY_API_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "forbidden");
}

#[tokio::test]
async fn test_purchase_and_progress_e2e() {
    let pool = common::setup_test_db().await;
    let app = common::app(&pool);
    let name = common::unique("e2e_");

    // 1. Create a user
    let request = json_request(
        "POST",
        "/api/users",
        None,
        serde_json::to_value(CreateUserRequest {
            username: name.clone(),
            email: format!("{name}@example.com"),
            first_name: "E2E".to_string(),
            last_name: "User".to_string(),
        })
        .unwrap(),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED, "user creation failed: {body}");
    let user_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    // 2. Fund the user
    let request = json_request(
        "POST",
        &format!("/api/users/{user_id}/balance"),
        None,
        serde_json::to_value(IncrementBalanceRequest { increment: dec!(100) }).unwrap(),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "funding failed: {body}");
    assert_eq!(body["data"]["balance"], "100.00");

    // 3. Create a course through the multipart form
    let title = common::unique("E2E Course ");
    let request = multipart_request(
        "POST",
        "/api/courses",
        &[
            ("title", title.as_str()),
            ("description", "End to end"),
            ("instructor", "Ferris"),
            ("topics", "rust,testing"),
            ("price", "40"),
        ],
        Some(("thumbnail_image", "cover.png", &b"\x89PNG"[..])),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED, "course creation failed: {body}");
    let course_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();
    assert_eq!(body["data"]["topics"], json!(["rust", "testing"]));
    assert!(body["data"]["thumbnail_path"].is_string());

    // 4. Add two modules
    let mut module_ids = Vec::new();
    for order in ["1", "2"] {
        let module_title = format!("Part {order}");
        let request = multipart_request(
            "POST",
            &format!("/api/courses/{course_id}/modules"),
            &[
                ("title", module_title.as_str()),
                ("description", "Module body"),
                ("order", order),
            ],
            None,
        );
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED, "module creation failed: {body}");
        module_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    // 5. Buy without the user header
    let request = json_request("POST", &format!("/api/courses/{course_id}/buy"), None, json!({}));
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 6. Buy the course
    let request = json_request(
        "POST",
        &format!("/api/courses/{course_id}/buy"),
        Some(user_id),
        json!({}),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "purchase failed: {body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["balance"], "60.00");
    assert!(body["data"]["transaction_id"].is_string());

    // 7. Buying again conflicts
    let request = json_request(
        "POST",
        &format!("/api/courses/{course_id}/buy"),
        Some(user_id),
        json!({}),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "already_enrolled");
    assert_eq!(body["data"]["balance"], "60.00");

    // 8. Complete the first module
    let request = json_request(
        "PATCH",
        &format!("/api/modules/{}/complete", module_ids[0]),
        Some(user_id),
        serde_json::to_value(CompleteModuleRequest { is_completed: true }).unwrap(),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "completion failed: {body}");
    assert_eq!(body["data"]["is_completed"], true);
    assert_eq!(body["data"]["course_progress"]["total_modules"], 2);
    assert_eq!(body["data"]["course_progress"]["completed_modules"], 1);
    assert_eq!(body["data"]["course_progress"]["percentage"], 50.0);

    // 9. Module listing carries the flags
    let (status, body) = send(
        &app,
        get(&format!("/api/courses/{course_id}/modules"), Some(user_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["is_completed"], true);
    assert_eq!(body["data"][1]["is_completed"], false);
    assert_eq!(body["pagination"]["total_items"], 2);

    // 10. My courses shows the progress
    let (status, body) = send(&app, get("/api/courses/my-courses", Some(user_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], course_id.to_string());
    assert_eq!(body["data"][0]["progress_percentage"], 50.0);
}

#[tokio::test]
async fn test_insufficient_balance_reports_balance() {
    let pool = common::setup_test_db().await;
    let app = common::app(&pool);
    let user = common::create_user(&pool, dec!(30)).await;
    let course = common::create_course(&pool, &common::unique("Costly "), dec!(50)).await;

    let request = json_request(
        "POST",
        &format!("/api/courses/{}/buy", course.id),
        Some(user.id),
        json!({}),
    );
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error_code"], "insufficient_balance");
    assert_eq!(body["data"]["balance"], "30.00");
}

#[tokio::test]
async fn test_pagination_params_are_validated() {
    let pool = common::setup_test_db().await;
    let app = common::app(&pool);

    let (status, body) = send(&app, get("/api/courses?limit=0", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_pagination");

    let (status, _) = send(&app, get("/api/courses?page=abc", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get("/api/courses?page=0&limit=5", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["current_page"], 1);
}

#[tokio::test]
async fn test_reorder_endpoint_rejects_foreign_module() {
    let pool = common::setup_test_db().await;
    let app = common::app(&pool);
    let course = common::create_course(&pool, &common::unique("Own "), dec!(0)).await;
    let other = common::create_course(&pool, &common::unique("Other "), dec!(0)).await;
    let mine = common::create_modules(&pool, course.id, 1).await;
    let theirs = common::create_modules(&pool, other.id, 1).await;

    let request = json_request(
        "PATCH",
        &format!("/api/courses/{}/modules/reorder", course.id),
        None,
        json!({ "module_order": [
            { "id": mine[0].id, "order": 5 },
            { "id": theirs[0].id, "order": 6 }
        ]}),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_input");

    let request = json_request(
        "PATCH",
        &format!("/api/courses/{}/modules/reorder", course.id),
        None,
        json!({ "module_order": [{ "id": mine[0].id, "order": 5 }] }),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "reorder failed: {body}");
}

#[tokio::test]
async fn test_unknown_ids_are_404() {
    let pool = common::setup_test_db().await;
    let app = common::app(&pool);
    let user = common::create_user(&pool, dec!(0)).await;
    let missing = Uuid::new_v4();

    let (status, body) = send(&app, get(&format!("/api/courses/{missing}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "course_not_found");

    let request = json_request(
        "PATCH",
        &format!("/api/modules/{missing}/complete"),
        Some(user.id),
        json!({ "is_completed": true }),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "module_not_found");
}
