use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{any, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::SessionManager;
use doctor_cell::router::doctor_routes;
use hybrid_api_cell::HybridApiService;
use shared_database::session_store::{MemorySessionStore, SessionStore, TOKEN_KEY, USER_KEY};
use shared_utils::test_utils::{MockDjangoResponses, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    supabase: MockServer,
    django: MockServer,
    app: Router,
}

async fn create_test_app(signed_in_as: Option<TestUser>) -> TestApp {
    let supabase = MockServer::start().await;
    let django = MockServer::start().await;
    let store = Arc::new(MemorySessionStore::new());

    if let Some(user) = signed_in_as {
        store.set_item(TOKEN_KEY, "t2").await.unwrap();
        store.set_item(USER_KEY, &serde_json::to_string(&user.to_user()).unwrap()).await.unwrap();
    }

    let config = TestConfig::with_backends(&supabase.uri(), &django.uri()).to_app_config();
    let api = Arc::new(HybridApiService::new(&config, store.clone()));
    let sessions = Arc::new(SessionManager::new(api, store));
    sessions.bootstrap().await;

    TestApp {
        supabase,
        django,
        app: doctor_routes(sessions),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    json_request("POST", uri, body)
}

fn json_request(http_method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(http_method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_search_doctors_is_public() {
    let test_app = create_test_app(None).await;
    let doctor = TestUser::doctor("heart@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialization", "eq.Cardiology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row("d1", &doctor, "Cardiology")
        ])))
        .mount(&test_app.supabase)
        .await;

    let response = test_app.app.oneshot(get("/?specialization=Cardiology")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json_response = body_json(response).await;
    assert_eq!(json_response["total"], 1);
    assert_eq!(json_response["via"], "supabase");
    assert_eq!(json_response["doctors"][0]["user"]["email"], "heart@example.com");
}

#[tokio::test]
async fn test_get_doctor_falls_back_to_django() {
    let test_app = create_test_app(None).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&test_app.supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/doctors/4/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockDjangoResponses::doctor(4, 40, "Cardiology")))
        .expect(1)
        .mount(&test_app.django)
        .await;

    let response = test_app.app.oneshot(get("/4")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json_response = body_json(response).await;
    assert_eq!(json_response["via"], "django");
    assert_eq!(json_response["doctor"]["id"], "4");
}

#[tokio::test]
async fn test_get_doctor_not_found_on_either_backend() {
    let test_app = create_test_app(None).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&test_app.supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/doctors/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&test_app.django)
        .await;

    let response = test_app.app.oneshot(get("/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_availability_requires_date() {
    let test_app = create_test_app(None).await;

    let response = test_app.app.oneshot(get("/d1/availability")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_availability_from_django() {
    let test_app = create_test_app(None).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/time_slots"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&test_app.supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/doctors/d1/availability/"))
        .and(query_param("date", "2024-12-23"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "date": "2024-12-23",
            "doctor": "Dr. Django User",
            "available_slots": [
                { "time": "09:00", "available": true },
                { "time": "09:30", "available": false }
            ]
        })))
        .mount(&test_app.django)
        .await;

    let response = test_app.app.oneshot(get("/d1/availability?date=2024-12-23")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json_response = body_json(response).await;
    assert_eq!(json_response["total_slots"], 2);
    assert_eq!(json_response["available_slots"][1]["available"], false);
}

#[tokio::test]
async fn test_create_time_slot_requires_session() {
    let test_app = create_test_app(None).await;

    let request = post_json("/time-slots", json!({
        "doctor_id": "d1",
        "day_of_week": 1,
        "start_time": "09:00",
        "end_time": "12:00"
    }));
    let response = test_app.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_time_slot_rejects_invalid_day_before_backends() {
    let test_app = create_test_app(Some(TestUser::doctor("doc@example.com"))).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&test_app.supabase)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&test_app.django)
        .await;

    let request = post_json("/time-slots", json!({
        "doctor_id": "d1",
        "day_of_week": 9,
        "start_time": "09:00",
        "end_time": "12:00"
    }));
    let response = test_app.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_time_slot_as_doctor() {
    let test_app = create_test_app(Some(TestUser::doctor("doc@example.com"))).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/time_slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::time_slot_row("s1", "d1", 1, "09:00:00", "12:00:00")
        ])))
        .expect(1)
        .mount(&test_app.supabase)
        .await;

    let request = post_json("/time-slots", json!({
        "doctor_id": "d1",
        "day_of_week": 1,
        "start_time": "09:00",
        "end_time": "12:00"
    }));
    let response = test_app.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json_response = body_json(response).await;
    assert_eq!(json_response["time_slot"]["id"], "s1");
    assert_eq!(json_response["time_slot"]["is_available"], true);
}

#[tokio::test]
async fn test_patients_cannot_create_time_slots() {
    let test_app = create_test_app(Some(TestUser::patient("p@example.com"))).await;

    let request = post_json("/time-slots", json!({
        "doctor_id": "d1",
        "day_of_week": 1,
        "start_time": "09:00",
        "end_time": "12:00"
    }));
    let response = test_app.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_time_slot_falls_back_to_django() {
    let test_app = create_test_app(Some(TestUser::doctor("doc@example.com"))).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/time_slots"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&test_app.supabase)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/time-slots/9/"))
        .and(body_partial_json(json!({ "is_available": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 9,
            "day_of_week": 1,
            "start_time": "09:00:00",
            "end_time": "12:00:00",
            "is_available": false
        })))
        .expect(1)
        .mount(&test_app.django)
        .await;

    let request = json_request("PATCH", "/4/time-slots/9", json!({ "is_available": false }));
    let response = test_app.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json_response = body_json(response).await;
    assert_eq!(json_response["via"], "django");
    assert_eq!(json_response["time_slot"]["doctor_id"], "4");
    assert_eq!(json_response["time_slot"]["is_available"], false);
}

#[tokio::test]
async fn test_update_time_slot_without_fields_is_rejected() {
    let test_app = create_test_app(Some(TestUser::doctor("doc@example.com"))).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&test_app.supabase)
        .await;

    let response = test_app.app
        .oneshot(json_request("PATCH", "/d1/time-slots/s1", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
