use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::test_support::{self, TestContext};

async fn send(
    ctx: &TestContext,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

#[tokio::test]
async fn payment_opens_the_category_until_it_expires() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "admin").await;
    let student = test_support::insert_student(ctx.state.db(), "buyer").await;
    let category = test_support::insert_category(ctx.state.db(), "Async Rust", false, false).await;
    let video = test_support::insert_video(ctx.state.db(), &category.id, None, 1).await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let video_uri = format!("/api/v1/videos/{}", video.id);

    let (status, _) = send(&ctx, Method::GET, &video_uri, &student_token, None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (status, body) = send(
        &ctx,
        Method::POST,
        "/api/v1/entitlements/payments",
        &admin_token,
        Some(json!({
            "user_id": student.id,
            "category_id": category.id,
            "amount_cents": 4900,
            "expires_at": "2099-01-01T00:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["grant"]["kind"], "payment");
    assert_eq!(body["is_effective"], true);

    let (status, body) = send(&ctx, Method::GET, &video_uri, &student_token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let (status, body) =
        send(&ctx, Method::GET, "/api/v1/entitlements/me", &student_token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn expired_payment_is_reported_as_expired() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "admin").await;
    let student = test_support::insert_student(ctx.state.db(), "lapsed").await;
    let category = test_support::insert_category(ctx.state.db(), "Embedded", false, false).await;
    let video = test_support::insert_video(ctx.state.db(), &category.id, None, 1).await;
    test_support::pay_for(
        ctx.state.db(),
        &student.id,
        &category.id,
        None,
        primitive_now_utc() - Duration::days(1),
        &admin.id,
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let (status, body) =
        send(&ctx, Method::GET, &format!("/api/v1/videos/{}", video.id), &token, None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED, "response: {body}");
    assert_eq!(body["detail"], "Access to this course has expired");

    let (_, body) = send(
        &ctx,
        Method::GET,
        &format!("/api/v1/catalog/categories/{}", category.id),
        &token,
        None,
    )
    .await;
    assert_eq!(body["access"], "expired");
}

#[tokio::test]
async fn gifts_are_idempotent() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "admin").await;
    let student = test_support::insert_student(ctx.state.db(), "lucky").await;
    let category = test_support::insert_category(ctx.state.db(), "Macros", false, false).await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let payload = json!({ "user_id": student.id, "category_id": category.id });

    let (status, first) =
        send(&ctx, Method::POST, "/api/v1/entitlements/gifts", &token, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "response: {first}");
    assert_eq!(first["created"], true);

    let (status, second) =
        send(&ctx, Method::POST, "/api/v1/entitlements/gifts", &token, Some(payload)).await;
    assert_eq!(status, StatusCode::OK, "response: {second}");
    assert_eq!(second["created"], false);
    assert_eq!(first["id"], second["id"]);

    let (_, body) = send(
        &ctx,
        Method::GET,
        &format!("/api/v1/entitlements/users/{}", student.id),
        &token,
        None,
    )
    .await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn module_grants_need_a_modular_category() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "admin").await;
    let student = test_support::insert_student(ctx.state.db(), "learner").await;
    let category = test_support::insert_category(ctx.state.db(), "Flat", false, false).await;
    let module = test_support::insert_module(ctx.state.db(), &category.id, "Part 1", 1).await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let (status, body) = send(
        &ctx,
        Method::POST,
        "/api/v1/entitlements/gifts",
        &token,
        Some(json!({
            "user_id": student.id,
            "category_id": category.id,
            "module_id": module.id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "response: {body}");
    assert_eq!(body["code"], "invalid_payload");
}

#[tokio::test]
async fn module_entitlement_covers_only_its_module() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "admin").await;
    let student = test_support::insert_student(ctx.state.db(), "partial").await;
    let category = test_support::insert_category(ctx.state.db(), "Systems", false, true).await;
    let first = test_support::insert_module(ctx.state.db(), &category.id, "Memory", 1).await;
    let second = test_support::insert_module(ctx.state.db(), &category.id, "Threads", 2).await;
    let v1 = test_support::insert_video(ctx.state.db(), &category.id, Some(&first.id), 1).await;
    let v2 = test_support::insert_video(ctx.state.db(), &category.id, Some(&second.id), 1).await;
    test_support::pay_for(
        ctx.state.db(),
        &student.id,
        &category.id,
        Some(&first.id),
        primitive_now_utc() + Duration::days(30),
        &admin.id,
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let (status, _) =
        send(&ctx, Method::GET, &format!("/api/v1/videos/{}", v1.id), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) =
        send(&ctx, Method::GET, &format!("/api/v1/videos/{}", v2.id), &token, None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn learners_cannot_record_payments() {
    let ctx = test_support::setup_test_context().await;
    let student = test_support::insert_student(ctx.state.db(), "sneaky").await;
    let category = test_support::insert_category(ctx.state.db(), "Free?", false, false).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/v1/entitlements/payments",
        &token,
        Some(json!({
            "user_id": student.id,
            "category_id": category.id,
            "amount_cents": 0,
            "expires_at": "2099-01-01T00:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
