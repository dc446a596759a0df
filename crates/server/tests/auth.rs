mod common;

use axum::http::StatusCode;
use serde_json::json;

use cleanops_api::{ApprovalStatus, SubscriptionPlan, UserRole};
use common::{PASSWORD, TestApp};

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let reply = app.get("/api/health", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
}

#[tokio::test]
async fn owner_signup_creates_pending_owner_on_trial() {
    let app = TestApp::new();
    let reply = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "email": "Owner@Example.com",
                "password": PASSWORD,
                "name": "Kim",
                "company_name": "Sparkle Co",
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["role"], "business_owner");
    assert_eq!(reply.body["home_path"], "/business/dashboard");

    let token = reply.body["access_token"].as_str().unwrap();
    let me = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["email"], "owner@example.com");
    assert_eq!(me.body["data"]["approval_status"], "pending");

    // Pending owners cannot use business endpoints yet.
    let stores = app.get("/api/business/stores", Some(token)).await;
    assert_eq!(stores.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    app.seed_user("dup@example.com", UserRole::Staff, &company, ApprovalStatus::Approved);

    let reply = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "email": "dup@example.com",
                "password": PASSWORD,
                "name": "Dup",
                "company_name": "Other",
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    app.seed_user("staff@example.com", UserRole::Staff, &company, ApprovalStatus::Approved);

    let reply = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "staff@example.com", "password": "nope-nope" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["statusCode"], 401);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::new();
    let reply = app.get("/api/auth/me", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.get("/api/auth/me", Some("not-a-jwt")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_rotates_once() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    app.seed_user("staff@example.com", UserRole::Staff, &company, ApprovalStatus::Approved);

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "staff@example.com", "password": PASSWORD }),
        )
        .await;
    let refresh = login.body["refresh_token"].as_str().unwrap().to_string();

    let first = app
        .post("/api/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_ne!(first.body["refresh_token"], json!(refresh));

    let replay = app
        .post("/api/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn join_with_signup_code_follows_company_settings() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let (_, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;

    let reply = app
        .put(
            "/api/business/company",
            Some(&owner),
            json!({ "signup_code": " acme-2024 ", "signup_code_active": true, "requires_approval": true }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["signup_code"], "ACME-2024");

    let valid = app.get("/api/auth/validate-code?code=acme-2024", None).await;
    assert_eq!(valid.body["valid"], true);
    assert_eq!(valid.body["company_name"], "Acme");

    let invalid = app.get("/api/auth/validate-code?code=nope", None).await;
    assert_eq!(invalid.status, StatusCode::OK);
    assert_eq!(invalid.body["valid"], false);

    let joined = app
        .post(
            "/api/auth/join",
            None,
            json!({
                "email": "new@example.com",
                "password": PASSWORD,
                "name": "New Hire",
                "signup_code": "ACME-2024",
            }),
        )
        .await;
    assert_eq!(joined.status, StatusCode::CREATED, "{}", joined.body);
    assert_eq!(joined.body["role"], "staff");

    let pending = app.get("/api/business/users/pending", Some(&owner)).await;
    assert_eq!(pending.status, StatusCode::OK);
    assert_eq!(pending.body["data"].as_array().unwrap().len(), 1);

    let bad_code = app
        .post(
            "/api/auth/join",
            None,
            json!({
                "email": "other@example.com",
                "password": PASSWORD,
                "name": "Other",
                "signup_code": "WRONG",
            }),
        )
        .await;
    assert_eq!(bad_code.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn section_gate_redirects_by_role() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let (_, staff) = app
        .user_with_token("staff@example.com", UserRole::Staff, &company)
        .await;

    let anonymous = app.get("/api/sections/business", None).await;
    assert_eq!(anonymous.body["allowed"], false);
    assert_eq!(anonymous.body["redirect_to"], "/login");

    let wrong_role = app.get("/api/sections/business", Some(&staff)).await;
    assert_eq!(wrong_role.body["allowed"], false);
    assert_eq!(wrong_role.body["redirect_to"], "/");

    let own = app.get("/api/sections/staff", Some(&staff)).await;
    assert_eq!(own.body["allowed"], true);

    let unknown = app.get("/api/sections/kitchen", Some(&staff)).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let home = app.get("/api/home", Some(&staff)).await;
    assert_eq!(home.body["home_path"], "/mobile-dashboard");
}

#[tokio::test]
async fn change_password_revokes_refresh_tokens() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    app.seed_user("staff@example.com", UserRole::Staff, &company, ApprovalStatus::Approved);
    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "staff@example.com", "password": PASSWORD }),
        )
        .await;
    let access = login.body["access_token"].as_str().unwrap();
    let refresh = login.body["refresh_token"].as_str().unwrap();

    let wrong = app
        .put(
            "/api/auth/password",
            Some(access),
            json!({ "current_password": "wrong-one", "new_password": "brandnew1" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let changed = app
        .put(
            "/api/auth/password",
            Some(access),
            json!({ "current_password": PASSWORD, "new_password": "brandnew1" }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);

    let stale = app
        .post("/api/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn manifest_is_served_outside_api() {
    let app = TestApp::new();
    let reply = app.get("/manifest.json", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["display"], "standalone");
}

async fn set_code(app: &TestApp, token: &str, code: &str, active: bool) -> StatusCode {
    app.put(
        "/api/business/company",
        Some(token),
        json!({ "signup_code": code, "signup_code_active": active }),
    )
    .await
    .status
}

#[tokio::test]
async fn signup_codes_are_unique_across_companies() {
    let app = TestApp::new();
    let first = app.seed_company("First", SubscriptionPlan::Basic);
    let second = app.seed_company("Second", SubscriptionPlan::Basic);
    let (_, first_owner) = app
        .user_with_token("one@example.com", UserRole::BusinessOwner, &first)
        .await;
    let (_, second_owner) = app
        .user_with_token("two@example.com", UserRole::BusinessOwner, &second)
        .await;

    // An inactive code still reserves the value.
    assert_eq!(set_code(&app, &second_owner, "ACME", false).await, StatusCode::OK);
    assert_eq!(set_code(&app, &first_owner, "acme", true).await, StatusCode::CONFLICT);

    assert_eq!(set_code(&app, &first_owner, "FIRST", true).await, StatusCode::OK);
    assert_eq!(set_code(&app, &second_owner, "ACME", true).await, StatusCode::OK);
    assert_eq!(set_code(&app, &second_owner, "first", false).await, StatusCode::CONFLICT);

    let valid = app.get("/api/auth/validate-code?code=acme", None).await;
    assert_eq!(valid.body["company_name"], "Second");

    // Clearing a code frees it for others.
    assert_eq!(set_code(&app, &first_owner, " ", false).await, StatusCode::OK);
    assert_eq!(set_code(&app, &second_owner, "first", true).await, StatusCode::OK);
}
