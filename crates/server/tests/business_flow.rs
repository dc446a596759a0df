mod common;

use axum::http::StatusCode;
use serde_json::json;

use cleanops_api::{ApprovalStatus, SubscriptionPlan, UserRole};
use common::TestApp;

#[tokio::test]
async fn owner_approves_pending_staff_with_role_and_stores() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let (_, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;
    let pending = app.seed_user("new@example.com", UserRole::Staff, &company, ApprovalStatus::Pending);
    let store_id = app.store_with_staff(&owner, "Gangnam", &[]).await;

    let bad_role = app
        .patch(
            &format!("/api/business/users/{pending}/approve"),
            Some(&owner),
            json!({ "role": "platform_admin" }),
        )
        .await;
    assert_eq!(bad_role.status, StatusCode::BAD_REQUEST);

    let approved = app
        .patch(
            &format!("/api/business/users/{pending}/approve"),
            Some(&owner),
            json!({ "role": "subcontract_individual", "store_ids": [store_id, store_id] }),
        )
        .await;
    assert_eq!(approved.status, StatusCode::OK, "{}", approved.body);
    assert_eq!(approved.body["data"]["approval_status"], "approved");
    assert_eq!(approved.body["data"]["role"], "subcontract_individual");
    assert_eq!(approved.body["data"]["employment_active"], true);

    let again = app
        .patch(
            &format!("/api/business/users/{pending}/approve"),
            Some(&owner),
            json!({}),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let worker = app.login("new@example.com").await;
    let stores = app.get("/api/staff/assigned-stores", Some(&worker)).await;
    assert_eq!(stores.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_user_keeps_reason_and_loses_access() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let (_, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;
    let pending = app.seed_user("new@example.com", UserRole::Staff, &company, ApprovalStatus::Pending);

    let rejected = app
        .patch(
            &format!("/api/business/users/{pending}/reject"),
            Some(&owner),
            json!({ "rejection_reason": "unknown applicant" }),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::OK, "{}", rejected.body);
    assert_eq!(rejected.body["data"]["approval_status"], "rejected");
    assert_eq!(rejected.body["data"]["rejection_reason"], "unknown applicant");

    let token = app.login("new@example.com").await;
    let denied = app.get("/api/staff/announcements", Some(&token)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn other_companies_users_are_off_limits() {
    let app = TestApp::new();
    let acme = app.seed_company("Acme", SubscriptionPlan::Basic);
    let rival = app.seed_company("Rival", SubscriptionPlan::Basic);
    let (_, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &acme)
        .await;
    let outsider = app.seed_user("out@example.com", UserRole::Staff, &rival, ApprovalStatus::Pending);

    let reply = app
        .patch(
            &format!("/api/business/users/{outsider}/approve"),
            Some(&owner),
            json!({}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let missing = app
        .patch(
            "/api/business/users/00000000-0000-4000-8000-000000000000/approve",
            Some(&owner),
            json!({}),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let assign = app
        .post(
            "/api/business/stores",
            Some(&owner),
            json!({ "name": "Gangnam" }),
        )
        .await;
    let store_id = assign.body["data"]["id"].as_str().unwrap();
    let cross = app
        .put(
            &format!("/api/business/stores/{store_id}/users"),
            Some(&owner),
            json!({ "user_ids": [outsider] }),
        )
        .await;
    assert_eq!(cross.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn role_changes_exclude_self_and_admin_roles() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let (owner_id, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;
    let staff = app.seed_user("staff@example.com", UserRole::Staff, &company, ApprovalStatus::Approved);

    let own = app
        .patch(
            &format!("/api/business/users/{owner_id}/role"),
            Some(&owner),
            json!({ "role": "staff" }),
        )
        .await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);

    let escalate = app
        .patch(
            &format!("/api/business/users/{staff}/role"),
            Some(&owner),
            json!({ "role": "platform_admin" }),
        )
        .await;
    assert_eq!(escalate.status, StatusCode::BAD_REQUEST);

    let promote = app
        .patch(
            &format!("/api/business/users/{staff}/role"),
            Some(&owner),
            json!({ "role": "store_manager" }),
        )
        .await;
    assert_eq!(promote.status, StatusCode::OK, "{}", promote.body);
    assert_eq!(promote.body["data"]["role"], "store_manager");
}

#[tokio::test]
async fn resident_number_is_sealed_and_returned_masked() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let (_, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;
    let staff = app.seed_user("staff@example.com", UserRole::Staff, &company, ApprovalStatus::Approved);
    let uri = format!("/api/business/users/{staff}/sensitive");

    let empty = app.get(&uri, Some(&owner)).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert!(empty.body["data"]["resident_number_masked"].is_null());

    let invalid = app
        .put(&uri, Some(&owner), json!({ "resident_number": "12345" }))
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let stored = app
        .put(&uri, Some(&owner), json!({ "resident_number": "900101-1234567" }))
        .await;
    assert_eq!(stored.status, StatusCode::OK, "{}", stored.body);
    assert_eq!(stored.body["data"]["resident_number_masked"], "900101-1******");

    let read = app.get(&uri, Some(&owner)).await;
    assert_eq!(read.body["data"]["resident_number_masked"], "900101-1******");

    // The plain number never reaches the database.
    let conn = app.db.conn();
    let sealed: String = conn
        .query_row(
            "SELECT resident_number_sealed FROM user_sensitive WHERE user_id = ?1",
            [&staff],
            |row| row.get(0),
        )
        .unwrap();
    assert!(!sealed.contains("1234567"));
}

#[tokio::test]
async fn announcements_track_reads_per_staff() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let (_, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;
    let (_, staff) = app
        .user_with_token("staff@example.com", UserRole::Staff, &company)
        .await;
    app.seed_user("other@example.com", UserRole::Staff, &company, ApprovalStatus::Approved);

    let blank = app
        .post(
            "/api/business/announcements",
            Some(&owner),
            json!({ "title": " ", "content": "x" }),
        )
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let created = app
        .post(
            "/api/business/announcements",
            Some(&owner),
            json!({ "title": "Holiday", "content": "Closed on Monday", "audience": "staff" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let id = created.body["data"]["id"].as_str().unwrap().to_string();

    let unread = app.get("/api/staff/announcements", Some(&staff)).await;
    assert_eq!(unread.body["data"][0]["is_read"], false);

    for _ in 0..2 {
        let read = app
            .post(
                "/api/staff/announcements/read",
                Some(&staff),
                json!({ "announcement_id": id }),
            )
            .await;
        assert_eq!(read.status, StatusCode::OK);
    }

    let seen = app.get("/api/staff/announcements", Some(&staff)).await;
    assert_eq!(seen.body["data"][0]["is_read"], true);
    assert!(seen.body["data"][0]["read_at"].is_string());

    let stats = app.get("/api/business/announcements", Some(&owner)).await;
    assert_eq!(stats.body["data"][0]["read_count"], 1);
    assert_eq!(stats.body["data"][0]["total_users"], 2);

    let missing = app
        .post(
            "/api/staff/announcements/read",
            Some(&staff),
            json!({ "announcement_id": "00000000-0000-4000-8000-000000000000" }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let deleted = app
        .delete(&format!("/api/business/announcements/{id}"), Some(&owner))
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
}

#[tokio::test]
async fn platform_admin_manages_companies_and_owner_approval() {
    let app = TestApp::new();
    let home = app.seed_company("Platform", SubscriptionPlan::Premium);
    let (_, admin) = app
        .user_with_token("root@example.com", UserRole::PlatformAdmin, &home)
        .await;

    let signup = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "email": "owner@example.com",
                "password": common::PASSWORD,
                "name": "Owner",
                "company_name": "Fresh Start",
            }),
        )
        .await;
    let owner_id = signup.body["user_id"].as_str().unwrap().to_string();

    let pending = app.get("/api/platform/users/pending-owner", Some(&admin)).await;
    assert_eq!(pending.body["data"].as_array().unwrap().len(), 1);

    let approved = app
        .patch(
            &format!("/api/platform/users/{owner_id}/approve-owner"),
            Some(&admin),
            json!({}),
        )
        .await;
    assert_eq!(approved.status, StatusCode::OK, "{}", approved.body);
    assert_eq!(approved.body["data"]["approval_status"], "approved");

    let created = app
        .post(
            "/api/platform/companies",
            Some(&admin),
            json!({ "name": "Manual Co", "subscription_plan": "basic", "basic_units": -4 }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["data"]["basic_units"], 0);
    let company_id = created.body["data"]["id"].as_str().unwrap().to_string();

    let duplicate = app
        .post(
            "/api/platform/companies",
            Some(&admin),
            json!({ "id": company_id, "name": "Again" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let listed = app.get("/api/platform/companies", Some(&admin)).await;
    assert_eq!(listed.body["data"].as_array().unwrap().len(), 3);

    let removed = app
        .delete(&format!("/api/platform/companies/{company_id}"), Some(&admin))
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    let gone = app
        .get(&format!("/api/platform/companies/{company_id}"), Some(&admin))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let owner = app.login("owner@example.com").await;
    let forbidden = app.get("/api/platform/companies", Some(&owner)).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn suspended_company_loses_business_features() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let home = app.seed_company("Platform", SubscriptionPlan::Premium);
    let (_, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;
    let (_, admin) = app
        .user_with_token("root@example.com", UserRole::PlatformAdmin, &home)
        .await;

    let ok = app.get("/api/business/stores", Some(&owner)).await;
    assert_eq!(ok.status, StatusCode::OK);

    let suspended = app
        .put(
            &format!("/api/platform/companies/{company}"),
            Some(&admin),
            json!({ "subscription_status": "suspended" }),
        )
        .await;
    assert_eq!(suspended.status, StatusCode::OK, "{}", suspended.body);

    let gated = app.get("/api/business/stores", Some(&owner)).await;
    assert_eq!(gated.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn landing_pages_publish_by_slug() {
    let app = TestApp::new();
    let home = app.seed_company("Platform", SubscriptionPlan::Premium);
    let (_, admin) = app
        .user_with_token("admin@example.com", UserRole::Admin, &home)
        .await;

    let bad_slug = app
        .post(
            "/api/admin/pages",
            Some(&admin),
            json!({ "slug": "About Us", "title": "About" }),
        )
        .await;
    assert_eq!(bad_slug.status, StatusCode::BAD_REQUEST);

    let page = app
        .post(
            "/api/admin/pages",
            Some(&admin),
            json!({ "slug": "about", "title": "About", "content": "Hello" }),
        )
        .await;
    assert_eq!(page.status, StatusCode::CREATED, "{}", page.body);
    let page_id = page.body["data"]["id"].as_str().unwrap().to_string();

    let taken = app
        .post(
            "/api/admin/pages",
            Some(&admin),
            json!({ "slug": "about", "title": "Copy" }),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let draft = app.get("/api/pages/about", None).await;
    assert_eq!(draft.status, StatusCode::NOT_FOUND);

    let published = app
        .put(
            &format!("/api/admin/pages/{page_id}"),
            Some(&admin),
            json!({ "is_published": true }),
        )
        .await;
    assert_eq!(published.status, StatusCode::OK);

    let public = app.get("/api/pages/about", None).await;
    assert_eq!(public.status, StatusCode::OK);
    assert_eq!(public.body["data"]["title"], "About");

    let removed = app
        .delete(&format!("/api/admin/pages/{page_id}"), Some(&admin))
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    let twice = app
        .delete(&format!("/api/admin/pages/{page_id}"), Some(&admin))
        .await;
    assert_eq!(twice.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn case_studies_hide_inactive_entries() {
    let app = TestApp::new();
    let home = app.seed_company("Platform", SubscriptionPlan::Premium);
    let (_, admin) = app
        .user_with_token("admin@example.com", UserRole::Admin, &home)
        .await;

    let missing_url = app
        .post("/api/admin/case-studies", Some(&admin), json!({ "title": "Mall" }))
        .await;
    assert_eq!(missing_url.status, StatusCode::BAD_REQUEST);

    for (title, order, active) in [("Mall", 2, true), ("Office", 1, true), ("Old", 0, false)] {
        let reply = app
            .post(
                "/api/admin/case-studies",
                Some(&admin),
                json!({
                    "title": title,
                    "blog_url": "https://blog.example.com/post",
                    "display_order": order,
                    "is_active": active,
                    "description": "",
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        assert!(reply.body["data"]["description"].is_null());
    }

    let public = app.get("/api/case-studies", None).await;
    let titles: Vec<_> = public.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["Office", "Mall"]);

    let all = app.get("/api/admin/case-studies", Some(&admin)).await;
    assert_eq!(all.body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn owner_adds_and_edits_company_users() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let rival = app.seed_company("Rival", SubscriptionPlan::Basic);
    let (owner_id, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;
    let (_, rival_owner) = app
        .user_with_token("boss@rival.com", UserRole::BusinessOwner, &rival)
        .await;
    let store = app.store_with_staff(&owner, "Gangnam", &[]).await;
    let rival_store = app.store_with_staff(&rival_owner, "Busan", &[]).await;

    let created = app
        .post(
            "/api/business/users",
            Some(&owner),
            json!({
                "email": "Lead@Example.com",
                "password": common::PASSWORD,
                "name": "Team Lead",
                "role": "manager",
                "store_ids": [store],
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["data"]["email"], "lead@example.com");
    assert_eq!(created.body["data"]["role"], "manager");
    assert_eq!(created.body["data"]["approval_status"], "approved");
    assert_eq!(created.body["data"]["employment_active"], true);
    let lead_id = created.body["data"]["id"].as_str().unwrap().to_string();
    app.login("lead@example.com").await;

    let duplicate = app
        .post(
            "/api/business/users",
            Some(&owner),
            json!({ "email": "lead@example.com", "password": common::PASSWORD, "name": "Again" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let second_owner = app
        .post(
            "/api/business/users",
            Some(&owner),
            json!({
                "email": "co@example.com",
                "password": common::PASSWORD,
                "name": "Co Owner",
                "role": "business_owner",
            }),
        )
        .await;
    assert_eq!(second_owner.status, StatusCode::BAD_REQUEST);

    let foreign_store = app
        .post(
            "/api/business/users",
            Some(&owner),
            json!({
                "email": "far@example.com",
                "password": common::PASSWORD,
                "name": "Far Away",
                "store_ids": [rival_store],
            }),
        )
        .await;
    assert_eq!(foreign_store.status, StatusCode::BAD_REQUEST);

    let edited = app
        .patch(
            &format!("/api/business/users/{lead_id}"),
            Some(&owner),
            json!({ "name": "Kim Lead", "phone": "010-1234-5678", "employment_active": false }),
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK, "{}", edited.body);
    assert_eq!(edited.body["data"]["name"], "Kim Lead");
    assert_eq!(edited.body["data"]["phone"], "010-1234-5678");
    assert_eq!(edited.body["data"]["employment_active"], false);

    let self_demote = app
        .patch(
            &format!("/api/business/users/{owner_id}"),
            Some(&owner),
            json!({ "name": "Owner", "role": "staff" }),
        )
        .await;
    assert_eq!(self_demote.status, StatusCode::BAD_REQUEST);

    let stores = app
        .put(
            &format!("/api/business/users/{lead_id}/stores"),
            Some(&owner),
            json!({ "store_ids": [] }),
        )
        .await;
    assert_eq!(stores.status, StatusCode::OK, "{}", stores.body);
    assert_eq!(stores.body["data"].as_array().unwrap().len(), 0);

    let across = app
        .put(
            &format!("/api/business/users/{lead_id}/stores"),
            Some(&rival_owner),
            json!({ "store_ids": [rival_store] }),
        )
        .await;
    assert_eq!(across.status, StatusCode::FORBIDDEN);
    let across_edit = app
        .patch(
            &format!("/api/business/users/{lead_id}"),
            Some(&rival_owner),
            json!({ "name": "Taken Over" }),
        )
        .await;
    assert_eq!(across_edit.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn owner_audience_announcements_reach_managers() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let (_, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;
    let (_, manager) = app
        .user_with_token("lead@example.com", UserRole::Manager, &company)
        .await;
    let (_, staff) = app
        .user_with_token("staff@example.com", UserRole::Staff, &company)
        .await;

    let created = app
        .post(
            "/api/business/announcements",
            Some(&owner),
            json!({ "title": "Quarterly review", "content": "Bring numbers", "audience": "owner" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let id = created.body["data"]["id"].as_str().unwrap().to_string();

    let feed = app.get("/api/manager/announcements", Some(&manager)).await;
    assert_eq!(feed.status, StatusCode::OK, "{}", feed.body);
    assert_eq!(feed.body["data"][0]["id"], json!(id));
    assert_eq!(feed.body["data"][0]["is_read"], false);

    let read = app
        .post(
            "/api/manager/announcements",
            Some(&manager),
            json!({ "announcement_id": id }),
        )
        .await;
    assert_eq!(read.status, StatusCode::OK, "{}", read.body);
    let seen = app.get("/api/manager/announcements", Some(&manager)).await;
    assert_eq!(seen.body["data"][0]["is_read"], true);

    let stats = app.get("/api/business/announcements", Some(&owner)).await;
    assert_eq!(stats.body["data"][0]["read_count"], 1);

    let staff_feed = app.get("/api/staff/announcements", Some(&staff)).await;
    assert_eq!(staff_feed.body["data"].as_array().unwrap().len(), 0);
    let staff_read = app
        .post(
            "/api/staff/announcements/read",
            Some(&staff),
            json!({ "announcement_id": id }),
        )
        .await;
    assert_eq!(staff_read.status, StatusCode::FORBIDDEN);
    let staff_manager_feed = app.get("/api/manager/announcements", Some(&staff)).await;
    assert_eq!(staff_manager_feed.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expired_free_trial_closes_business_features() {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Free);
    let (_, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;

    let open = app.get("/api/features", Some(&owner)).await;
    assert_eq!(open.status, StatusCode::OK, "{}", open.body);
    assert_eq!(open.body["trial_expired"], false);
    let features = open.body["features"].as_array().unwrap();
    assert!(features.contains(&json!("stores")));
    assert!(!features.contains(&json!("attendance_report")));
    assert_eq!(app.get("/api/business/stores", Some(&owner)).await.status, StatusCode::OK);

    app.exec(
        "UPDATE companies SET trial_ends_at = '2000-01-01 00:00:00' WHERE id = ?1",
        [company.as_str()],
    );

    let gated = app.get("/api/business/stores", Some(&owner)).await;
    assert_eq!(gated.status, StatusCode::FORBIDDEN);
    let closed = app.get("/api/features", Some(&owner)).await;
    assert_eq!(closed.body["trial_expired"], true);
    assert_eq!(closed.body["features"], json!([]));

    assert_eq!(
        app.get("/api/features", None).await.status,
        StatusCode::UNAUTHORIZED
    );
}
