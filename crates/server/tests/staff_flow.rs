mod common;

use axum::http::StatusCode;
use serde_json::json;

use chrono::{Duration, Utc};

use cleanops_api::format::{sqlite_timestamp, yesterday_kst};
use cleanops_api::{SubscriptionPlan, UserRole};
use common::{TestApp, gps};

struct Shop {
    app: TestApp,
    company: String,
    owner: String,
    staff_id: String,
    staff: String,
    store_id: String,
}

async fn shop() -> Shop {
    let app = TestApp::new();
    let company = app.seed_company("Acme", SubscriptionPlan::Basic);
    let (_, owner) = app
        .user_with_token("owner@example.com", UserRole::BusinessOwner, &company)
        .await;
    let (staff_id, staff) = app
        .user_with_token("staff@example.com", UserRole::Staff, &company)
        .await;
    let store_id = app.store_with_staff(&owner, "Gangnam", &[&staff_id]).await;
    Shop {
        app,
        company,
        owner,
        staff_id,
        staff,
        store_id,
    }
}

async fn clock_in(shop: &Shop, store_id: &str) -> common::Reply {
    shop.app
        .post(
            "/api/attendance/clock-in",
            Some(&shop.staff),
            json!({ "store_id": store_id, "location": gps() }),
        )
        .await
}

async fn clock_out(shop: &Shop, store_id: &str) -> common::Reply {
    shop.app
        .post(
            "/api/attendance/clock-out",
            Some(&shop.staff),
            json!({ "store_id": store_id, "location": gps() }),
        )
        .await
}

#[tokio::test]
async fn assigned_stores_report_clock_in_state() {
    let shop = shop().await;
    let before = shop
        .app
        .get("/api/staff/assigned-stores?include_attendance=true", Some(&shop.staff))
        .await;
    assert_eq!(before.status, StatusCode::OK);
    assert_eq!(before.body["data"][0]["id"], json!(shop.store_id));
    assert_eq!(before.body["data"][0]["is_clocked_in"], false);

    assert_eq!(clock_in(&shop, &shop.store_id).await.status, StatusCode::CREATED);
    let after = shop
        .app
        .get("/api/staff/assigned-stores?include_attendance=1", Some(&shop.staff))
        .await;
    assert_eq!(after.body["data"][0]["is_clocked_in"], true);
}

#[tokio::test]
async fn clock_in_twice_is_a_conflict_with_code() {
    let shop = shop().await;
    let first = clock_in(&shop, &shop.store_id).await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);
    assert_eq!(first.body["data"]["store_id"], json!(shop.store_id));

    let second = clock_in(&shop, &shop.store_id).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["error"], "AlreadyClockedIn");
    assert_eq!(second.body["statusCode"], 409);
}

#[tokio::test]
async fn clock_in_elsewhere_requires_clock_out_first() {
    let shop = shop().await;
    let second_store = shop
        .app
        .store_with_staff(&shop.owner, "Jamsil", &[&shop.staff_id])
        .await;

    assert_eq!(clock_in(&shop, &shop.store_id).await.status, StatusCode::CREATED);
    let blocked = clock_in(&shop, &second_store).await;
    assert_eq!(blocked.status, StatusCode::CONFLICT);
    assert_eq!(blocked.body["error"], "AlreadyClockedIn");

    assert_eq!(clock_out(&shop, &shop.store_id).await.status, StatusCode::OK);
    assert_eq!(clock_in(&shop, &second_store).await.status, StatusCode::CREATED);
}

#[tokio::test]
async fn clock_out_twice_is_a_conflict() {
    let shop = shop().await;
    let none = clock_out(&shop, &shop.store_id).await;
    assert_eq!(none.status, StatusCode::NOT_FOUND);

    clock_in(&shop, &shop.store_id).await;
    let out = clock_out(&shop, &shop.store_id).await;
    assert_eq!(out.status, StatusCode::OK, "{}", out.body);
    assert!(out.body["data"]["clock_out_at"].is_string());

    let again = clock_out(&shop, &shop.store_id).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["error"], "AlreadyClockedOut");

    let history = shop.app.get("/api/staff/attendance", Some(&shop.staff)).await;
    assert_eq!(history.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn clock_in_validation_and_assignment() {
    let shop = shop().await;
    let bad = shop
        .app
        .post(
            "/api/attendance/clock-in",
            Some(&shop.staff),
            json!({ "store_id": "not-a-uuid", "location": { "lat": 120.0, "lng": 0.0 } }),
        )
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert!(bad.body["details"]["fieldErrors"]["store_id"].is_array());
    assert!(bad.body["details"]["fieldErrors"]["location.lat"].is_array());

    let unassigned = shop.app.store_with_staff(&shop.owner, "Mapo", &[]).await;
    let reply = clock_in(&shop, &unassigned).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inactive_store_refuses_clock_in() {
    let shop = shop().await;
    let reply = shop
        .app
        .put(
            &format!("/api/business/stores/{}", shop.store_id),
            Some(&shop.owner),
            json!({ "service_active": false }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = clock_in(&shop, &shop.store_id).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["error"], "store inactive");
}

#[tokio::test]
async fn checklist_templates_are_issued_on_clock_in() {
    let shop = shop().await;
    let template = shop
        .app
        .post(
            "/api/business/checklists",
            Some(&shop.owner),
            json!({
                "store_id": shop.store_id,
                "items": [
                    { "area": "Lobby", "type": "check", "checked": true },
                    { "area": "Restroom", "type": "before_after_photo" },
                ],
            }),
        )
        .await;
    assert_eq!(template.status, StatusCode::CREATED, "{}", template.body);
    // Templates never carry progress.
    assert_eq!(template.body["data"]["items"][0]["checked"], false);

    let before = shop.app.get("/api/staff/checklists", Some(&shop.staff)).await;
    assert_eq!(before.body["data"]["checklists"].as_array().unwrap().len(), 0);

    clock_in(&shop, &shop.store_id).await;
    let issued = shop.app.get("/api/staff/checklists", Some(&shop.staff)).await;
    let open = issued.body["data"]["checklists"].as_array().unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["progress"]["total_items"], 3);
    assert_eq!(open[0]["assigned_user_id"], json!(shop.staff_id));
    let checklist_id = open[0]["id"].as_str().unwrap().to_string();

    // A second fetch must not issue another copy.
    let again = shop.app.get("/api/staff/checklists", Some(&shop.staff)).await;
    assert_eq!(again.body["data"]["checklists"].as_array().unwrap().len(), 1);

    let done = shop
        .app
        .patch(
            &format!("/api/staff/checklists/{checklist_id}"),
            Some(&shop.staff),
            json!({
                "items": [
                    { "area": "Lobby", "type": "check", "checked": true },
                    {
                        "area": "Restroom",
                        "type": "before_after_photo",
                        "before_photo_url": "https://cdn.example.com/b.jpg",
                        "after_photo_url": "https://cdn.example.com/a.jpg",
                    },
                ],
            }),
        )
        .await;
    assert_eq!(done.status, StatusCode::OK, "{}", done.body);
    assert_eq!(done.body["data"]["progress"]["percentage"], 100);

    let split = shop.app.get("/api/staff/checklists", Some(&shop.staff)).await;
    assert_eq!(split.body["data"]["checklists"].as_array().unwrap().len(), 0);
    assert_eq!(
        split.body["data"]["completed_checklists"].as_array().unwrap().len(),
        1
    );

    let summary = shop
        .app
        .get("/api/staff/checklist-progress", Some(&shop.staff))
        .await;
    assert_eq!(summary.body["data"]["completed_count"], 1);
}

#[tokio::test]
async fn only_templates_can_be_deleted() {
    let shop = shop().await;
    let template = shop
        .app
        .post(
            "/api/business/checklists",
            Some(&shop.owner),
            json!({ "store_id": shop.store_id, "items": [{ "area": "Floor" }] }),
        )
        .await;
    let template_id = template.body["data"]["id"].as_str().unwrap().to_string();

    clock_in(&shop, &shop.store_id).await;
    let issued = shop.app.get("/api/staff/checklists", Some(&shop.staff)).await;
    let instance_id = issued.body["data"]["checklists"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let refused = shop
        .app
        .delete(&format!("/api/business/checklists/{instance_id}"), Some(&shop.owner))
        .await;
    assert_eq!(refused.status, StatusCode::BAD_REQUEST);

    let removed = shop
        .app
        .delete(&format!("/api/business/checklists/{template_id}"), Some(&shop.owner))
        .await;
    assert_eq!(removed.status, StatusCode::OK);
}

#[tokio::test]
async fn supply_request_moves_through_owner_flow() {
    let shop = shop().await;
    let created = shop
        .app
        .post(
            "/api/staff/supply-requests",
            Some(&shop.staff),
            json!({ "store_id": shop.store_id, "title": "Mop heads", "category": "cleaning" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["data"]["status"], "received");
    let id = created.body["data"]["id"].as_str().unwrap().to_string();

    let inbox = shop
        .app
        .get("/api/business/supply-requests/received", Some(&shop.owner))
        .await;
    assert_eq!(inbox.body["data"].as_array().unwrap().len(), 1);

    let early = shop
        .app
        .post(
            &format!("/api/business/supply-requests/{id}/complete"),
            Some(&shop.owner),
            json!({}),
        )
        .await;
    assert_eq!(early.status, StatusCode::BAD_REQUEST);

    let confirmed = shop
        .app
        .post(
            &format!("/api/business/supply-requests/{id}/confirm"),
            Some(&shop.owner),
            json!({}),
        )
        .await;
    assert_eq!(confirmed.body["data"]["status"], "in_progress");

    let completed = shop
        .app
        .post(
            &format!("/api/business/supply-requests/{id}/complete"),
            Some(&shop.owner),
            json!({ "completion_description": "Delivered" }),
        )
        .await;
    assert_eq!(completed.status, StatusCode::OK, "{}", completed.body);
    assert_eq!(completed.body["data"]["status"], "completed");
    assert!(completed.body["data"]["completed_at"].is_string());

    let mine = shop
        .app
        .get("/api/staff/supply-requests", Some(&shop.staff))
        .await;
    assert_eq!(mine.body["data"][0]["status"], "completed");

    // Fresh completions stay out of the archive.
    let archived = shop
        .app
        .post("/api/business/supply-requests/archive", Some(&shop.owner), json!({}))
        .await;
    assert_eq!(archived.body["archived_count"], 0);
}

#[tokio::test]
async fn store_manager_completes_forwarded_request_with_photo() {
    let shop = shop().await;
    let company_store = shop.store_id.clone();
    let (manager_id, manager) = shop
        .app
        .user_with_token("manager@example.com", UserRole::StoreManager, &shop.company)
        .await;
    let reply = shop
        .app
        .put(
            &format!("/api/business/stores/{company_store}/users"),
            Some(&shop.owner),
            json!({ "user_ids": [shop.staff_id, manager_id] }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let created = shop
        .app
        .post(
            "/api/staff/supply-requests",
            Some(&shop.staff),
            json!({ "store_id": company_store, "title": "Gloves", "category": "safety" }),
        )
        .await;
    let id = created.body["data"]["id"].as_str().unwrap().to_string();

    let forwarded = shop
        .app
        .post(
            &format!("/api/business/supply-requests/{id}/forward"),
            Some(&shop.owner),
            json!({ "manager_comment": "please buy two boxes" }),
        )
        .await;
    assert_eq!(forwarded.status, StatusCode::OK, "{}", forwarded.body);
    assert_eq!(forwarded.body["data"]["status"], "manager_in_progress");

    let queue = shop
        .app
        .get("/api/store-manager/supply-requests", Some(&manager))
        .await;
    assert_eq!(queue.body["data"].as_array().unwrap().len(), 1);

    let no_photo = shop
        .app
        .post(
            &format!("/api/store-manager/supply-requests/{id}/complete"),
            Some(&manager),
            json!({}),
        )
        .await;
    assert_eq!(no_photo.status, StatusCode::BAD_REQUEST);

    let done = shop
        .app
        .post(
            &format!("/api/store-manager/supply-requests/{id}/complete"),
            Some(&manager),
            json!({ "completion_photo_url": "https://cdn.example.com/gloves.jpg" }),
        )
        .await;
    assert_eq!(done.status, StatusCode::OK, "{}", done.body);
    assert_eq!(done.body["data"]["status"], "completed");
}

#[tokio::test]
async fn lost_items_are_reported_and_confirmed() {
    let shop = shop().await;
    let created = shop
        .app
        .post(
            "/api/staff/lost-items",
            Some(&shop.staff),
            json!({
                "store_id": shop.store_id,
                "item_type": "wallet",
                "storage_location": "front desk",
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["data"]["status"], "submitted");
    let id = created.body["data"]["id"].as_str().unwrap().to_string();

    let listed = shop.app.get("/api/business/lost-items", Some(&shop.owner)).await;
    assert_eq!(listed.body["data"].as_array().unwrap().len(), 1);

    let confirmed = shop
        .app
        .patch(
            &format!("/api/business/lost-items/{id}/confirm"),
            Some(&shop.owner),
            json!({}),
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::OK);

    let mine = shop.app.get("/api/staff/lost-items", Some(&shop.staff)).await;
    assert_eq!(mine.body["data"][0]["status"], "completed");

    let again = shop
        .app
        .patch(
            &format!("/api/business/lost-items/{id}/confirm"),
            Some(&shop.owner),
            json!({}),
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn open_shift_from_yesterday_blocks_clock_in_until_closed() {
    let shop = shop().await;
    let first = clock_in(&shop, &shop.store_id).await;
    assert_eq!(first.status, StatusCode::CREATED);
    let yesterday = yesterday_kst(Utc::now());
    shop.app.exec(
        "UPDATE attendance SET work_date = ?1 WHERE id = ?2",
        [yesterday.as_str(), first.body["data"]["id"].as_str().unwrap()],
    );

    let blocked = clock_in(&shop, &shop.store_id).await;
    assert_eq!(blocked.status, StatusCode::CONFLICT);
    assert_eq!(blocked.body["error"], "AlreadyClockedIn");

    let out = clock_out(&shop, &shop.store_id).await;
    assert_eq!(out.status, StatusCode::OK, "{}", out.body);
    assert_eq!(out.body["data"]["work_date"], json!(yesterday));

    assert_eq!(clock_in(&shop, &shop.store_id).await.status, StatusCode::CREATED);
    let history = shop.app.get("/api/staff/attendance", Some(&shop.staff)).await;
    assert_eq!(history.body["data"].as_array().unwrap().len(), 2);
}

async fn supply_request(shop: &Shop, title: &str) -> String {
    let created = shop
        .app
        .post(
            "/api/staff/supply-requests",
            Some(&shop.staff),
            json!({ "store_id": shop.store_id, "title": title, "category": "cleaning" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    created.body["data"]["id"].as_str().unwrap().to_string()
}

async fn company_requests(shop: &Shop, query: &str) -> usize {
    let reply = shop
        .app
        .get(&format!("/api/business/supply-requests{query}"), Some(&shop.owner))
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    reply.body["data"].as_array().unwrap().len()
}

#[tokio::test]
async fn old_completions_are_archived_and_filtered() {
    let shop = shop().await;
    let old = supply_request(&shop, "Bleach").await;
    supply_request(&shop, "Sponges").await;
    for step in ["confirm", "complete"] {
        let reply = shop
            .app
            .post(
                &format!("/api/business/supply-requests/{old}/{step}"),
                Some(&shop.owner),
                json!({}),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{step}: {}", reply.body);
    }
    let long_ago = sqlite_timestamp(Utc::now() - Duration::days(20));
    shop.app.exec(
        "UPDATE supply_requests SET completed_at = ?1 WHERE id = ?2",
        [long_ago.as_str(), old.as_str()],
    );

    // Completions older than the window drop out of the default list.
    assert_eq!(company_requests(&shop, "").await, 1);
    assert_eq!(company_requests(&shop, "?all_period=true").await, 2);

    let archived = shop
        .app
        .post("/api/business/supply-requests/archive", Some(&shop.owner), json!({}))
        .await;
    assert_eq!(archived.status, StatusCode::OK);
    assert_eq!(archived.body["archived_count"], 1);

    assert_eq!(company_requests(&shop, "?all_period=true").await, 1);
    assert_eq!(company_requests(&shop, "?archived_only=true").await, 1);
    assert_eq!(company_requests(&shop, "?include_archived=true").await, 1);
    assert_eq!(
        company_requests(&shop, "?include_archived=true&all_period=true").await,
        2
    );

    let rerun = shop
        .app
        .post("/api/business/supply-requests/archive", Some(&shop.owner), json!({}))
        .await;
    assert_eq!(rerun.body["archived_count"], 0);
}

#[tokio::test]
async fn forward_accepts_a_request_without_body() {
    let shop = shop().await;
    let id = supply_request(&shop, "Trash bags").await;
    let forwarded = shop
        .app
        .post_empty(
            &format!("/api/business/supply-requests/{id}/forward"),
            Some(&shop.owner),
        )
        .await;
    assert_eq!(forwarded.status, StatusCode::OK, "{}", forwarded.body);
    assert_eq!(forwarded.body["data"]["status"], "manager_in_progress");
    assert!(forwarded.body["data"]["manager_comment"].is_null());
}

async fn report_problem(shop: &Shop, body: serde_json::Value) -> common::Reply {
    shop.app
        .post("/api/staff/problem-reports", Some(&shop.staff), body)
        .await
}

#[tokio::test]
async fn problem_reports_are_filed_grouped_and_closed_once() {
    let shop = shop().await;
    let store = report_problem(
        &shop,
        json!({ "store_id": shop.store_id, "category": "store_problem", "title": "Leaking tap" }),
    )
    .await;
    assert_eq!(store.status, StatusCode::CREATED, "{}", store.body);
    assert_eq!(store.body["data"]["status"], "submitted");
    let store_report = store.body["data"]["id"].as_str().unwrap().to_string();

    let vending = report_problem(
        &shop,
        json!({
            "store_id": shop.store_id,
            "category": "vending_machine",
            "title": "Coil stuck",
            "photo_urls": ["https://cdn.example.com/p1.jpg", "https://cdn.example.com/p2.jpg"],
            "vending_machine_number": 3,
            "product_number": "A7",
        }),
    )
    .await;
    assert_eq!(vending.status, StatusCode::CREATED, "{}", vending.body);
    assert_eq!(vending.body["data"]["photo_url"], "https://cdn.example.com/p1.jpg");
    let vending_report = vending.body["data"]["id"].as_str().unwrap().to_string();

    let untitled = report_problem(&shop, json!({ "store_id": shop.store_id })).await;
    assert_eq!(untitled.status, StatusCode::BAD_REQUEST);
    assert!(untitled.body["details"]["fieldErrors"]["title"].is_array());

    let mine = shop.app.get("/api/staff/problem-reports", Some(&shop.staff)).await;
    assert_eq!(mine.body["data"].as_array().unwrap().len(), 2);

    let grouped = shop
        .app
        .get(
            &format!("/api/business/stores/{}/problem-reports", shop.store_id),
            Some(&shop.owner),
        )
        .await;
    assert_eq!(grouped.status, StatusCode::OK, "{}", grouped.body);
    assert_eq!(grouped.body["data"]["store_problems"].as_array().unwrap().len(), 1);
    assert_eq!(grouped.body["data"]["vending_problems"][0]["id"], json!(vending_report));

    let completed = shop
        .app
        .patch(
            &format!("/api/business/problem-reports/{vending_report}/complete"),
            Some(&shop.owner),
            json!({ "description": "Cleared the coil", "photo_urls": ["https://cdn.example.com/fixed.jpg"] }),
        )
        .await;
    assert_eq!(completed.status, StatusCode::OK, "{}", completed.body);
    assert_eq!(completed.body["data"]["status"], "completed");
    assert_eq!(completed.body["data"]["completion_description"], "Cleared the coil");
    assert_eq!(completed.body["data"]["completion_photo_urls"][0], "https://cdn.example.com/fixed.jpg");

    let confirmed = shop
        .app
        .patch(
            &format!("/api/business/problem-reports/{store_report}/confirm"),
            Some(&shop.owner),
            json!({}),
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::OK);

    let twice = shop
        .app
        .patch(
            &format!("/api/business/problem-reports/{store_report}/confirm"),
            Some(&shop.owner),
            json!({}),
        )
        .await;
    assert_eq!(twice.status, StatusCode::BAD_REQUEST);

    let by_staff = shop
        .app
        .get(
            &format!("/api/business/stores/{}/problem-reports", shop.store_id),
            Some(&shop.staff),
        )
        .await;
    assert_eq!(by_staff.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn emergency_clock_in_must_name_a_report_at_the_store() {
    let shop = shop().await;
    let unknown = shop
        .app
        .post(
            "/api/attendance/clock-in",
            Some(&shop.staff),
            json!({
                "store_id": shop.store_id,
                "location": gps(),
                "attendance_type": "emergency",
                "problem_report_id": "00000000-0000-4000-8000-000000000000",
            }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST, "{}", unknown.body);
    assert!(unknown.body["details"]["fieldErrors"]["problem_report_id"].is_array());

    let report = report_problem(
        &shop,
        json!({ "store_id": shop.store_id, "title": "Door jammed" }),
    )
    .await;
    let report_id = report.body["data"]["id"].as_str().unwrap().to_string();
    let known = shop
        .app
        .post(
            "/api/attendance/clock-in",
            Some(&shop.staff),
            json!({
                "store_id": shop.store_id,
                "location": gps(),
                "attendance_type": "emergency",
                "problem_report_id": report_id,
            }),
        )
        .await;
    assert_eq!(known.status, StatusCode::CREATED, "{}", known.body);
    assert_eq!(known.body["data"]["problem_report_id"], json!(report_id));
}

#[tokio::test]
async fn manager_reviews_submitted_checklists() {
    let shop = shop().await;
    let (_, manager) = shop
        .app
        .user_with_token("lead@example.com", UserRole::Manager, &shop.company)
        .await;
    let template = shop
        .app
        .post(
            "/api/business/checklists",
            Some(&shop.owner),
            json!({ "store_id": shop.store_id, "items": [{ "area": "Lobby", "type": "check" }] }),
        )
        .await;
    assert_eq!(template.status, StatusCode::CREATED);
    let template_id = template.body["data"]["id"].as_str().unwrap().to_string();

    clock_in(&shop, &shop.store_id).await;
    let issued = shop.app.get("/api/staff/checklists", Some(&shop.staff)).await;
    let checklist_id = issued.body["data"]["checklists"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let queue = shop.app.get("/api/manager/reviews", Some(&manager)).await;
    assert_eq!(queue.status, StatusCode::OK, "{}", queue.body);
    let pending = queue.body["data"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], json!(checklist_id));

    let no_comment = shop
        .app
        .patch(
            &format!("/api/manager/reviews/{checklist_id}"),
            Some(&manager),
            json!({ "status": "reshoot_requested" }),
        )
        .await;
    assert_eq!(no_comment.status, StatusCode::BAD_REQUEST);

    let of_template = shop
        .app
        .patch(
            &format!("/api/manager/reviews/{template_id}"),
            Some(&manager),
            json!({ "status": "approved" }),
        )
        .await;
    assert_eq!(of_template.status, StatusCode::BAD_REQUEST);

    let reshoot = shop
        .app
        .patch(
            &format!("/api/manager/reviews/{checklist_id}"),
            Some(&manager),
            json!({ "status": "reshoot_requested", "comment": "Lobby photo is blurry" }),
        )
        .await;
    assert_eq!(reshoot.status, StatusCode::OK, "{}", reshoot.body);
    assert_eq!(reshoot.body["data"]["review_status"], "reshoot_requested");
    assert_eq!(reshoot.body["data"]["review_comment"], "Lobby photo is blurry");
    assert!(reshoot.body["data"]["reviewed_at"].is_string());

    let decided = shop
        .app
        .patch(
            &format!("/api/manager/reviews/{checklist_id}"),
            Some(&manager),
            json!({ "status": "approved" }),
        )
        .await;
    assert_eq!(decided.status, StatusCode::CONFLICT);

    // Staff resubmits, which puts the checklist back in the queue.
    let resubmitted = shop
        .app
        .patch(
            &format!("/api/staff/checklists/{checklist_id}"),
            Some(&shop.staff),
            json!({ "items": [{ "area": "Lobby", "type": "check", "checked": true }] }),
        )
        .await;
    assert_eq!(resubmitted.status, StatusCode::OK, "{}", resubmitted.body);
    let approved = shop
        .app
        .patch(
            &format!("/api/manager/reviews/{checklist_id}"),
            Some(&manager),
            json!({ "status": "approved" }),
        )
        .await;
    assert_eq!(approved.status, StatusCode::OK, "{}", approved.body);

    let done = shop
        .app
        .get("/api/manager/reviews?status=approved", Some(&manager))
        .await;
    assert_eq!(done.body["data"].as_array().unwrap().len(), 1);
    let empty = shop.app.get("/api/manager/reviews", Some(&manager)).await;
    assert_eq!(empty.body["data"].as_array().unwrap().len(), 0);

    let by_staff = shop.app.get("/api/manager/reviews", Some(&shop.staff)).await;
    assert_eq!(by_staff.status, StatusCode::FORBIDDEN);
}
