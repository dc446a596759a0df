use std::collections::BTreeSet;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rusqlite::Connection;

use cleanops_api::{
    ChecklistItem, ChecklistResponse, ChecklistSummaryResponse, CreateChecklistTemplateRequest,
    Envelope, FieldErrors, Feature, OkResponse, ReviewChecklistRequest, ReviewListQuery,
    ReviewStatus, StaffChecklistsResponse, UpdateChecklistRequest, db as dbq,
    format::{today_kst, yesterday_kst},
    service,
};

use super::auth::AuthUser;
use super::{
    OWNERS, REVIEWERS, STAFF_MODE, assert_store_active, business_scope, check_company,
};
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{
    ChecklistRow, Db, checklist_from_row, is_constraint_violation, sq_execute, sq_flag,
    sq_query_map, sq_query_opt, sq_query_row, store_from_row,
};

fn load_checklist(conn: &Connection, id: &str) -> Result<Option<ChecklistRow>, ApiErr> {
    sq_query_opt(conn, dbq::checklists::get_by_id(id), checklist_from_row)
        .map_err(ApiErr::from_db("load checklist"))
}

fn items_json(items: &[ChecklistItem]) -> Result<String, ApiErr> {
    serde_json::to_string(items).map_err(ApiErr::from_db("encode checklist items"))
}

fn is_template(c: &ChecklistResponse) -> bool {
    c.template_id.is_none() && c.assigned_user_id.is_none() && c.work_date.is_none()
}

// ---------------------------------------------------------------------------
// Business owner: templates
// ---------------------------------------------------------------------------

/// GET /api/business/checklists — templates of every store of the company.
pub async fn list_templates(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<ChecklistResponse>>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Checklists)?;
    let templates = sq_query_map(
        &conn,
        dbq::checklists::list_templates_by_company(&company_id),
        checklist_from_row,
    )
    .map_err(ApiErr::from_db("list checklist templates"))?
    .into_iter()
    .map(|row| row.checklist)
    .collect();
    Ok(Json(Envelope::ok(templates)))
}

/// POST /api/business/checklists — add a template to a store.
pub async fn create_template(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateChecklistTemplateRequest>,
) -> Result<(StatusCode, Json<Envelope<ChecklistResponse>>), ApiErr> {
    let mut errs = FieldErrors::default();
    service::check_uuid(&mut errs, "store_id", &req.store_id);
    errs.into_result()?;
    service::validate_checklist_items(&req.items)?;
    let note = service::blank_to_none(req.note.clone());

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Checklists)?;
    let store = sq_query_opt(&conn, dbq::stores::get_by_id(&req.store_id), store_from_row)
        .map_err(ApiErr::from_db("load store"))?
        .map(|s| (s.company_id.clone(), s));
    check_company(store, &company_id, "store")?;

    let id = super::new_id();
    let items = items_json(&service::reset_items(&req.items))?;
    sq_execute(
        &conn,
        dbq::checklists::insert_template(
            &id,
            &req.store_id,
            &user.user_id,
            &items,
            note.as_deref(),
            req.requires_photos,
        ),
    )
    .map_err(ApiErr::from_db("insert checklist template"))?;

    let created = sq_query_row(&conn, dbq::checklists::get_by_id(&id), checklist_from_row)
        .map_err(ApiErr::from_db("load checklist"))?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(created.checklist))))
}

/// DELETE /api/business/checklists/{id} — remove a template. Issued instances stay.
pub async fn delete_template(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Checklists)?;
    let row = load_checklist(&conn, &id)?.map(|r| (r.company_id, r.checklist));
    let checklist = check_company(row, &company_id, "checklist")?;
    if !is_template(&checklist) {
        return Err(ApiErr::bad_request("only checklist templates can be deleted"));
    }

    sq_execute(&conn, dbq::checklists::delete(&id))
        .map_err(ApiErr::from_db("delete checklist"))?;
    Ok(Json(OkResponse::ok()))
}

// ---------------------------------------------------------------------------
// Staff: instances
// ---------------------------------------------------------------------------

/// Issue today's copy of every template of the store the worker is clocked in at.
fn materialize_instances(
    conn: &Connection,
    user_id: &str,
    store_id: &str,
    work_date: &str,
) -> Result<(), ApiErr> {
    let templates = sq_query_map(
        conn,
        dbq::checklists::list_templates_for_store(store_id),
        checklist_from_row,
    )
    .map_err(ApiErr::from_db("list store templates"))?;

    for template in templates.into_iter().map(|row| row.checklist) {
        let exists = sq_flag(
            conn,
            dbq::checklists::instance_exists(&template.id, user_id, work_date),
        )
        .map_err(ApiErr::from_db("check checklist instance"))?;
        if exists {
            continue;
        }

        let id = super::new_id();
        let items = items_json(&service::reset_items(&template.items))?;
        let insert = dbq::checklists::insert_instance(&dbq::checklists::NewInstance {
            id: &id,
            template_id: &template.id,
            store_id,
            created_by: &template.created_by,
            assigned_user_id: user_id,
            work_date,
            items_json: &items,
            note: template.note.as_deref(),
            requires_photos: template.requires_photos,
        });
        match sq_execute(conn, insert) {
            Ok(_) => {
                tracing::debug!(checklist_id = %id, template_id = %template.id, %work_date, "checklist issued");
            }
            // Another request issued it first.
            Err(e) if is_constraint_violation(&e) => {}
            Err(e) => {
                tracing::error!("insert checklist instance: {e}");
                return Err(ApiErr::internal("internal server error"));
            }
        }
    }
    Ok(())
}

/// GET /api/staff/checklists — checklists of the stores the caller is clocked in at.
pub async fn staff_checklists(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<StaffChecklistsResponse>>, ApiErr> {
    user.require_role(STAFF_MODE)?;
    let now = Utc::now();
    let (today, yesterday) = (today_kst(now), yesterday_kst(now));

    let conn = db.conn();
    let open = sq_query_map(
        &conn,
        dbq::attendance::open_shifts_on(&user.user_id, &[today.as_str(), yesterday.as_str()]),
        |row| Ok((row.get::<_, String>("store_id")?, row.get::<_, String>("work_date")?)),
    )
    .map_err(ApiErr::from_db("list open shifts"))?;

    let mut store_ids = BTreeSet::new();
    let mut work_dates = BTreeSet::new();
    for (store_id, work_date) in open {
        if !store_ids.insert(store_id.clone()) {
            continue;
        }
        if let Err(e) = assert_store_active(&conn, &store_id) {
            tracing::debug!(%store_id, status = %e.status(), "skipping store without service");
            store_ids.remove(&store_id);
            continue;
        }
        materialize_instances(&conn, &user.user_id, &store_id, &work_date)?;
        work_dates.insert(work_date);
    }

    if store_ids.is_empty() {
        return Ok(Json(Envelope::ok(StaffChecklistsResponse {
            checklists: Vec::new(),
            completed_checklists: Vec::new(),
        })));
    }

    let store_refs: Vec<&str> = store_ids.iter().map(String::as_str).collect();
    let date_refs: Vec<&str> = work_dates.iter().map(String::as_str).collect();
    let (completed, open): (Vec<_>, Vec<_>) = sq_query_map(
        &conn,
        dbq::checklists::list_assigned_on(&user.user_id, &store_refs, &date_refs),
        checklist_from_row,
    )
    .map_err(ApiErr::from_db("list checklists"))?
    .into_iter()
    .map(|row| row.checklist)
    .partition(|c| service::is_checklist_complete(&c.progress));

    Ok(Json(Envelope::ok(StaffChecklistsResponse {
        checklists: open,
        completed_checklists: completed,
    })))
}

/// PATCH /api/staff/checklists/{id} — save progress on today's checklist.
pub async fn update_checklist(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateChecklistRequest>,
) -> Result<Json<Envelope<ChecklistResponse>>, ApiErr> {
    user.require_role(STAFF_MODE)?;
    service::validate_checklist_items(&req.items)?;

    let today = today_kst(Utc::now());
    let conn = db.conn();
    let checklist = load_checklist(&conn, &id)?
        .ok_or_else(|| ApiErr::not_found("checklist not found"))?
        .checklist;

    let allowed = match checklist.assigned_user_id.as_deref() {
        Some(assignee) => assignee == user.user_id,
        None => sq_flag(&conn, dbq::stores::is_assigned(&user.user_id, &checklist.store_id))
            .map_err(ApiErr::from_db("check store assignment"))?,
    };
    if !allowed {
        return Err(ApiErr::forbidden("checklist is not assigned to you"));
    }
    assert_store_active(&conn, &checklist.store_id)?;
    service::check_checklist_workday(checklist.work_date.as_deref(), &today)?;

    let items = items_json(&req.items)?;
    sq_execute(
        &conn,
        dbq::checklists::update_items(&id, &items, req.note.as_deref()),
    )
    .map_err(ApiErr::from_db("update checklist"))?;

    let updated = sq_query_row(&conn, dbq::checklists::get_by_id(&id), checklist_from_row)
        .map_err(ApiErr::from_db("load checklist"))?;
    Ok(Json(Envelope::ok(updated.checklist)))
}

/// GET /api/staff/checklist-progress — combined progress over today's checklists.
pub async fn progress_summary(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<ChecklistSummaryResponse>>, ApiErr> {
    user.require_role(STAFF_MODE)?;
    let today = today_kst(Utc::now());

    let conn = db.conn();
    let checklists: Vec<ChecklistResponse> = sq_query_map(
        &conn,
        dbq::checklists::list_assigned_for_date(&user.user_id, &today),
        checklist_from_row,
    )
    .map_err(ApiErr::from_db("list today's checklists"))?
    .into_iter()
    .map(|row| row.checklist)
    .collect();

    let completed = checklists
        .iter()
        .filter(|c| service::is_checklist_complete(&c.progress))
        .count();
    Ok(Json(Envelope::ok(ChecklistSummaryResponse {
        checklist_count: checklists.len() as u32,
        completed_count: completed as u32,
        progress: service::combined_progress(checklists.iter().map(|c| &c.progress)),
        work_date: today,
    })))
}

// ---------------------------------------------------------------------------
// Manager: reviews
// ---------------------------------------------------------------------------

/// GET /api/manager/reviews — instances in one review state, pending by default.
pub async fn list_reviews(
    State(db): State<Db>,
    user: AuthUser,
    Query(q): Query<ReviewListQuery>,
) -> Result<Json<Envelope<Vec<ChecklistResponse>>>, ApiErr> {
    let status = q.status.unwrap_or(ReviewStatus::Pending);
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, REVIEWERS, Feature::Checklists)?;
    let checklists = sq_query_map(
        &conn,
        dbq::checklists::list_for_review(&company_id, status),
        checklist_from_row,
    )
    .map_err(ApiErr::from_db("list checklists for review"))?
    .into_iter()
    .map(|row| row.checklist)
    .collect();
    Ok(Json(Envelope::ok(checklists)))
}

/// PATCH /api/manager/reviews/{id} — approve or ask for a reshoot.
pub async fn review_checklist(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ReviewChecklistRequest>,
) -> Result<Json<Envelope<ChecklistResponse>>, ApiErr> {
    let comment = service::validate_review(&req)?;

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, REVIEWERS, Feature::Checklists)?;
    let row = load_checklist(&conn, &id)?.map(|r| (r.company_id, r.checklist));
    let checklist = check_company(row, &company_id, "checklist")?;
    if is_template(&checklist) {
        return Err(ApiErr::bad_request("templates are not reviewed"));
    }
    if checklist.review_status != ReviewStatus::Pending {
        return Err(ApiErr::conflict(format!(
            "checklist was already reviewed ({})",
            checklist.review_status
        )));
    }

    let updated = sq_execute(
        &conn,
        dbq::checklists::review(&id, req.status, &user.user_id, comment.as_deref()),
    )
    .map_err(ApiErr::from_db("review checklist"))?;
    if updated == 0 {
        return Err(ApiErr::conflict("checklist was reviewed by someone else"));
    }
    tracing::info!(checklist_id = %id, status = %req.status, reviewer = %user.user_id, "checklist reviewed");

    let reviewed = load_checklist(&conn, &id)?
        .ok_or_else(|| ApiErr::not_found("checklist not found"))?;
    Ok(Json(Envelope::ok(reviewed.checklist)))
}
