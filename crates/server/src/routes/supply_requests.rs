use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rusqlite::Connection;

use cleanops_api::{
    ArchiveResponse, CompleteSupplyRequest, CreateSupplyRequest, Envelope, Feature,
    ForwardSupplyRequest, SupplyRequestListQuery, SupplyRequestResponse, db as dbq,
    db::supply_requests::ListFilter,
    format::sqlite_timestamp,
    service::{self, SupplyAction},
};

use super::auth::AuthUser;
use super::{OWNERS, STAFF_MODE, STORE_MANAGERS, assert_store_active, business_scope, check_company};
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{Db, SupplyRow, sq_execute, sq_flag, sq_query_map, sq_query_opt, supply_from_row};

fn load_request(conn: &Connection, id: &str) -> Result<Option<SupplyRow>, ApiErr> {
    sq_query_opt(conn, dbq::supply_requests::get_by_id(id), supply_from_row)
        .map_err(ApiErr::from_db("load supply request"))
}

fn reload(conn: &Connection, id: &str) -> Result<SupplyRequestResponse, ApiErr> {
    load_request(conn, id)?
        .map(|row| row.request)
        .ok_or_else(|| ApiErr::not_found("supply request not found"))
}

fn list(conn: &Connection, built: dbq::Built) -> Result<Vec<SupplyRequestResponse>, ApiErr> {
    Ok(sq_query_map(conn, built, supply_from_row)
        .map_err(ApiErr::from_db("list supply requests"))?
        .into_iter()
        .map(|row| row.request)
        .collect())
}

/// A request of the caller's company.
fn owned_request(
    conn: &Connection,
    id: &str,
    company_id: &str,
) -> Result<SupplyRequestResponse, ApiErr> {
    let row = load_request(conn, id)?.map(|r| (r.company_id, r.request));
    check_company(row, company_id, "supply request")
}

/// Zero rows touched means the status moved under us.
fn ensure_updated(updated: usize) -> Result<(), ApiErr> {
    if updated == 0 {
        return Err(ApiErr::conflict("supply request was changed by someone else"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

/// POST /api/staff/supply-requests — ask for supplies at an assigned store.
pub async fn create(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateSupplyRequest>,
) -> Result<(StatusCode, Json<Envelope<SupplyRequestResponse>>), ApiErr> {
    user.require_role(STAFF_MODE)?;
    let new = service::validate_supply_request(&req)?;

    let conn = db.conn();
    assert_store_active(&conn, &req.store_id)?;
    let assigned = sq_flag(&conn, dbq::stores::is_assigned(&user.user_id, &req.store_id))
        .map_err(ApiErr::from_db("check store assignment"))?;
    if !assigned {
        return Err(ApiErr::forbidden("store is not assigned to you"));
    }

    let id = super::new_id();
    sq_execute(
        &conn,
        dbq::supply_requests::insert(&id, &req.store_id, &user.user_id, &new),
    )
    .map_err(ApiErr::from_db("insert supply request"))?;

    tracing::info!(request_id = %id, store_id = %req.store_id, "supply request received");
    let created = reload(&conn, &id)?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(created))))
}

/// GET /api/staff/supply-requests — the caller's own requests.
pub async fn list_mine(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<SupplyRequestResponse>>>, ApiErr> {
    user.require_role(STAFF_MODE)?;
    let conn = db.conn();
    let requests = list(&conn, dbq::supply_requests::list_for_user(&user.user_id))?;
    Ok(Json(Envelope::ok(requests)))
}

// ---------------------------------------------------------------------------
// Business owner
// ---------------------------------------------------------------------------

/// GET /api/business/supply-requests
///
/// By default: unarchived, and completed ones only from the last 14 days.
pub async fn list_for_company(
    State(db): State<Db>,
    user: AuthUser,
    Query(q): Query<SupplyRequestListQuery>,
) -> Result<Json<Envelope<Vec<SupplyRequestResponse>>>, ApiErr> {
    let filter = ListFilter {
        include_archived: q.include_archived.unwrap_or(false),
        archived_only: q.archived_only.unwrap_or(false),
        all_period: q.all_period.unwrap_or(false),
    };
    let cutoff = service::archive_cutoff(Utc::now());

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::SupplyRequests)?;
    let requests = list(
        &conn,
        dbq::supply_requests::list_for_company(&company_id, filter, &cutoff),
    )?;
    Ok(Json(Envelope::ok(requests)))
}

/// GET /api/business/supply-requests/received — the owner's inbox.
pub async fn list_received(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<SupplyRequestResponse>>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::SupplyRequests)?;
    let requests = list(&conn, dbq::supply_requests::list_received(&company_id))?;
    Ok(Json(Envelope::ok(requests)))
}

/// POST /api/business/supply-requests/{id}/confirm — received → in_progress.
pub async fn confirm(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<SupplyRequestResponse>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::SupplyRequests)?;
    let current = owned_request(&conn, &id, &company_id)?;
    let next = service::next_supply_status(current.status, SupplyAction::Confirm)?;

    let updated = sq_execute(
        &conn,
        dbq::supply_requests::set_status(&id, current.status, next, None),
    )
    .map_err(ApiErr::from_db("confirm supply request"))?;
    ensure_updated(updated)?;

    Ok(Json(Envelope::ok(reload(&conn, &id)?)))
}

/// POST /api/business/supply-requests/{id}/forward — hand over to the store manager.
///
/// The body, and the comment in it, are optional.
pub async fn forward(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    req: Option<ApiJson<ForwardSupplyRequest>>,
) -> Result<Json<Envelope<SupplyRequestResponse>>, ApiErr> {
    let comment = req.and_then(|ApiJson(req)| service::blank_to_none(req.manager_comment));

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::SupplyRequests)?;
    let current = owned_request(&conn, &id, &company_id)?;
    let next = service::next_supply_status(current.status, SupplyAction::Forward)?;

    let updated = sq_execute(
        &conn,
        dbq::supply_requests::set_status(&id, current.status, next, comment.as_deref()),
    )
    .map_err(ApiErr::from_db("forward supply request"))?;
    ensure_updated(updated)?;

    tracing::info!(request_id = %id, "supply request forwarded to store manager");
    Ok(Json(Envelope::ok(reload(&conn, &id)?)))
}

/// POST /api/business/supply-requests/{id}/complete — in_progress → completed.
pub async fn owner_complete(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CompleteSupplyRequest>,
) -> Result<Json<Envelope<SupplyRequestResponse>>, ApiErr> {
    let (photo, description) = service::validate_completion(&req, false)?;

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::SupplyRequests)?;
    let current = owned_request(&conn, &id, &company_id)?;
    service::next_supply_status(current.status, SupplyAction::OwnerComplete)?;

    let updated = sq_execute(
        &conn,
        dbq::supply_requests::complete(
            &id,
            current.status,
            photo.as_deref(),
            description.as_deref(),
            &sqlite_timestamp(Utc::now()),
        ),
    )
    .map_err(ApiErr::from_db("complete supply request"))?;
    ensure_updated(updated)?;

    Ok(Json(Envelope::ok(reload(&conn, &id)?)))
}

/// POST /api/business/supply-requests/archive — archive completions older than 14 days.
pub async fn archive(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<ArchiveResponse>, ApiErr> {
    let cutoff = service::archive_cutoff(Utc::now());
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::SupplyRequests)?;
    let archived_count = sq_execute(
        &conn,
        dbq::supply_requests::archive_completed_before(&company_id, &cutoff),
    )
    .map_err(ApiErr::from_db("archive supply requests"))?;

    tracing::info!(%company_id, archived_count, "supply requests archived");
    Ok(Json(ArchiveResponse {
        success: true,
        archived_count,
    }))
}

// ---------------------------------------------------------------------------
// Store manager
// ---------------------------------------------------------------------------

/// GET /api/store-manager/supply-requests — forwarded work at the manager's stores.
pub async fn list_for_manager(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<SupplyRequestResponse>>>, ApiErr> {
    user.require_role(STORE_MANAGERS)?;
    let cutoff = service::archive_cutoff(Utc::now());

    let conn = db.conn();
    let store_ids = sq_query_map(&conn, dbq::stores::assigned_store_ids(&user.user_id), |row| {
        row.get::<_, String>(0)
    })
    .map_err(ApiErr::from_db("list managed stores"))?;
    if store_ids.is_empty() {
        return Ok(Json(Envelope::ok(Vec::new())));
    }

    let refs: Vec<&str> = store_ids.iter().map(String::as_str).collect();
    let requests = list(&conn, dbq::supply_requests::list_for_manager(&refs, &cutoff))?;
    Ok(Json(Envelope::ok(requests)))
}

/// POST /api/store-manager/supply-requests/{id}/complete — needs a completion photo.
pub async fn manager_complete(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CompleteSupplyRequest>,
) -> Result<Json<Envelope<SupplyRequestResponse>>, ApiErr> {
    user.require_role(STORE_MANAGERS)?;
    let (photo, description) = service::validate_completion(&req, true)?;

    let conn = db.conn();
    let current = reload(&conn, &id)?;
    let manages = sq_flag(&conn, dbq::stores::is_assigned(&user.user_id, &current.store_id))
        .map_err(ApiErr::from_db("check store assignment"))?;
    if !manages {
        return Err(ApiErr::forbidden("you do not manage this store"));
    }
    service::next_supply_status(current.status, SupplyAction::ManagerComplete)?;

    let updated = sq_execute(
        &conn,
        dbq::supply_requests::complete(
            &id,
            current.status,
            photo.as_deref(),
            description.as_deref(),
            &sqlite_timestamp(Utc::now()),
        ),
    )
    .map_err(ApiErr::from_db("complete supply request"))?;
    ensure_updated(updated)?;

    tracing::info!(request_id = %id, "supply request completed by store manager");
    Ok(Json(Envelope::ok(reload(&conn, &id)?)))
}
