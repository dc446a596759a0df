use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use cleanops_api::{
    CompleteProblemReportRequest, CreateProblemReportRequest, Envelope, Feature, OkResponse,
    ProblemReportResponse, StoreProblemReportsResponse, db as dbq, service,
};

use super::auth::AuthUser;
use super::{OWNERS, STAFF_MODE, assert_store_active, business_scope, check_company};
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{
    Db, problem_report_from_row, sq_execute, sq_flag, sq_query_map, sq_query_opt, store_from_row,
};

fn company_report(
    conn: &Connection,
    id: &str,
    company_id: &str,
) -> Result<ProblemReportResponse, ApiErr> {
    let row = sq_query_opt(conn, dbq::problem_reports::get_by_id(id), problem_report_from_row)
        .map_err(ApiErr::from_db("load problem report"))?
        .map(|r| (r.company_id, r.report));
    let report = check_company(row, company_id, "problem report")?;
    service::check_problem_report_open(report.status)?;
    Ok(report)
}

fn ensure_closed(updated: usize) -> Result<(), ApiErr> {
    if updated == 0 {
        return Err(ApiErr::conflict("problem report was closed by someone else"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Field workers
// ---------------------------------------------------------------------------

/// POST /api/staff/problem-reports — report a store or vending machine problem.
pub async fn create(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateProblemReportRequest>,
) -> Result<(StatusCode, Json<Envelope<ProblemReportResponse>>), ApiErr> {
    user.require_role(STAFF_MODE)?;
    let report = service::validate_problem_report(&req)?;

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
        dbq::problem_reports::insert(&id, &req.store_id, &user.user_id, &report),
    )
    .map_err(ApiErr::from_db("insert problem report"))?;
    tracing::info!(report_id = %id, store_id = %req.store_id, category = %report.category, "problem reported");

    let created = sq_query_opt(&conn, dbq::problem_reports::get_by_id(&id), problem_report_from_row)
        .map_err(ApiErr::from_db("load problem report"))?
        .ok_or_else(|| ApiErr::internal("problem report vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(created.report))))
}

/// GET /api/staff/problem-reports
pub async fn list_mine(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<ProblemReportResponse>>>, ApiErr> {
    user.require_role(STAFF_MODE)?;
    let conn = db.conn();
    let reports = sq_query_map(
        &conn,
        dbq::problem_reports::list_for_user(&user.user_id),
        problem_report_from_row,
    )
    .map_err(ApiErr::from_db("list problem reports"))?
    .into_iter()
    .map(|row| row.report)
    .collect();
    Ok(Json(Envelope::ok(reports)))
}

// ---------------------------------------------------------------------------
// Business owner
// ---------------------------------------------------------------------------

/// GET /api/business/stores/{id}/problem-reports — split into store and vending problems.
pub async fn list_for_store(
    State(db): State<Db>,
    user: AuthUser,
    Path(store_id): Path<String>,
) -> Result<Json<Envelope<StoreProblemReportsResponse>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Reports)?;
    let store = sq_query_opt(&conn, dbq::stores::get_by_id(&store_id), store_from_row)
        .map_err(ApiErr::from_db("load store"))?
        .map(|s| (s.company_id.clone(), s));
    check_company(store, &company_id, "store")?;

    let reports = sq_query_map(
        &conn,
        dbq::problem_reports::list_for_store(&store_id),
        problem_report_from_row,
    )
    .map_err(ApiErr::from_db("list problem reports"))?
    .into_iter()
    .map(|row| row.report)
    .collect();
    Ok(Json(Envelope::ok(service::group_problem_reports(reports))))
}

/// PATCH /api/business/problem-reports/{id}/confirm — close without notes.
pub async fn confirm(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Reports)?;
    company_report(&conn, &id, &company_id)?;

    let updated = sq_execute(&conn, dbq::problem_reports::complete(&id, None, None))
        .map_err(ApiErr::from_db("confirm problem report"))?;
    ensure_closed(updated)?;
    tracing::info!(report_id = %id, "problem report confirmed");
    Ok(Json(OkResponse::ok()))
}

/// PATCH /api/business/problem-reports/{id}/complete — close with a note and photos.
pub async fn complete(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CompleteProblemReportRequest>,
) -> Result<Json<Envelope<ProblemReportResponse>>, ApiErr> {
    let (description, photos) = service::validate_problem_completion(&req)?;
    let photos_json =
        serde_json::to_string(&photos).map_err(ApiErr::from_db("encode completion photos"))?;

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Reports)?;
    company_report(&conn, &id, &company_id)?;

    let updated = sq_execute(
        &conn,
        dbq::problem_reports::complete(&id, description.as_deref(), Some(&photos_json)),
    )
    .map_err(ApiErr::from_db("complete problem report"))?;
    ensure_closed(updated)?;
    tracing::info!(report_id = %id, photos = photos.len(), "problem report completed");

    let completed = sq_query_opt(&conn, dbq::problem_reports::get_by_id(&id), problem_report_from_row)
        .map_err(ApiErr::from_db("load problem report"))?
        .ok_or_else(|| ApiErr::not_found("problem report not found"))?;
    Ok(Json(Envelope::ok(completed.report)))
}
