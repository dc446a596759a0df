use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde_json::{Value, json};

use cleanops_api::{
    CaseStudyRequest, CaseStudyResponse, CustomPageRequest, CustomPageResponse, Envelope,
    OkResponse, db as dbq, service,
};

use super::LANDING_ADMINS;
use super::auth::AuthUser;
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{
    Db, case_study_from_row, page_from_row, sq_execute, sq_flag, sq_query_map, sq_query_opt,
};

fn load_case_study(conn: &Connection, id: &str) -> Result<CaseStudyResponse, ApiErr> {
    sq_query_opt(conn, dbq::landing::get_case_study(id), case_study_from_row)
        .map_err(ApiErr::from_db("load case study"))?
        .ok_or_else(|| ApiErr::not_found("case study not found"))
}

fn load_page(conn: &Connection, id: &str) -> Result<CustomPageResponse, ApiErr> {
    sq_query_opt(conn, dbq::landing::get_page(id), page_from_row)
        .map_err(ApiErr::from_db("load page"))?
        .ok_or_else(|| ApiErr::not_found("page not found"))
}

fn ensure_slug_free(conn: &Connection, slug: &str, except_id: Option<&str>) -> Result<(), ApiErr> {
    let taken = sq_flag(conn, dbq::landing::slug_taken(slug, except_id))
        .map_err(ApiErr::from_db("check slug"))?;
    if taken {
        return Err(ApiErr::conflict("slug already in use"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

/// GET /api/case-studies — active entries in display order.
pub async fn public_case_studies(
    State(db): State<Db>,
) -> Result<Json<Envelope<Vec<CaseStudyResponse>>>, ApiErr> {
    let conn = db.conn();
    let items = sq_query_map(&conn, dbq::landing::list_active_case_studies(), case_study_from_row)
        .map_err(ApiErr::from_db("list case studies"))?;
    Ok(Json(Envelope::ok(items)))
}

/// GET /api/pages/{slug}
pub async fn public_page(
    State(db): State<Db>,
    Path(slug): Path<String>,
) -> Result<Json<Envelope<CustomPageResponse>>, ApiErr> {
    let conn = db.conn();
    let page = sq_query_opt(&conn, dbq::landing::get_public_page(&slug), page_from_row)
        .map_err(ApiErr::from_db("load page"))?
        .ok_or_else(|| ApiErr::not_found("page not found"))?;
    Ok(Json(Envelope::ok(page)))
}

/// GET /manifest.json — installable staff app.
pub async fn manifest() -> Json<Value> {
    Json(json!({
        "name": "CleanOps",
        "short_name": "CleanOps",
        "description": "Cleaning operations for field staff",
        "start_url": "/mobile-dashboard",
        "display": "standalone",
        "background_color": "#ffffff",
        "theme_color": "#2563eb",
        "orientation": "portrait",
        "icons": [],
        "categories": ["business", "productivity"],
    }))
}

// ---------------------------------------------------------------------------
// Admin: case studies
// ---------------------------------------------------------------------------

/// GET /api/admin/case-studies
pub async fn list_case_studies(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<CaseStudyResponse>>>, ApiErr> {
    user.require_role(LANDING_ADMINS)?;
    let conn = db.conn();
    let items = sq_query_map(&conn, dbq::landing::list_case_studies(), case_study_from_row)
        .map_err(ApiErr::from_db("list case studies"))?;
    Ok(Json(Envelope::ok(items)))
}

/// POST /api/admin/case-studies
pub async fn create_case_study(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CaseStudyRequest>,
) -> Result<(StatusCode, Json<Envelope<CaseStudyResponse>>), ApiErr> {
    user.require_role(LANDING_ADMINS)?;
    let fields = service::validate_case_study(&req, true)?;

    let conn = db.conn();
    let id = super::new_id();
    sq_execute(&conn, dbq::landing::insert_case_study(&id, &fields))
        .map_err(ApiErr::from_db("insert case study"))?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(load_case_study(&conn, &id)?))))
}

/// PUT /api/admin/case-studies/{id} — partial update.
pub async fn update_case_study(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CaseStudyRequest>,
) -> Result<Json<Envelope<CaseStudyResponse>>, ApiErr> {
    user.require_role(LANDING_ADMINS)?;
    let fields = service::validate_case_study(&req, false)?;

    let conn = db.conn();
    let current = load_case_study(&conn, &id)?;
    let Some(update) = dbq::landing::update_case_study(&id, &fields) else {
        return Ok(Json(Envelope::ok(current)));
    };
    sq_execute(&conn, update).map_err(ApiErr::from_db("update case study"))?;
    Ok(Json(Envelope::ok(load_case_study(&conn, &id)?)))
}

/// DELETE /api/admin/case-studies/{id}
pub async fn delete_case_study(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    user.require_role(LANDING_ADMINS)?;
    let conn = db.conn();
    let deleted = sq_execute(&conn, dbq::landing::delete_case_study(&id))
        .map_err(ApiErr::from_db("delete case study"))?;
    if deleted == 0 {
        return Err(ApiErr::not_found("case study not found"));
    }
    Ok(Json(OkResponse::ok()))
}

// ---------------------------------------------------------------------------
// Admin: custom pages
// ---------------------------------------------------------------------------

/// GET /api/admin/pages
pub async fn list_pages(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<CustomPageResponse>>>, ApiErr> {
    user.require_role(LANDING_ADMINS)?;
    let conn = db.conn();
    let pages = sq_query_map(&conn, dbq::landing::list_pages(), page_from_row)
        .map_err(ApiErr::from_db("list pages"))?;
    Ok(Json(Envelope::ok(pages)))
}

/// POST /api/admin/pages
pub async fn create_page(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CustomPageRequest>,
) -> Result<(StatusCode, Json<Envelope<CustomPageResponse>>), ApiErr> {
    user.require_role(LANDING_ADMINS)?;
    let fields = service::validate_custom_page(&req, true)?;

    let conn = db.conn();
    if let Some(slug) = &fields.slug {
        ensure_slug_free(&conn, slug, None)?;
    }
    let id = super::new_id();
    sq_execute(&conn, dbq::landing::insert_page(&id, &fields))
        .map_err(ApiErr::from_db("insert page"))?;

    tracing::info!(page_id = %id, slug = ?fields.slug, "page created");
    Ok((StatusCode::CREATED, Json(Envelope::ok(load_page(&conn, &id)?))))
}

/// PUT /api/admin/pages/{id}
pub async fn update_page(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CustomPageRequest>,
) -> Result<Json<Envelope<CustomPageResponse>>, ApiErr> {
    user.require_role(LANDING_ADMINS)?;
    let fields = service::validate_custom_page(&req, false)?;

    let conn = db.conn();
    let current = load_page(&conn, &id)?;
    if let Some(slug) = fields.slug.as_deref().filter(|s| *s != current.slug) {
        ensure_slug_free(&conn, slug, Some(&id))?;
    }
    let Some(update) = dbq::landing::update_page(&id, &fields) else {
        return Ok(Json(Envelope::ok(current)));
    };
    sq_execute(&conn, update).map_err(ApiErr::from_db("update page"))?;
    Ok(Json(Envelope::ok(load_page(&conn, &id)?)))
}

/// DELETE /api/admin/pages/{id}
pub async fn delete_page(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    user.require_role(LANDING_ADMINS)?;
    let conn = db.conn();
    let deleted = sq_execute(&conn, dbq::landing::delete_page(&id))
        .map_err(ApiErr::from_db("delete page"))?;
    if deleted == 0 {
        return Err(ApiErr::not_found("page not found"));
    }
    Ok(Json(OkResponse::ok()))
}
