use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use cleanops_api::{
    AnnouncementAudience, AnnouncementResponse, CreateAnnouncementRequest, Envelope, Feature,
    FieldErrors, MarkReadRequest, OkResponse, db as dbq, service,
};

use super::auth::AuthUser;
use super::{COMPANY_ADMINS, STAFF_MODE, business_scope, check_company};
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{
    Db, announcement_from_row, sq_execute, sq_query_map, sq_query_opt, sq_query_row,
};

// ---------------------------------------------------------------------------
// Business side
// ---------------------------------------------------------------------------

/// GET /api/business/announcements — with read counts and audience sizes.
pub async fn list_for_company(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<AnnouncementResponse>>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Announcements)?;

    let audience_size = |audience| {
        sq_query_row(
            &conn,
            dbq::announcements::count_audience(&company_id, audience),
            |row| row.get::<_, i64>(0),
        )
        .map_err(ApiErr::from_db("count announcement audience"))
    };
    let staff_total = audience_size(AnnouncementAudience::Staff)?;
    let owner_total = audience_size(AnnouncementAudience::Owner)?;

    let announcements = sq_query_map(
        &conn,
        dbq::announcements::list_for_company(&company_id),
        |row| {
            let mut a = announcement_from_row(row)?;
            a.read_count = Some(row.get("read_count")?);
            Ok(a)
        },
    )
    .map_err(ApiErr::from_db("list announcements"))?
    .into_iter()
    .map(|mut a| {
        a.total_users = Some(match a.audience {
            AnnouncementAudience::Staff => staff_total,
            AnnouncementAudience::Owner => owner_total,
        });
        a
    })
    .collect();
    Ok(Json(Envelope::ok(announcements)))
}

/// POST /api/business/announcements
pub async fn create(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Envelope<AnnouncementResponse>>), ApiErr> {
    let (title, content) = service::validate_announcement(&req)?;

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Announcements)?;
    let id = super::new_id();
    sq_execute(
        &conn,
        dbq::announcements::insert(&id, &company_id, &title, &content, req.audience, &user.user_id),
    )
    .map_err(ApiErr::from_db("insert announcement"))?;

    tracing::info!(announcement_id = %id, audience = %req.audience, "announcement posted");
    let created = sq_query_row(&conn, dbq::announcements::get_by_id(&id), announcement_from_row)
        .map_err(ApiErr::from_db("load announcement"))?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(created))))
}

/// DELETE /api/business/announcements/{id}
pub async fn delete(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Announcements)?;
    let row = sq_query_opt(&conn, dbq::announcements::get_by_id(&id), announcement_from_row)
        .map_err(ApiErr::from_db("load announcement"))?
        .map(|a| (a.company_id.clone(), a));
    check_company(row, &company_id, "announcement")?;

    sq_execute(&conn, dbq::announcements::delete(&id, &company_id))
        .map_err(ApiErr::from_db("delete announcement"))?;
    Ok(Json(OkResponse::ok()))
}

// ---------------------------------------------------------------------------
// Reader side
// ---------------------------------------------------------------------------

/// GET /api/staff/announcements — staff-audience posts with the caller's read state.
pub async fn list_for_staff(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<AnnouncementResponse>>>, ApiErr> {
    user.require_role(STAFF_MODE)?;
    reader_feed(&db, &user, AnnouncementAudience::Staff)
}

/// POST /api/staff/announcements/read — idempotent read receipt.
pub async fn mark_read(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<MarkReadRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    user.require_role(STAFF_MODE)?;
    record_read(&db, &user, &req, AnnouncementAudience::Staff)
}

/// GET /api/manager/announcements — owner-audience posts for managers.
pub async fn list_for_manager(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<AnnouncementResponse>>>, ApiErr> {
    user.require_role(dbq::announcements::audience_roles(AnnouncementAudience::Owner))?;
    reader_feed(&db, &user, AnnouncementAudience::Owner)
}

/// POST /api/manager/announcements — read receipt for an owner-audience post.
pub async fn manager_mark_read(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<MarkReadRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    user.require_role(dbq::announcements::audience_roles(AnnouncementAudience::Owner))?;
    record_read(&db, &user, &req, AnnouncementAudience::Owner)
}

fn reader_feed(
    db: &Db,
    user: &AuthUser,
    audience: AnnouncementAudience,
) -> Result<Json<Envelope<Vec<AnnouncementResponse>>>, ApiErr> {
    let company_id = user.company_id()?;
    let conn = db.conn();
    let announcements = sq_query_map(
        &conn,
        dbq::announcements::list_for_reader(company_id, audience, &user.user_id),
        |row| {
            let mut a = announcement_from_row(row)?;
            let read_at: Option<String> = row.get("read_at")?;
            a.is_read = Some(read_at.is_some());
            a.read_at = read_at;
            Ok(a)
        },
    )
    .map_err(ApiErr::from_db("list announcements"))?;
    Ok(Json(Envelope::ok(announcements)))
}

fn record_read(
    db: &Db,
    user: &AuthUser,
    req: &MarkReadRequest,
    audience: AnnouncementAudience,
) -> Result<Json<OkResponse>, ApiErr> {
    let mut errs = FieldErrors::default();
    service::check_uuid(&mut errs, "announcement_id", &req.announcement_id);
    errs.into_result()?;
    let company_id = user.company_id()?;

    let conn = db.conn();
    let announcement = sq_query_opt(
        &conn,
        dbq::announcements::get_by_id(&req.announcement_id),
        announcement_from_row,
    )
    .map_err(ApiErr::from_db("load announcement"))?
    .ok_or_else(|| ApiErr::not_found("announcement not found"))?;
    if announcement.company_id != company_id || announcement.audience != audience {
        return Err(ApiErr::forbidden("announcement is not addressed to you"));
    }

    sq_execute(
        &conn,
        dbq::announcements::mark_read(&req.announcement_id, &user.user_id),
    )
    .map_err(ApiErr::from_db("mark announcement read"))?;
    Ok(Json(OkResponse::ok()))
}
