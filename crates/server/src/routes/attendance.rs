use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use rusqlite::Connection;

use cleanops_api::{
    AttendanceResponse, ClockInRequest, ClockOutRequest, Envelope, FieldErrors, ServiceError,
    db as dbq,
    format::{sqlite_timestamp, today_kst, yesterday_kst},
    service::{self, OpenShift},
};

use super::auth::AuthUser;
use super::{FIELD_WORKERS, STAFF_MODE, assert_store_active};
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{
    Db, attendance_from_row, is_constraint_violation, sq_execute, sq_flag, sq_query_map,
    sq_query_row,
};

fn load_attendance(conn: &Connection, id: &str) -> Result<AttendanceResponse, ApiErr> {
    sq_query_row(conn, dbq::attendance::get_by_id(id), attendance_from_row)
        .map_err(ApiErr::from_db("load attendance"))
}

fn require_assignment(conn: &Connection, user_id: &str, store_id: &str) -> Result<(), ApiErr> {
    let assigned = sq_flag(conn, dbq::stores::is_assigned(user_id, store_id))
        .map_err(ApiErr::from_db("check store assignment"))?;
    if !assigned {
        return Err(ApiErr::forbidden("store is not assigned to you"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Clock in
// ---------------------------------------------------------------------------

/// POST /api/attendance/clock-in — start a shift at an assigned store.
pub async fn clock_in(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<ClockInRequest>,
) -> Result<(StatusCode, Json<Envelope<AttendanceResponse>>), ApiErr> {
    user.require_role(FIELD_WORKERS)?;
    service::validate_clock_in(&req)?;

    let now = Utc::now();
    let today = today_kst(now);
    let yesterday = yesterday_kst(now);
    let conn = db.conn();

    assert_store_active(&conn, &req.store_id)?;
    require_assignment(&conn, &user.user_id, &req.store_id)?;
    if let Some(report_id) = req.problem_report_id.as_deref() {
        let known = sq_flag(
            &conn,
            dbq::problem_reports::exists_at_store(report_id, &req.store_id),
        )
        .map_err(ApiErr::from_db("check problem report"))?;
        if !known {
            let mut errs = FieldErrors::default();
            errs.push("problem_report_id", "no such problem report at this store");
            return Err(ServiceError::Invalid(errs).into());
        }
    }

    let has_open = sq_flag(
        &conn,
        dbq::attendance::has_open_shift(&user.user_id, &[today.as_str(), yesterday.as_str()]),
    )
    .map_err(ApiErr::from_db("check open shifts"))?;
    let has_store_shift = sq_flag(
        &conn,
        dbq::attendance::has_store_shift(&user.user_id, &req.store_id, &today, &yesterday),
    )
    .map_err(ApiErr::from_db("check store shift"))?;
    service::check_clock_in(has_open, has_store_shift)?;

    let id = super::new_id();
    let clock_in_at = sqlite_timestamp(now);
    let insert = dbq::attendance::insert(&dbq::attendance::NewAttendance {
        id: &id,
        user_id: &user.user_id,
        store_id: &req.store_id,
        work_date: &today,
        clock_in_at: &clock_in_at,
        latitude: req.location.lat,
        longitude: req.location.lng,
        selfie_url: req.selfie_url.as_deref(),
        attendance_type: req.attendance_type,
        scheduled_date: req.scheduled_date.as_deref(),
        problem_report_id: req.problem_report_id.as_deref(),
        change_reason: req.change_reason.as_deref(),
    });
    sq_execute(&conn, insert).map_err(|e| {
        if is_constraint_violation(&e) {
            ApiErr::from(ServiceError::AlreadyClockedIn(
                "already clocked in at this store".into(),
            ))
        } else {
            tracing::error!("insert attendance: {e}");
            ApiErr::internal("internal server error")
        }
    })?;

    tracing::info!(user_id = %user.user_id, store_id = %req.store_id, work_date = %today, "clocked in");
    let record = load_attendance(&conn, &id)?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(record))))
}

// ---------------------------------------------------------------------------
// Clock out
// ---------------------------------------------------------------------------

/// POST /api/attendance/clock-out — close the caller's open shift at a store.
pub async fn clock_out(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<ClockOutRequest>,
) -> Result<Json<Envelope<AttendanceResponse>>, ApiErr> {
    user.require_role(FIELD_WORKERS)?;
    service::validate_clock_out(&req)?;

    let now = Utc::now();
    let today = today_kst(now);
    let yesterday = yesterday_kst(now);
    let conn = db.conn();

    assert_store_active(&conn, &req.store_id)?;

    let open = sq_query_map(
        &conn,
        dbq::attendance::open_at_store(&user.user_id, &req.store_id),
        |row| {
            Ok(OpenShift {
                id: row.get("id")?,
                work_date: row.get("work_date")?,
            })
        },
    )
    .map_err(ApiErr::from_db("list open shifts"))?;

    let Some(shift) = service::pick_clock_out_shift(&open, &today, &yesterday) else {
        let closed_today = sq_flag(
            &conn,
            dbq::attendance::has_closed_shift(&user.user_id, &req.store_id, &today),
        )
        .map_err(ApiErr::from_db("check closed shift"))?;
        if closed_today {
            return Err(ServiceError::AlreadyClockedOut("already clocked out today".into()).into());
        }
        return Err(ApiErr::not_found("no open attendance at this store"));
    };

    let updated = sq_execute(
        &conn,
        dbq::attendance::clock_out(
            &shift.id,
            &sqlite_timestamp(now),
            req.location.lat,
            req.location.lng,
        ),
    )
    .map_err(ApiErr::from_db("clock out"))?;
    if updated == 0 {
        return Err(ServiceError::AlreadyClockedOut("already clocked out".into()).into());
    }

    tracing::info!(user_id = %user.user_id, store_id = %req.store_id, work_date = %shift.work_date, "clocked out");
    let record = load_attendance(&conn, &shift.id)?;
    Ok(Json(Envelope::ok(record)))
}

// ---------------------------------------------------------------------------
// Recent attendance
// ---------------------------------------------------------------------------

/// GET /api/staff/attendance — today's and yesterday's records, newest first.
pub async fn list_recent(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<AttendanceResponse>>>, ApiErr> {
    user.require_role(STAFF_MODE)?;
    let now = Utc::now();
    let (today, yesterday) = (today_kst(now), yesterday_kst(now));

    let conn = db.conn();
    let records = sq_query_map(
        &conn,
        dbq::attendance::list_for_user_on(&user.user_id, &[today.as_str(), yesterday.as_str()]),
        attendance_from_row,
    )
    .map_err(ApiErr::from_db("list attendance"))?;
    Ok(Json(Envelope::ok(records)))
}
