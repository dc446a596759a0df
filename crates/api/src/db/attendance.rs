//! Attendance (clock-in / clock-out) query builders.

use sea_query::{Alias, Asterisk, Cond, Expr, Func, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::tables::{Attendance, Stores};
use super::{Built, now};
use crate::AttendanceType;

/// Columns read back into an `AttendanceResponse` (needs the stores join).
fn attendance_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        (Attendance::Table, Attendance::Id),
        (Attendance::Table, Attendance::UserId),
        (Attendance::Table, Attendance::StoreId),
        (Attendance::Table, Attendance::WorkDate),
        (Attendance::Table, Attendance::ClockInAt),
        (Attendance::Table, Attendance::ClockInLatitude),
        (Attendance::Table, Attendance::ClockInLongitude),
        (Attendance::Table, Attendance::ClockOutAt),
        (Attendance::Table, Attendance::ClockOutLatitude),
        (Attendance::Table, Attendance::ClockOutLongitude),
        (Attendance::Table, Attendance::SelfieUrl),
        (Attendance::Table, Attendance::AttendanceType),
        (Attendance::Table, Attendance::ScheduledDate),
        (Attendance::Table, Attendance::ProblemReportId),
        (Attendance::Table, Attendance::ChangeReason),
    ])
    .expr_as(
        Expr::col((Stores::Table, Stores::Name)),
        Alias::new("store_name"),
    )
    .from(Attendance::Table)
    .left_join(
        Stores::Table,
        Expr::col((Stores::Table, Stores::Id)).equals((Attendance::Table, Attendance::StoreId)),
    )
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    attendance_columns(&mut q);
    q.and_where(Expr::col((Attendance::Table, Attendance::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// A user's attendance on the given work dates, newest clock-in first.
pub fn list_for_user_on(user_id: &str, dates: &[&str]) -> Built {
    let mut q = Query::select().to_owned();
    attendance_columns(&mut q);
    q.and_where(Expr::col((Attendance::Table, Attendance::UserId)).eq(user_id))
        .and_where(Expr::col((Attendance::Table, Attendance::WorkDate)).is_in(dates.iter().copied()))
        .order_by((Attendance::Table, Attendance::ClockInAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Whether the user has any shift still open on `dates`.
pub fn has_open_shift(user_id: &str, dates: &[&str]) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Attendance::Table)
        .and_where(Expr::col(Attendance::UserId).eq(user_id))
        .and_where(Expr::col(Attendance::WorkDate).is_in(dates.iter().copied()))
        .and_where(Expr::col(Attendance::ClockOutAt).is_null())
        .build(SqliteQueryBuilder)
}

/// Whether the store already has a shift of this user today, or an open one yesterday.
pub fn has_store_shift(user_id: &str, store_id: &str, today: &str, yesterday: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Attendance::Table)
        .and_where(Expr::col(Attendance::UserId).eq(user_id))
        .and_where(Expr::col(Attendance::StoreId).eq(store_id))
        .cond_where(
            Cond::any()
                .add(Expr::col(Attendance::WorkDate).eq(today))
                .add(
                    Cond::all()
                        .add(Expr::col(Attendance::WorkDate).eq(yesterday))
                        .add(Expr::col(Attendance::ClockOutAt).is_null()),
                ),
        )
        .build(SqliteQueryBuilder)
}

/// Open shifts of the user at a store (id, work_date), newest clock-in first.
pub fn open_at_store(user_id: &str, store_id: &str) -> Built {
    Query::select()
        .columns([Attendance::Id, Attendance::WorkDate])
        .from(Attendance::Table)
        .and_where(Expr::col(Attendance::UserId).eq(user_id))
        .and_where(Expr::col(Attendance::StoreId).eq(store_id))
        .and_where(Expr::col(Attendance::ClockOutAt).is_null())
        .order_by(Attendance::ClockInAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Open shifts of the user on `dates` (store_id, work_date).
pub fn open_shifts_on(user_id: &str, dates: &[&str]) -> Built {
    Query::select()
        .columns([Attendance::StoreId, Attendance::WorkDate])
        .from(Attendance::Table)
        .and_where(Expr::col(Attendance::UserId).eq(user_id))
        .and_where(Expr::col(Attendance::WorkDate).is_in(dates.iter().copied()))
        .and_where(Expr::col(Attendance::ClockOutAt).is_null())
        .order_by(Attendance::ClockInAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Whether the user already finished a shift at the store on `date`.
pub fn has_closed_shift(user_id: &str, store_id: &str, date: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Attendance::Table)
        .and_where(Expr::col(Attendance::UserId).eq(user_id))
        .and_where(Expr::col(Attendance::StoreId).eq(store_id))
        .and_where(Expr::col(Attendance::WorkDate).eq(date))
        .and_where(Expr::col(Attendance::ClockOutAt).is_not_null())
        .build(SqliteQueryBuilder)
}

/// Column values for a new clock-in.
pub struct NewAttendance<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub store_id: &'a str,
    pub work_date: &'a str,
    pub clock_in_at: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub selfie_url: Option<&'a str>,
    pub attendance_type: AttendanceType,
    pub scheduled_date: Option<&'a str>,
    pub problem_report_id: Option<&'a str>,
    pub change_reason: Option<&'a str>,
}

pub fn insert(a: &NewAttendance<'_>) -> Built {
    let opt = |v: Option<&str>| v.map(|s| s.to_string());
    Query::insert()
        .into_table(Attendance::Table)
        .columns([
            Attendance::Id,
            Attendance::UserId,
            Attendance::StoreId,
            Attendance::WorkDate,
            Attendance::ClockInAt,
            Attendance::ClockInLatitude,
            Attendance::ClockInLongitude,
            Attendance::SelfieUrl,
            Attendance::AttendanceType,
            Attendance::ScheduledDate,
            Attendance::ProblemReportId,
            Attendance::ChangeReason,
        ])
        .values_panic([
            a.id.into(),
            a.user_id.into(),
            a.store_id.into(),
            a.work_date.into(),
            a.clock_in_at.into(),
            a.latitude.into(),
            a.longitude.into(),
            opt(a.selfie_url).into(),
            a.attendance_type.as_str().into(),
            opt(a.scheduled_date).into(),
            opt(a.problem_report_id).into(),
            opt(a.change_reason).into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Close an open shift. No-op when it was closed concurrently.
pub fn clock_out(id: &str, at: &str, latitude: f64, longitude: f64) -> Built {
    Query::update()
        .table(Attendance::Table)
        .value(Attendance::ClockOutAt, at)
        .value(Attendance::ClockOutLatitude, latitude)
        .value(Attendance::ClockOutLongitude, longitude)
        .value(Attendance::UpdatedAt, now())
        .and_where(Expr::col(Attendance::Id).eq(id))
        .and_where(Expr::col(Attendance::ClockOutAt).is_null())
        .build(SqliteQueryBuilder)
}
