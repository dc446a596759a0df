//! Store + assignment query builders.

use sea_query::{
    Alias, Asterisk, Expr, Func, Order, Query, SelectStatement, SimpleExpr, SqliteQueryBuilder,
};

use super::tables::{Attendance, StoreAssign, Stores, Users};
use super::{Built, now};

/// Columns read back into a `StoreResponse`.
pub fn store_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        (Stores::Table, Stores::Id),
        (Stores::Table, Stores::CompanyId),
        (Stores::Table, Stores::Name),
        (Stores::Table, Stores::Address),
        (Stores::Table, Stores::ManagementDays),
        (Stores::Table, Stores::ServiceActive),
        (Stores::Table, Stores::IsNightShift),
        (Stores::Table, Stores::WorkStartHour),
        (Stores::Table, Stores::WorkEndHour),
        (Stores::Table, Stores::CreatedAt),
        (Stores::Table, Stores::UpdatedAt),
    ])
}

fn live() -> SimpleExpr {
    Expr::col((Stores::Table, Stores::DeletedAt)).is_null()
}

/// Live store by id.
pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    store_columns(&mut q);
    q.from(Stores::Table)
        .and_where(Expr::col((Stores::Table, Stores::Id)).eq(id))
        .and_where(live())
        .build(SqliteQueryBuilder)
}

pub fn list_by_company(company_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    store_columns(&mut q);
    q.from(Stores::Table)
        .and_where(Expr::col((Stores::Table, Stores::CompanyId)).eq(company_id))
        .and_where(live())
        .order_by((Stores::Table, Stores::Name), Order::Asc)
        .build(SqliteQueryBuilder)
}

pub fn list_all() -> Built {
    let mut q = Query::select().to_owned();
    store_columns(&mut q);
    q.from(Stores::Table)
        .and_where(live())
        .order_by((Stores::Table, Stores::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Stores assigned to a user. Adds `is_clocked_in` when `open_on` dates are given.
pub fn list_assigned(user_id: &str, open_on: Option<[&str; 2]>) -> Built {
    let mut q = Query::select().to_owned();
    store_columns(&mut q);
    if let Some([today, yesterday]) = open_on {
        let open = Query::select()
            .expr(Expr::val(1))
            .from(Attendance::Table)
            .and_where(
                Expr::col((Attendance::Table, Attendance::StoreId))
                    .equals((Stores::Table, Stores::Id)),
            )
            .and_where(Expr::col((Attendance::Table, Attendance::UserId)).eq(user_id))
            .and_where(Expr::col((Attendance::Table, Attendance::ClockOutAt)).is_null())
            .and_where(
                Expr::col((Attendance::Table, Attendance::WorkDate)).is_in([today, yesterday]),
            )
            .to_owned();
        q.expr_as(Expr::exists(open), Alias::new("is_clocked_in"));
    }
    q.from(Stores::Table)
        .inner_join(
            StoreAssign::Table,
            Expr::col((StoreAssign::Table, StoreAssign::StoreId)).equals((Stores::Table, Stores::Id)),
        )
        .and_where(Expr::col((StoreAssign::Table, StoreAssign::UserId)).eq(user_id))
        .and_where(live())
        .order_by((Stores::Table, Stores::Name), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Ids of the live stores assigned to a user.
pub fn assigned_store_ids(user_id: &str) -> Built {
    Query::select()
        .column((StoreAssign::Table, StoreAssign::StoreId))
        .from(StoreAssign::Table)
        .inner_join(
            Stores::Table,
            Expr::col((Stores::Table, Stores::Id)).equals((StoreAssign::Table, StoreAssign::StoreId)),
        )
        .and_where(Expr::col((StoreAssign::Table, StoreAssign::UserId)).eq(user_id))
        .and_where(live())
        .build(SqliteQueryBuilder)
}

/// `1` when the user is assigned to the store.
pub fn is_assigned(user_id: &str, store_id: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(StoreAssign::Table)
        .and_where(Expr::col(StoreAssign::UserId).eq(user_id))
        .and_where(Expr::col(StoreAssign::StoreId).eq(store_id))
        .build(SqliteQueryBuilder)
}

/// Validated store fields. `None` leaves a column alone on update.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreFields {
    pub name: Option<String>,
    pub address: Option<Option<String>>,
    pub management_days: Option<Option<String>>,
    pub service_active: Option<bool>,
    pub is_night_shift: Option<bool>,
    pub work_start_hour: Option<i64>,
    pub work_end_hour: Option<i64>,
}

pub fn insert(id: &str, company_id: &str, name: &str, fields: &StoreFields) -> Built {
    Query::insert()
        .into_table(Stores::Table)
        .columns([
            Stores::Id,
            Stores::CompanyId,
            Stores::Name,
            Stores::Address,
            Stores::ManagementDays,
            Stores::ServiceActive,
            Stores::IsNightShift,
            Stores::WorkStartHour,
            Stores::WorkEndHour,
        ])
        .values_panic([
            id.into(),
            company_id.into(),
            name.into(),
            fields.address.clone().flatten().into(),
            fields.management_days.clone().flatten().into(),
            fields.service_active.unwrap_or(true).into(),
            fields.is_night_shift.unwrap_or(false).into(),
            fields.work_start_hour.unwrap_or(9).into(),
            fields.work_end_hour.unwrap_or(18).into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Partial update; `None` when there is nothing to change.
pub fn update(id: &str, fields: &StoreFields) -> Option<Built> {
    let mut values: Vec<(Stores, SimpleExpr)> = Vec::new();
    if let Some(name) = &fields.name {
        values.push((Stores::Name, name.as_str().into()));
    }
    if let Some(address) = &fields.address {
        values.push((Stores::Address, address.clone().into()));
    }
    if let Some(days) = &fields.management_days {
        values.push((Stores::ManagementDays, days.clone().into()));
    }
    if let Some(active) = fields.service_active {
        values.push((Stores::ServiceActive, active.into()));
    }
    if let Some(night) = fields.is_night_shift {
        values.push((Stores::IsNightShift, night.into()));
    }
    if let Some(h) = fields.work_start_hour {
        values.push((Stores::WorkStartHour, h.into()));
    }
    if let Some(h) = fields.work_end_hour {
        values.push((Stores::WorkEndHour, h.into()));
    }
    if values.is_empty() {
        return None;
    }
    values.push((Stores::UpdatedAt, now()));
    Some(
        Query::update()
            .table(Stores::Table)
            .values(values)
            .and_where(Expr::col(Stores::Id).eq(id))
            .and_where(Expr::col(Stores::DeletedAt).is_null())
            .build(SqliteQueryBuilder),
    )
}

/// Soft delete.
pub fn soft_delete(id: &str) -> Built {
    Query::update()
        .table(Stores::Table)
        .value(Stores::DeletedAt, now())
        .value(Stores::UpdatedAt, now())
        .and_where(Expr::col(Stores::Id).eq(id))
        .and_where(Expr::col(Stores::DeletedAt).is_null())
        .build(SqliteQueryBuilder)
}

// ── Assignments ───────────────────────────────────────────────────────────

pub fn clear_store_assignments(store_id: &str) -> Built {
    Query::delete()
        .from_table(StoreAssign::Table)
        .and_where(Expr::col(StoreAssign::StoreId).eq(store_id))
        .build(SqliteQueryBuilder)
}

pub fn clear_user_assignments(user_id: &str) -> Built {
    Query::delete()
        .from_table(StoreAssign::Table)
        .and_where(Expr::col(StoreAssign::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

pub fn assign(user_id: &str, store_id: &str) -> Built {
    Query::insert()
        .into_table(StoreAssign::Table)
        .columns([StoreAssign::UserId, StoreAssign::StoreId])
        .values_panic([user_id.into(), store_id.into()])
        .on_conflict(
            sea_query::OnConflict::columns([StoreAssign::UserId, StoreAssign::StoreId])
                .do_nothing()
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}

/// How many of `user_ids` belong to the company.
pub fn count_company_users(company_id: &str, user_ids: &[String]) -> Built {
    Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Users::Table)
        .and_where(Expr::col(Users::CompanyId).eq(company_id))
        .and_where(Expr::col(Users::Id).is_in(user_ids.iter().map(String::as_str)))
        .build(SqliteQueryBuilder)
}

/// How many of `store_ids` are live stores of the company.
pub fn count_company_stores(company_id: &str, store_ids: &[String]) -> Built {
    Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Stores::Table)
        .and_where(Expr::col(Stores::CompanyId).eq(company_id))
        .and_where(Expr::col(Stores::Id).is_in(store_ids.iter().map(String::as_str)))
        .and_where(Expr::col(Stores::DeletedAt).is_null())
        .build(SqliteQueryBuilder)
}
