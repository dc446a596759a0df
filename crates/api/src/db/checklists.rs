//! Checklist template + instance query builders.
//!
//! A template is a row with no `template_id`, no assignee and no work date.
//! Instances point back at their template through `template_id`.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SelectStatement, SimpleExpr, SqliteQueryBuilder};

use super::tables::{Checklist, Stores};
use super::{Built, now};
use crate::ReviewStatus;

/// Columns read back into a `ChecklistResponse`, plus the owning `company_id`.
fn checklist_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        (Checklist::Table, Checklist::Id),
        (Checklist::Table, Checklist::StoreId),
        (Checklist::Table, Checklist::CreatedBy),
        (Checklist::Table, Checklist::AssignedUserId),
        (Checklist::Table, Checklist::TemplateId),
        (Checklist::Table, Checklist::WorkDate),
        (Checklist::Table, Checklist::Items),
        (Checklist::Table, Checklist::Note),
        (Checklist::Table, Checklist::RequiresPhotos),
        (Checklist::Table, Checklist::ReviewStatus),
        (Checklist::Table, Checklist::ReviewedBy),
        (Checklist::Table, Checklist::ReviewedAt),
        (Checklist::Table, Checklist::ReviewComment),
        (Checklist::Table, Checklist::CreatedAt),
        (Checklist::Table, Checklist::UpdatedAt),
    ])
    .expr_as(
        Expr::col((Stores::Table, Stores::Name)),
        Alias::new("store_name"),
    )
    .expr_as(
        Expr::col((Stores::Table, Stores::CompanyId)),
        Alias::new("company_id"),
    )
    .from(Checklist::Table)
    .inner_join(
        Stores::Table,
        Expr::col((Stores::Table, Stores::Id)).equals((Checklist::Table, Checklist::StoreId)),
    )
}

fn is_template() -> SimpleExpr {
    Expr::col((Checklist::Table, Checklist::TemplateId))
        .is_null()
        .and(Expr::col((Checklist::Table, Checklist::AssignedUserId)).is_null())
        .and(Expr::col((Checklist::Table, Checklist::WorkDate)).is_null())
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    checklist_columns(&mut q);
    q.and_where(Expr::col((Checklist::Table, Checklist::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// Templates of every live store of a company.
pub fn list_templates_by_company(company_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    checklist_columns(&mut q);
    q.and_where(Expr::col((Stores::Table, Stores::CompanyId)).eq(company_id))
        .and_where(Expr::col((Stores::Table, Stores::DeletedAt)).is_null())
        .and_where(is_template())
        .order_by((Checklist::Table, Checklist::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Templates of one store, oldest first so instances keep a stable order.
pub fn list_templates_for_store(store_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    checklist_columns(&mut q);
    q.and_where(Expr::col((Checklist::Table, Checklist::StoreId)).eq(store_id))
        .and_where(is_template())
        .order_by((Checklist::Table, Checklist::CreatedAt), Order::Asc)
        .build(SqliteQueryBuilder)
}

pub fn insert_template(
    id: &str,
    store_id: &str,
    created_by: &str,
    items_json: &str,
    note: Option<&str>,
    requires_photos: bool,
) -> Built {
    Query::insert()
        .into_table(Checklist::Table)
        .columns([
            Checklist::Id,
            Checklist::StoreId,
            Checklist::CreatedBy,
            Checklist::Items,
            Checklist::Note,
            Checklist::RequiresPhotos,
        ])
        .values_panic([
            id.into(),
            store_id.into(),
            created_by.into(),
            items_json.into(),
            note.map(|s| s.to_string()).into(),
            requires_photos.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Whether the worker already has an instance of this template for the date.
pub fn instance_exists(template_id: &str, user_id: &str, work_date: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Checklist::Table)
        .and_where(Expr::col(Checklist::TemplateId).eq(template_id))
        .and_where(Expr::col(Checklist::AssignedUserId).eq(user_id))
        .and_where(Expr::col(Checklist::WorkDate).eq(work_date))
        .build(SqliteQueryBuilder)
}

/// Column values for an instance materialized from a template.
pub struct NewInstance<'a> {
    pub id: &'a str,
    pub template_id: &'a str,
    pub store_id: &'a str,
    pub created_by: &'a str,
    pub assigned_user_id: &'a str,
    pub work_date: &'a str,
    pub items_json: &'a str,
    pub note: Option<&'a str>,
    pub requires_photos: bool,
}

pub fn insert_instance(i: &NewInstance<'_>) -> Built {
    Query::insert()
        .into_table(Checklist::Table)
        .columns([
            Checklist::Id,
            Checklist::TemplateId,
            Checklist::StoreId,
            Checklist::CreatedBy,
            Checklist::AssignedUserId,
            Checklist::WorkDate,
            Checklist::Items,
            Checklist::Note,
            Checklist::RequiresPhotos,
            Checklist::ReviewStatus,
        ])
        .values_panic([
            i.id.into(),
            i.template_id.into(),
            i.store_id.into(),
            i.created_by.into(),
            i.assigned_user_id.into(),
            i.work_date.into(),
            i.items_json.into(),
            i.note.map(|s| s.to_string()).into(),
            i.requires_photos.into(),
            ReviewStatus::Pending.as_str().into(),
        ])
        .build(SqliteQueryBuilder)
}

/// A worker's instances at the given stores on the given dates, newest first.
pub fn list_assigned_on(user_id: &str, store_ids: &[&str], dates: &[&str]) -> Built {
    let mut q = Query::select().to_owned();
    checklist_columns(&mut q);
    q.and_where(Expr::col((Checklist::Table, Checklist::AssignedUserId)).eq(user_id))
        .and_where(
            Expr::col((Checklist::Table, Checklist::StoreId)).is_in(store_ids.iter().copied()),
        )
        .and_where(Expr::col((Checklist::Table, Checklist::WorkDate)).is_in(dates.iter().copied()))
        .order_by((Checklist::Table, Checklist::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// A worker's instances at the given stores up to and including `until`.
pub fn list_assigned_until(user_id: &str, store_ids: &[&str], until: &str) -> Built {
    let mut q = Query::select().to_owned();
    checklist_columns(&mut q);
    q.and_where(Expr::col((Checklist::Table, Checklist::AssignedUserId)).eq(user_id))
        .and_where(
            Expr::col((Checklist::Table, Checklist::StoreId)).is_in(store_ids.iter().copied()),
        )
        .and_where(Expr::col((Checklist::Table, Checklist::WorkDate)).lte(until))
        .order_by((Checklist::Table, Checklist::WorkDate), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Every instance assigned to a worker on one date.
pub fn list_assigned_for_date(user_id: &str, work_date: &str) -> Built {
    let mut q = Query::select().to_owned();
    checklist_columns(&mut q);
    q.and_where(Expr::col((Checklist::Table, Checklist::AssignedUserId)).eq(user_id))
        .and_where(Expr::col((Checklist::Table, Checklist::WorkDate)).eq(work_date))
        .order_by((Checklist::Table, Checklist::CreatedAt), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Save a worker's progress. Any edit sends the checklist back for review.
pub fn update_items(id: &str, items_json: &str, note: Option<&str>) -> Built {
    let mut q = Query::update();
    q.table(Checklist::Table)
        .value(Checklist::Items, items_json)
        .value(Checklist::ReviewStatus, ReviewStatus::Pending.as_str())
        .value(Checklist::UpdatedAt, now());
    if let Some(note) = note {
        q.value(Checklist::Note, note);
    }
    q.and_where(Expr::col(Checklist::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Instances of a company's live stores in one review state, newest work date first.
pub fn list_for_review(company_id: &str, status: ReviewStatus) -> Built {
    let mut q = Query::select().to_owned();
    checklist_columns(&mut q);
    q.and_where(Expr::col((Stores::Table, Stores::CompanyId)).eq(company_id))
        .and_where(Expr::col((Stores::Table, Stores::DeletedAt)).is_null())
        .and_where(Expr::col((Checklist::Table, Checklist::TemplateId)).is_not_null())
        .and_where(Expr::col((Checklist::Table, Checklist::ReviewStatus)).eq(status.as_str()))
        .order_by((Checklist::Table, Checklist::WorkDate), Order::Desc)
        .order_by((Checklist::Table, Checklist::UpdatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Record a verdict. Only a checklist still awaiting review is touched.
pub fn review(id: &str, status: ReviewStatus, reviewer: &str, comment: Option<&str>) -> Built {
    Query::update()
        .table(Checklist::Table)
        .value(Checklist::ReviewStatus, status.as_str())
        .value(Checklist::ReviewedBy, reviewer)
        .value(Checklist::ReviewedAt, now())
        .value(Checklist::ReviewComment, comment.map(|s| s.to_string()))
        .value(Checklist::UpdatedAt, now())
        .and_where(Expr::col(Checklist::Id).eq(id))
        .and_where(Expr::col(Checklist::ReviewStatus).eq(ReviewStatus::Pending.as_str()))
        .build(SqliteQueryBuilder)
}

pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(Checklist::Table)
        .and_where(Expr::col(Checklist::Id).eq(id))
        .build(SqliteQueryBuilder)
}
