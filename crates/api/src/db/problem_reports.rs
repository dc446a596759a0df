//! Problem report query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::tables::{ProblemReports, Stores, Users};
use super::{Built, now};
use crate::ProblemReportStatus;
use crate::service::NewProblemReport;

fn report_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        (ProblemReports::Table, ProblemReports::Id),
        (ProblemReports::Table, ProblemReports::StoreId),
        (ProblemReports::Table, ProblemReports::UserId),
        (ProblemReports::Table, ProblemReports::Category),
        (ProblemReports::Table, ProblemReports::Title),
        (ProblemReports::Table, ProblemReports::Description),
        (ProblemReports::Table, ProblemReports::PhotoUrl),
        (ProblemReports::Table, ProblemReports::VendingMachineNumber),
        (ProblemReports::Table, ProblemReports::ProductNumber),
        (ProblemReports::Table, ProblemReports::Status),
        (ProblemReports::Table, ProblemReports::CompletionDescription),
        (ProblemReports::Table, ProblemReports::CompletionPhotoUrls),
        (ProblemReports::Table, ProblemReports::CompletedAt),
        (ProblemReports::Table, ProblemReports::CreatedAt),
        (ProblemReports::Table, ProblemReports::UpdatedAt),
    ])
    .expr_as(
        Expr::col((Stores::Table, Stores::Name)),
        Alias::new("store_name"),
    )
    .expr_as(
        Expr::col((Stores::Table, Stores::CompanyId)),
        Alias::new("company_id"),
    )
    .expr_as(Expr::col((Users::Table, Users::Name)), Alias::new("user_name"))
    .from(ProblemReports::Table)
    .inner_join(
        Stores::Table,
        Expr::col((Stores::Table, Stores::Id))
            .equals((ProblemReports::Table, ProblemReports::StoreId)),
    )
    .left_join(
        Users::Table,
        Expr::col((Users::Table, Users::Id)).equals((ProblemReports::Table, ProblemReports::UserId)),
    )
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    report_columns(&mut q);
    q.and_where(Expr::col((ProblemReports::Table, ProblemReports::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn list_for_user(user_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    report_columns(&mut q);
    q.and_where(Expr::col((ProblemReports::Table, ProblemReports::UserId)).eq(user_id))
        .order_by((ProblemReports::Table, ProblemReports::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn list_for_store(store_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    report_columns(&mut q);
    q.and_where(Expr::col((ProblemReports::Table, ProblemReports::StoreId)).eq(store_id))
        .order_by((ProblemReports::Table, ProblemReports::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Whether a report was filed at the store. Used to check emergency clock-ins.
pub fn exists_at_store(id: &str, store_id: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(ProblemReports::Table)
        .and_where(Expr::col(ProblemReports::Id).eq(id))
        .and_where(Expr::col(ProblemReports::StoreId).eq(store_id))
        .build(SqliteQueryBuilder)
}

pub fn insert(id: &str, store_id: &str, user_id: &str, report: &NewProblemReport) -> Built {
    Query::insert()
        .into_table(ProblemReports::Table)
        .columns([
            ProblemReports::Id,
            ProblemReports::StoreId,
            ProblemReports::UserId,
            ProblemReports::Category,
            ProblemReports::Title,
            ProblemReports::Description,
            ProblemReports::PhotoUrl,
            ProblemReports::VendingMachineNumber,
            ProblemReports::ProductNumber,
            ProblemReports::Status,
        ])
        .values_panic([
            id.into(),
            store_id.into(),
            user_id.into(),
            report.category.as_str().into(),
            report.title.as_str().into(),
            report.description.clone().into(),
            report.photo_url.clone().into(),
            report.vending_machine_number.into(),
            report.product_number.clone().into(),
            ProblemReportStatus::Submitted.as_str().into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Close a submitted report, optionally with completion evidence.
pub fn complete(id: &str, description: Option<&str>, photo_urls_json: Option<&str>) -> Built {
    let mut q = Query::update();
    q.table(ProblemReports::Table)
        .value(ProblemReports::Status, ProblemReportStatus::Completed.as_str())
        .value(ProblemReports::CompletedAt, now())
        .value(ProblemReports::UpdatedAt, now());
    if let Some(description) = description {
        q.value(ProblemReports::CompletionDescription, description);
    }
    if let Some(urls) = photo_urls_json {
        q.value(ProblemReports::CompletionPhotoUrls, urls);
    }
    q.and_where(Expr::col(ProblemReports::Id).eq(id))
        .and_where(
            Expr::col(ProblemReports::Status).eq(ProblemReportStatus::Submitted.as_str()),
        )
        .build(SqliteQueryBuilder)
}
