//! Supply request query builders.

use sea_query::{Alias, Cond, Expr, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::tables::{Stores, SupplyRequests, Users};
use super::{Built, now};
use crate::SupplyRequestStatus;
use crate::service::NewSupplyRequest;

/// Columns read back into a `SupplyRequestResponse`, plus the store's `company_id`.
fn supply_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        (SupplyRequests::Table, SupplyRequests::Id),
        (SupplyRequests::Table, SupplyRequests::StoreId),
        (SupplyRequests::Table, SupplyRequests::UserId),
        (SupplyRequests::Table, SupplyRequests::Title),
        (SupplyRequests::Table, SupplyRequests::Description),
        (SupplyRequests::Table, SupplyRequests::Category),
        (SupplyRequests::Table, SupplyRequests::PhotoUrl),
        (SupplyRequests::Table, SupplyRequests::Status),
        (SupplyRequests::Table, SupplyRequests::ManagerComment),
        (SupplyRequests::Table, SupplyRequests::CompletionPhotoUrl),
        (SupplyRequests::Table, SupplyRequests::CompletionDescription),
        (SupplyRequests::Table, SupplyRequests::CompletedAt),
        (SupplyRequests::Table, SupplyRequests::IsArchived),
        (SupplyRequests::Table, SupplyRequests::CreatedAt),
        (SupplyRequests::Table, SupplyRequests::UpdatedAt),
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
    .from(SupplyRequests::Table)
    .inner_join(
        Stores::Table,
        Expr::col((Stores::Table, Stores::Id))
            .equals((SupplyRequests::Table, SupplyRequests::StoreId)),
    )
    .left_join(
        Users::Table,
        Expr::col((Users::Table, Users::Id)).equals((SupplyRequests::Table, SupplyRequests::UserId)),
    )
}

/// Not completed, or completed at or after `cutoff`.
fn recent(cutoff: &str) -> Cond {
    Cond::any()
        .add(
            Expr::col((SupplyRequests::Table, SupplyRequests::Status))
                .ne(SupplyRequestStatus::Completed.as_str()),
        )
        .add(Expr::col((SupplyRequests::Table, SupplyRequests::CompletedAt)).gte(cutoff))
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    supply_columns(&mut q);
    q.and_where(Expr::col((SupplyRequests::Table, SupplyRequests::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// Requests filed by one user, newest first.
pub fn list_for_user(user_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    supply_columns(&mut q);
    q.and_where(Expr::col((SupplyRequests::Table, SupplyRequests::UserId)).eq(user_id))
        .order_by((SupplyRequests::Table, SupplyRequests::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Owner list filters. The default hides archived rows and old completions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub include_archived: bool,
    pub archived_only: bool,
    pub all_period: bool,
}

pub fn list_for_company(company_id: &str, filter: ListFilter, cutoff: &str) -> Built {
    let mut q = Query::select().to_owned();
    supply_columns(&mut q);
    q.and_where(Expr::col((Stores::Table, Stores::CompanyId)).eq(company_id));
    let archived = Expr::col((SupplyRequests::Table, SupplyRequests::IsArchived));
    if filter.archived_only {
        q.and_where(archived.eq(true));
    } else if !filter.include_archived {
        q.and_where(archived.eq(false));
    }
    if !filter.all_period && !filter.archived_only {
        q.cond_where(recent(cutoff));
    }
    q.order_by((SupplyRequests::Table, SupplyRequests::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// New requests waiting for the owner.
pub fn list_received(company_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    supply_columns(&mut q);
    q.and_where(Expr::col((Stores::Table, Stores::CompanyId)).eq(company_id))
        .and_where(
            Expr::col((SupplyRequests::Table, SupplyRequests::Status))
                .eq(SupplyRequestStatus::Received.as_str()),
        )
        .and_where(Expr::col((SupplyRequests::Table, SupplyRequests::IsArchived)).eq(false))
        .order_by((SupplyRequests::Table, SupplyRequests::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Store-manager queue: forwarded requests plus recent completions of their stores.
pub fn list_for_manager(store_ids: &[&str], cutoff: &str) -> Built {
    let mut q = Query::select().to_owned();
    supply_columns(&mut q);
    let status = || Expr::col((SupplyRequests::Table, SupplyRequests::Status));
    q.and_where(
        Expr::col((SupplyRequests::Table, SupplyRequests::StoreId))
            .is_in(store_ids.iter().copied()),
    )
    .cond_where(
        Cond::any()
            .add(status().eq(SupplyRequestStatus::ManagerInProgress.as_str()))
            .add(
                Cond::all()
                    .add(status().eq(SupplyRequestStatus::Completed.as_str()))
                    .add(
                        Expr::col((SupplyRequests::Table, SupplyRequests::CompletedAt))
                            .gte(cutoff),
                    ),
            ),
    )
    .order_by((SupplyRequests::Table, SupplyRequests::CreatedAt), Order::Desc)
    .build(SqliteQueryBuilder)
}

pub fn insert(id: &str, store_id: &str, user_id: &str, req: &NewSupplyRequest) -> Built {
    Query::insert()
        .into_table(SupplyRequests::Table)
        .columns([
            SupplyRequests::Id,
            SupplyRequests::StoreId,
            SupplyRequests::UserId,
            SupplyRequests::Title,
            SupplyRequests::Description,
            SupplyRequests::Category,
            SupplyRequests::PhotoUrl,
            SupplyRequests::Status,
        ])
        .values_panic([
            id.into(),
            store_id.into(),
            user_id.into(),
            req.title.as_str().into(),
            req.description.clone().into(),
            req.category.as_str().into(),
            req.photo_url.clone().into(),
            SupplyRequestStatus::Received.as_str().into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Move a request from `from` to `to`. Matches nothing if the status changed meanwhile.
pub fn set_status(
    id: &str,
    from: SupplyRequestStatus,
    to: SupplyRequestStatus,
    manager_comment: Option<&str>,
) -> Built {
    let mut q = Query::update();
    q.table(SupplyRequests::Table)
        .value(SupplyRequests::Status, to.as_str())
        .value(SupplyRequests::UpdatedAt, now());
    if let Some(comment) = manager_comment {
        q.value(SupplyRequests::ManagerComment, comment);
    }
    q.and_where(Expr::col(SupplyRequests::Id).eq(id))
        .and_where(Expr::col(SupplyRequests::Status).eq(from.as_str()))
        .build(SqliteQueryBuilder)
}

/// Close a request with the completion evidence.
pub fn complete(
    id: &str,
    from: SupplyRequestStatus,
    completion_photo_url: Option<&str>,
    completion_description: Option<&str>,
    completed_at: &str,
) -> Built {
    Query::update()
        .table(SupplyRequests::Table)
        .value(SupplyRequests::Status, SupplyRequestStatus::Completed.as_str())
        .value(
            SupplyRequests::CompletionPhotoUrl,
            completion_photo_url.map(|s| s.to_string()),
        )
        .value(
            SupplyRequests::CompletionDescription,
            completion_description.map(|s| s.to_string()),
        )
        .value(SupplyRequests::CompletedAt, completed_at)
        .value(SupplyRequests::UpdatedAt, now())
        .and_where(Expr::col(SupplyRequests::Id).eq(id))
        .and_where(Expr::col(SupplyRequests::Status).eq(from.as_str()))
        .build(SqliteQueryBuilder)
}

/// Archive a company's completed requests finished before `cutoff`.
pub fn archive_completed_before(company_id: &str, cutoff: &str) -> Built {
    let company_stores = Query::select()
        .column(Stores::Id)
        .from(Stores::Table)
        .and_where(Expr::col(Stores::CompanyId).eq(company_id))
        .to_owned();
    Query::update()
        .table(SupplyRequests::Table)
        .value(SupplyRequests::IsArchived, true)
        .value(SupplyRequests::UpdatedAt, now())
        .and_where(Expr::col(SupplyRequests::StoreId).in_subquery(company_stores))
        .and_where(Expr::col(SupplyRequests::Status).eq(SupplyRequestStatus::Completed.as_str()))
        .and_where(Expr::col(SupplyRequests::IsArchived).eq(false))
        .and_where(Expr::col(SupplyRequests::CompletedAt).lt(cutoff))
        .build(SqliteQueryBuilder)
}
