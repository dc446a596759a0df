//! Lost item query builders.

use sea_query::{Alias, Expr, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::tables::{LostItems, Stores, Users};
use super::{Built, now};
use crate::LostItemStatus;
use crate::service::NewLostItem;

fn lost_item_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        (LostItems::Table, LostItems::Id),
        (LostItems::Table, LostItems::StoreId),
        (LostItems::Table, LostItems::UserId),
        (LostItems::Table, LostItems::ItemType),
        (LostItems::Table, LostItems::Description),
        (LostItems::Table, LostItems::PhotoUrl),
        (LostItems::Table, LostItems::StorageLocation),
        (LostItems::Table, LostItems::Status),
        (LostItems::Table, LostItems::CreatedAt),
        (LostItems::Table, LostItems::UpdatedAt),
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
    .from(LostItems::Table)
    .inner_join(
        Stores::Table,
        Expr::col((Stores::Table, Stores::Id)).equals((LostItems::Table, LostItems::StoreId)),
    )
    .left_join(
        Users::Table,
        Expr::col((Users::Table, Users::Id)).equals((LostItems::Table, LostItems::UserId)),
    )
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    lost_item_columns(&mut q);
    q.and_where(Expr::col((LostItems::Table, LostItems::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn list_for_user(user_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    lost_item_columns(&mut q);
    q.and_where(Expr::col((LostItems::Table, LostItems::UserId)).eq(user_id))
        .order_by((LostItems::Table, LostItems::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn list_for_company(company_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    lost_item_columns(&mut q);
    q.and_where(Expr::col((Stores::Table, Stores::CompanyId)).eq(company_id))
        .order_by((LostItems::Table, LostItems::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn insert(id: &str, store_id: &str, user_id: &str, item: &NewLostItem) -> Built {
    Query::insert()
        .into_table(LostItems::Table)
        .columns([
            LostItems::Id,
            LostItems::StoreId,
            LostItems::UserId,
            LostItems::ItemType,
            LostItems::Description,
            LostItems::PhotoUrl,
            LostItems::StorageLocation,
            LostItems::Status,
        ])
        .values_panic([
            id.into(),
            store_id.into(),
            user_id.into(),
            item.item_type.as_str().into(),
            item.description.clone().into(),
            item.photo_url.clone().into(),
            item.storage_location.as_str().into(),
            LostItemStatus::Submitted.as_str().into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Owner confirms the item was handled. Touches nothing unless still submitted.
pub fn confirm(id: &str) -> Built {
    Query::update()
        .table(LostItems::Table)
        .value(LostItems::Status, LostItemStatus::Completed.as_str())
        .value(LostItems::UpdatedAt, now())
        .and_where(Expr::col(LostItems::Id).eq(id))
        .and_where(Expr::col(LostItems::Status).eq(LostItemStatus::Submitted.as_str()))
        .build(SqliteQueryBuilder)
}
