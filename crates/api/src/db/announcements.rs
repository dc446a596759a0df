//! Announcement + read receipt query builders.

use sea_query::{
    Alias, Asterisk, Expr, Func, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder,
};

use super::Built;
use super::tables::{AnnouncementReads, Announcements, Users};
use crate::{AnnouncementAudience, UserRole};

fn announcement_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        (Announcements::Table, Announcements::Id),
        (Announcements::Table, Announcements::CompanyId),
        (Announcements::Table, Announcements::Title),
        (Announcements::Table, Announcements::Content),
        (Announcements::Table, Announcements::Audience),
        (Announcements::Table, Announcements::CreatedBy),
        (Announcements::Table, Announcements::CreatedAt),
    ])
    .expr_as(
        Expr::col((Users::Table, Users::Name)),
        Alias::new("created_by_name"),
    )
    .from(Announcements::Table)
    .left_join(
        Users::Table,
        Expr::col((Users::Table, Users::Id))
            .equals((Announcements::Table, Announcements::CreatedBy)),
    )
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    announcement_columns(&mut q);
    q.and_where(Expr::col((Announcements::Table, Announcements::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// Company announcements with a `read_count` column, newest first.
pub fn list_for_company(company_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    announcement_columns(&mut q);
    q.expr_as(
        Func::count(Expr::col((
            AnnouncementReads::Table,
            AnnouncementReads::UserId,
        ))),
        Alias::new("read_count"),
    )
    .left_join(
        AnnouncementReads::Table,
        Expr::col((AnnouncementReads::Table, AnnouncementReads::AnnouncementId))
            .equals((Announcements::Table, Announcements::Id)),
    )
    .and_where(Expr::col((Announcements::Table, Announcements::CompanyId)).eq(company_id))
    .group_by_col((Announcements::Table, Announcements::Id))
    .order_by((Announcements::Table, Announcements::CreatedAt), Order::Desc)
    .build(SqliteQueryBuilder)
}

/// Roles an audience reaches inside a company.
pub fn audience_roles(audience: AnnouncementAudience) -> &'static [UserRole] {
    match audience {
        AnnouncementAudience::Staff => &[
            UserRole::Staff,
            UserRole::SubcontractIndividual,
            UserRole::SubcontractCompany,
        ],
        AnnouncementAudience::Owner => &[UserRole::Manager, UserRole::StoreManager],
    }
}

/// Approved company users an audience reaches.
pub fn count_audience(company_id: &str, audience: AnnouncementAudience) -> Built {
    Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Users::Table)
        .and_where(Expr::col(Users::CompanyId).eq(company_id))
        .and_where(
            Expr::col(Users::Role).is_in(audience_roles(audience).iter().map(|r| r.as_str())),
        )
        .and_where(Expr::col(Users::ApprovalStatus).eq(crate::ApprovalStatus::Approved.as_str()))
        .build(SqliteQueryBuilder)
}

/// One audience's announcements with the caller's `read_at` (NULL when unread).
pub fn list_for_reader(company_id: &str, audience: AnnouncementAudience, user_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    announcement_columns(&mut q);
    q.expr_as(
        Expr::col((AnnouncementReads::Table, AnnouncementReads::ReadAt)),
        Alias::new("read_at"),
    )
    .left_join(
        AnnouncementReads::Table,
        Expr::col((AnnouncementReads::Table, AnnouncementReads::AnnouncementId))
            .equals((Announcements::Table, Announcements::Id))
            .and(Expr::col((AnnouncementReads::Table, AnnouncementReads::UserId)).eq(user_id)),
    )
    .and_where(Expr::col((Announcements::Table, Announcements::CompanyId)).eq(company_id))
    .and_where(
        Expr::col((Announcements::Table, Announcements::Audience))
            .eq(audience.as_str()),
    )
    .order_by((Announcements::Table, Announcements::CreatedAt), Order::Desc)
    .build(SqliteQueryBuilder)
}

pub fn insert(
    id: &str,
    company_id: &str,
    title: &str,
    content: &str,
    audience: AnnouncementAudience,
    created_by: &str,
) -> Built {
    Query::insert()
        .into_table(Announcements::Table)
        .columns([
            Announcements::Id,
            Announcements::CompanyId,
            Announcements::Title,
            Announcements::Content,
            Announcements::Audience,
            Announcements::CreatedBy,
        ])
        .values_panic([
            id.into(),
            company_id.into(),
            title.into(),
            content.into(),
            audience.as_str().into(),
            created_by.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Delete scoped to the company; read receipts cascade.
pub fn delete(id: &str, company_id: &str) -> Built {
    Query::delete()
        .from_table(Announcements::Table)
        .and_where(Expr::col(Announcements::Id).eq(id))
        .and_where(Expr::col(Announcements::CompanyId).eq(company_id))
        .build(SqliteQueryBuilder)
}

/// Record a read. The first read time is kept on repeats.
pub fn mark_read(announcement_id: &str, user_id: &str) -> Built {
    Query::insert()
        .into_table(AnnouncementReads::Table)
        .columns([AnnouncementReads::AnnouncementId, AnnouncementReads::UserId])
        .values_panic([announcement_id.into(), user_id.into()])
        .on_conflict(
            OnConflict::columns([AnnouncementReads::AnnouncementId, AnnouncementReads::UserId])
                .do_nothing()
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}
