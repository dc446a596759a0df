//! Landing-site content: case studies and custom pages.

use sea_query::{
    Asterisk, Expr, Func, Order, Query, SelectStatement, SimpleExpr, SqliteQueryBuilder,
};

use super::tables::{CaseStudies, CustomPages};
use super::{Built, now};
use crate::service::{CaseStudyFields, CustomPageFields};

// ── Case studies ───────────────────────────────────────────────────────────

fn case_study_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        CaseStudies::Id,
        CaseStudies::Title,
        CaseStudies::Description,
        CaseStudies::BlogUrl,
        CaseStudies::ThumbnailUrl,
        CaseStudies::DisplayOrder,
        CaseStudies::IsActive,
        CaseStudies::CreatedAt,
        CaseStudies::UpdatedAt,
    ])
    .from(CaseStudies::Table)
}

/// Active case studies in display order, for the public site.
pub fn list_active_case_studies() -> Built {
    let mut q = Query::select().to_owned();
    case_study_columns(&mut q);
    q.and_where(Expr::col(CaseStudies::IsActive).eq(true))
        .order_by(CaseStudies::DisplayOrder, Order::Asc)
        .order_by(CaseStudies::CreatedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn list_case_studies() -> Built {
    let mut q = Query::select().to_owned();
    case_study_columns(&mut q);
    q.order_by(CaseStudies::DisplayOrder, Order::Asc)
        .order_by(CaseStudies::CreatedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn get_case_study(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    case_study_columns(&mut q);
    q.and_where(Expr::col(CaseStudies::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn insert_case_study(id: &str, f: &CaseStudyFields) -> Built {
    Query::insert()
        .into_table(CaseStudies::Table)
        .columns([
            CaseStudies::Id,
            CaseStudies::Title,
            CaseStudies::Description,
            CaseStudies::BlogUrl,
            CaseStudies::ThumbnailUrl,
            CaseStudies::DisplayOrder,
            CaseStudies::IsActive,
        ])
        .values_panic([
            id.into(),
            f.title.clone().unwrap_or_default().into(),
            f.description.clone().flatten().into(),
            f.blog_url.clone().unwrap_or_default().into(),
            f.thumbnail_url.clone().flatten().into(),
            f.display_order.unwrap_or(0).into(),
            f.is_active.unwrap_or(true).into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Partial update; `None` when nothing changes.
pub fn update_case_study(id: &str, f: &CaseStudyFields) -> Option<Built> {
    let mut values: Vec<(CaseStudies, SimpleExpr)> = Vec::new();
    if let Some(title) = &f.title {
        values.push((CaseStudies::Title, title.as_str().into()));
    }
    if let Some(description) = &f.description {
        values.push((CaseStudies::Description, description.clone().into()));
    }
    if let Some(url) = &f.blog_url {
        values.push((CaseStudies::BlogUrl, url.as_str().into()));
    }
    if let Some(thumb) = &f.thumbnail_url {
        values.push((CaseStudies::ThumbnailUrl, thumb.clone().into()));
    }
    if let Some(order) = f.display_order {
        values.push((CaseStudies::DisplayOrder, order.into()));
    }
    if let Some(active) = f.is_active {
        values.push((CaseStudies::IsActive, active.into()));
    }
    if values.is_empty() {
        return None;
    }
    values.push((CaseStudies::UpdatedAt, now()));
    Some(
        Query::update()
            .table(CaseStudies::Table)
            .values(values)
            .and_where(Expr::col(CaseStudies::Id).eq(id))
            .build(SqliteQueryBuilder),
    )
}

pub fn delete_case_study(id: &str) -> Built {
    Query::delete()
        .from_table(CaseStudies::Table)
        .and_where(Expr::col(CaseStudies::Id).eq(id))
        .build(SqliteQueryBuilder)
}

// ── Custom pages ───────────────────────────────────────────────────────────

fn page_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        CustomPages::Id,
        CustomPages::Slug,
        CustomPages::Title,
        CustomPages::Content,
        CustomPages::MetaTitle,
        CustomPages::MetaDescription,
        CustomPages::IsPublished,
        CustomPages::IsActive,
        CustomPages::CreatedAt,
        CustomPages::UpdatedAt,
    ])
    .from(CustomPages::Table)
}

/// A page visible to the public: published and active.
pub fn get_public_page(slug: &str) -> Built {
    let mut q = Query::select().to_owned();
    page_columns(&mut q);
    q.and_where(Expr::col(CustomPages::Slug).eq(slug))
        .and_where(Expr::col(CustomPages::IsPublished).eq(true))
        .and_where(Expr::col(CustomPages::IsActive).eq(true))
        .build(SqliteQueryBuilder)
}

pub fn list_pages() -> Built {
    let mut q = Query::select().to_owned();
    page_columns(&mut q);
    q.order_by(CustomPages::CreatedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn get_page(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    page_columns(&mut q);
    q.and_where(Expr::col(CustomPages::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Whether another page already uses `slug`.
pub fn slug_taken(slug: &str, except_id: Option<&str>) -> Built {
    let mut q = Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(CustomPages::Table)
        .and_where(Expr::col(CustomPages::Slug).eq(slug))
        .to_owned();
    if let Some(id) = except_id {
        q.and_where(Expr::col(CustomPages::Id).ne(id));
    }
    q.build(SqliteQueryBuilder)
}

pub fn insert_page(id: &str, f: &CustomPageFields) -> Built {
    Query::insert()
        .into_table(CustomPages::Table)
        .columns([
            CustomPages::Id,
            CustomPages::Slug,
            CustomPages::Title,
            CustomPages::Content,
            CustomPages::MetaTitle,
            CustomPages::MetaDescription,
            CustomPages::IsPublished,
            CustomPages::IsActive,
        ])
        .values_panic([
            id.into(),
            f.slug.clone().unwrap_or_default().into(),
            f.title.clone().unwrap_or_default().into(),
            f.content.clone().flatten().into(),
            f.meta_title.clone().flatten().into(),
            f.meta_description.clone().flatten().into(),
            f.is_published.unwrap_or(false).into(),
            f.is_active.unwrap_or(true).into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn update_page(id: &str, f: &CustomPageFields) -> Option<Built> {
    let mut values: Vec<(CustomPages, SimpleExpr)> = Vec::new();
    if let Some(slug) = &f.slug {
        values.push((CustomPages::Slug, slug.as_str().into()));
    }
    if let Some(title) = &f.title {
        values.push((CustomPages::Title, title.as_str().into()));
    }
    for (col, v) in [
        (CustomPages::Content, &f.content),
        (CustomPages::MetaTitle, &f.meta_title),
        (CustomPages::MetaDescription, &f.meta_description),
    ] {
        if let Some(v) = v {
            values.push((col, v.clone().into()));
        }
    }
    if let Some(published) = f.is_published {
        values.push((CustomPages::IsPublished, published.into()));
    }
    if let Some(active) = f.is_active {
        values.push((CustomPages::IsActive, active.into()));
    }
    if values.is_empty() {
        return None;
    }
    values.push((CustomPages::UpdatedAt, now()));
    Some(
        Query::update()
            .table(CustomPages::Table)
            .values(values)
            .and_where(Expr::col(CustomPages::Id).eq(id))
            .build(SqliteQueryBuilder),
    )
}

pub fn delete_page(id: &str) -> Built {
    Query::delete()
        .from_table(CustomPages::Table)
        .and_where(Expr::col(CustomPages::Id).eq(id))
        .build(SqliteQueryBuilder)
}
