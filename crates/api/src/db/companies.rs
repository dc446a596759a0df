//! Company query builders.

use sea_query::{
    Asterisk, Expr, Func, Order, Query, SelectStatement, SimpleExpr, SqliteQueryBuilder,
};

use super::tables::Companies;
use super::{Built, now};
use crate::service::CompanyFields;
use crate::{SubscriptionPlan, SubscriptionStatus, UserRole};

/// Columns read back into a `CompanyResponse`.
pub fn company_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        Companies::Id,
        Companies::Name,
        Companies::Address,
        Companies::BusinessRegistrationNumber,
        Companies::SubscriptionPlan,
        Companies::SubscriptionStatus,
        Companies::TrialEndsAt,
        Companies::BasicUnits,
        Companies::PremiumUnits,
        Companies::SignupCode,
        Companies::SignupCodeActive,
        Companies::RequiresApproval,
        Companies::DefaultRole,
        Companies::CreatedAt,
        Companies::UpdatedAt,
    ])
}

/// Live (not soft-deleted) company by id.
pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    company_columns(&mut q);
    q.from(Companies::Table)
        .and_where(Expr::col(Companies::Id).eq(id))
        .and_where(Expr::col(Companies::DeletedAt).is_null())
        .build(SqliteQueryBuilder)
}

pub fn list_all() -> Built {
    let mut q = Query::select().to_owned();
    company_columns(&mut q);
    q.from(Companies::Table)
        .and_where(Expr::col(Companies::DeletedAt).is_null())
        .order_by(Companies::CreatedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Company with an active signup code, matched case-insensitively.
pub fn find_by_signup_code(code: &str) -> Built {
    Query::select()
        .columns([
            Companies::Id,
            Companies::Name,
            Companies::RequiresApproval,
            Companies::DefaultRole,
        ])
        .from(Companies::Table)
        .and_where(
            Expr::expr(Func::upper(Expr::col(Companies::SignupCode))).eq(code.to_uppercase()),
        )
        .and_where(Expr::col(Companies::SignupCodeActive).eq(true))
        .and_where(Expr::col(Companies::DeletedAt).is_null())
        .limit(1)
        .build(SqliteQueryBuilder)
}

/// Whether another live company holds `code`, active or not.
pub fn signup_code_taken(code: &str, except_id: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Companies::Table)
        .and_where(
            Expr::expr(Func::upper(Expr::col(Companies::SignupCode))).eq(code.to_uppercase()),
        )
        .and_where(Expr::col(Companies::Id).ne(except_id))
        .and_where(Expr::col(Companies::DeletedAt).is_null())
        .build(SqliteQueryBuilder)
}

/// Company created by an owner's self signup: free trial, code inactive.
pub fn insert_trial(
    id: &str,
    name: &str,
    extra: &CompanyExtras<'_>,
    trial_ends_at: &str,
) -> Built {
    Query::insert()
        .into_table(Companies::Table)
        .columns([
            Companies::Id,
            Companies::Name,
            Companies::Address,
            Companies::BusinessRegistrationNumber,
            Companies::SubscriptionPlan,
            Companies::SubscriptionStatus,
            Companies::TrialEndsAt,
            Companies::BasicUnits,
            Companies::PremiumUnits,
            Companies::SignupCodeActive,
            Companies::RequiresApproval,
            Companies::DefaultRole,
        ])
        .values_panic([
            id.into(),
            name.into(),
            extra.address.map(|s| s.to_string()).into(),
            extra.registration_number.map(|s| s.to_string()).into(),
            SubscriptionPlan::Free.as_str().into(),
            SubscriptionStatus::Active.as_str().into(),
            trial_ends_at.into(),
            crate::plan::SIGNUP_BASIC_UNITS.into(),
            0i64.into(),
            false.into(),
            true.into(),
            UserRole::Staff.as_str().into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Platform-admin create. Unset plan/status fall back to the column defaults.
pub fn insert(id: &str, name: &str, fields: &CompanyFields, extra: &CompanyExtras<'_>) -> Built {
    Query::insert()
        .into_table(Companies::Table)
        .columns([
            Companies::Id,
            Companies::Name,
            Companies::Address,
            Companies::BusinessRegistrationNumber,
            Companies::SubscriptionPlan,
            Companies::SubscriptionStatus,
            Companies::TrialEndsAt,
            Companies::BasicUnits,
            Companies::PremiumUnits,
        ])
        .values_panic([
            id.into(),
            name.into(),
            extra.address.map(|s| s.to_string()).into(),
            extra.registration_number.map(|s| s.to_string()).into(),
            fields.plan.unwrap_or_default().as_str().into(),
            fields.status.unwrap_or_default().as_str().into(),
            extra.trial_ends_at.map(|s| s.to_string()).into(),
            fields.basic_units.unwrap_or(0).into(),
            fields.premium_units.unwrap_or(0).into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Free-text company fields that need no validation beyond blank → NULL.
#[derive(Debug, Default)]
pub struct CompanyExtras<'a> {
    pub address: Option<&'a str>,
    pub registration_number: Option<&'a str>,
    pub trial_ends_at: Option<&'a str>,
}

/// Platform-admin partial update. `None` fields are left untouched.
///
/// `address`, `registration_number` and `trial_ends_at` use `Some(None)` to clear.
pub fn update(id: &str, fields: &CompanyFields, extra: &CompanyPatch) -> Option<Built> {
    let mut values: Vec<(Companies, SimpleExpr)> = Vec::new();
    if let Some(name) = &fields.name {
        values.push((Companies::Name, name.as_str().into()));
    }
    if let Some(plan) = fields.plan {
        values.push((Companies::SubscriptionPlan, plan.as_str().into()));
    }
    if let Some(status) = fields.status {
        values.push((Companies::SubscriptionStatus, status.as_str().into()));
    }
    if let Some(n) = fields.basic_units {
        values.push((Companies::BasicUnits, n.into()));
    }
    if let Some(n) = fields.premium_units {
        values.push((Companies::PremiumUnits, n.into()));
    }
    push_nullable(&mut values, Companies::Address, &extra.address);
    push_nullable(
        &mut values,
        Companies::BusinessRegistrationNumber,
        &extra.registration_number,
    );
    push_nullable(&mut values, Companies::TrialEndsAt, &extra.trial_ends_at);
    build_update(id, values)
}

/// Nullable text columns of a partial update: outer `None` leaves them alone.
#[derive(Debug, Default)]
pub struct CompanyPatch {
    pub address: Option<Option<String>>,
    pub registration_number: Option<Option<String>>,
    pub trial_ends_at: Option<Option<String>>,
}

/// Owner-editable settings of their own company.
#[derive(Debug, Default)]
pub struct OwnCompanyPatch {
    pub name: Option<String>,
    pub address: Option<Option<String>>,
    pub registration_number: Option<Option<String>>,
    pub signup_code: Option<Option<String>>,
    pub signup_code_active: Option<bool>,
    pub requires_approval: Option<bool>,
    pub default_role: Option<UserRole>,
}

pub fn update_own(id: &str, patch: &OwnCompanyPatch) -> Option<Built> {
    let mut values: Vec<(Companies, SimpleExpr)> = Vec::new();
    if let Some(name) = &patch.name {
        values.push((Companies::Name, name.as_str().into()));
    }
    push_nullable(&mut values, Companies::Address, &patch.address);
    push_nullable(
        &mut values,
        Companies::BusinessRegistrationNumber,
        &patch.registration_number,
    );
    push_nullable(&mut values, Companies::SignupCode, &patch.signup_code);
    if let Some(active) = patch.signup_code_active {
        values.push((Companies::SignupCodeActive, active.into()));
    }
    if let Some(required) = patch.requires_approval {
        values.push((Companies::RequiresApproval, required.into()));
    }
    if let Some(role) = patch.default_role {
        values.push((Companies::DefaultRole, role.as_str().into()));
    }
    build_update(id, values)
}

/// Soft delete.
pub fn soft_delete(id: &str) -> Built {
    Query::update()
        .table(Companies::Table)
        .value(Companies::DeletedAt, now())
        .value(Companies::UpdatedAt, now())
        .and_where(Expr::col(Companies::Id).eq(id))
        .and_where(Expr::col(Companies::DeletedAt).is_null())
        .build(SqliteQueryBuilder)
}

fn push_nullable(
    values: &mut Vec<(Companies, SimpleExpr)>,
    col: Companies,
    patch: &Option<Option<String>>,
) {
    if let Some(v) = patch {
        values.push((col, v.clone().into()));
    }
}

fn build_update(id: &str, mut values: Vec<(Companies, SimpleExpr)>) -> Option<Built> {
    if values.is_empty() {
        return None;
    }
    values.push((Companies::UpdatedAt, now()));
    Some(
        Query::update()
            .table(Companies::Table)
            .values(values)
            .and_where(Expr::col(Companies::Id).eq(id))
            .and_where(Expr::col(Companies::DeletedAt).is_null())
            .build(SqliteQueryBuilder),
    )
}
