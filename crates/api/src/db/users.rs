//! User / auth query builders.

use sea_query::{
    Asterisk, Expr, Func, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder,
};

use super::tables::{RefreshTokens, UserSensitive, Users};
use super::{Built, now};
use crate::{ApprovalStatus, SignupType, UserRole};

// ── User columns helper ───────────────────────────────────────────────────

/// Columns read back into a `UserResponse`.
pub fn user_columns(q: &mut SelectStatement) -> &mut SelectStatement {
    q.columns([
        (Users::Table, Users::Id),
        (Users::Table, Users::Email),
        (Users::Table, Users::Name),
        (Users::Table, Users::Phone),
        (Users::Table, Users::Role),
        (Users::Table, Users::CompanyId),
        (Users::Table, Users::ApprovalStatus),
        (Users::Table, Users::ApprovedAt),
        (Users::Table, Users::RejectionReason),
        (Users::Table, Users::EmploymentActive),
        (Users::Table, Users::SignupType),
        (Users::Table, Users::CreatedAt),
    ])
}

// ── User lookups ───────────────────────────────────────────────────────────

/// Find user by id.
pub fn get_by_id(user_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    user_columns(&mut q);
    q.from(Users::Table)
        .and_where(Expr::col((Users::Table, Users::Id)).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Find user by email for login (id, name, role, password_hash, password_salt).
pub fn get_by_email_for_login(email: &str) -> Built {
    Query::select()
        .columns([
            Users::Id,
            Users::Name,
            Users::Role,
            Users::PasswordHash,
            Users::PasswordSalt,
        ])
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// Check email existence.
pub fn email_exists(email: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// Users of a company, newest first.
pub fn list_by_company(company_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    user_columns(&mut q);
    q.from(Users::Table)
        .and_where(Expr::col((Users::Table, Users::CompanyId)).eq(company_id))
        .order_by((Users::Table, Users::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Join requests of a company still awaiting a decision.
pub fn list_pending_by_company(company_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    user_columns(&mut q);
    q.from(Users::Table)
        .and_where(Expr::col((Users::Table, Users::CompanyId)).eq(company_id))
        .and_where(
            Expr::col((Users::Table, Users::ApprovalStatus)).eq(ApprovalStatus::Pending.as_str()),
        )
        .order_by((Users::Table, Users::CreatedAt), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Every account on the platform.
pub fn list_all() -> Built {
    let mut q = Query::select().to_owned();
    user_columns(&mut q);
    q.from(Users::Table)
        .order_by((Users::Table, Users::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Self-signed-up business owners waiting for platform approval.
pub fn list_pending_owners() -> Built {
    let mut q = Query::select().to_owned();
    user_columns(&mut q);
    q.from(Users::Table)
        .and_where(Expr::col((Users::Table, Users::Role)).eq(UserRole::BusinessOwner.as_str()))
        .and_where(
            Expr::col((Users::Table, Users::SignupType)).eq(SignupType::OwnerSelfSignup.as_str()),
        )
        .and_where(
            Expr::col((Users::Table, Users::ApprovalStatus)).eq(ApprovalStatus::Pending.as_str()),
        )
        .order_by((Users::Table, Users::CreatedAt), Order::Asc)
        .build(SqliteQueryBuilder)
}

// ── User inserts ───────────────────────────────────────────────────────────

/// Column values for a new account.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub password_salt: &'a str,
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub role: UserRole,
    pub company_id: &'a str,
    pub approval_status: ApprovalStatus,
    pub signup_type: SignupType,
}

/// Insert user with email/password. Approved accounts start employed.
pub fn insert(user: &NewUser<'_>) -> Built {
    let approved = user.approval_status == ApprovalStatus::Approved;
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::Id,
            Users::Email,
            Users::PasswordHash,
            Users::PasswordSalt,
            Users::Name,
            Users::Phone,
            Users::Role,
            Users::CompanyId,
            Users::ApprovalStatus,
            Users::EmploymentActive,
            Users::SignupType,
        ])
        .values_panic([
            user.id.into(),
            user.email.into(),
            user.password_hash.into(),
            user.password_salt.into(),
            user.name.into(),
            user.phone.map(|s| s.to_string()).into(),
            user.role.as_str().into(),
            user.company_id.into(),
            user.approval_status.as_str().into(),
            approved.into(),
            user.signup_type.as_str().into(),
        ])
        .build(SqliteQueryBuilder)
}

// ── User updates ───────────────────────────────────────────────────────────

/// Update password.
pub fn update_password(user_id: &str, password_hash: &str, password_salt: &str) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::PasswordHash, password_hash)
        .value(Users::PasswordSalt, password_salt)
        .value(Users::UpdatedAt, now())
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Get password hash/salt for a user.
pub fn get_password_fields(user_id: &str) -> Built {
    Query::select()
        .columns([Users::PasswordHash, Users::PasswordSalt])
        .from(Users::Table)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Approve a pending account, optionally changing its role.
///
/// Guarded on `pending` so a concurrent decision cannot be overwritten.
pub fn approve(user_id: &str, role: Option<UserRole>, approved_by: &str) -> Built {
    let mut q = Query::update();
    q.table(Users::Table)
        .value(Users::ApprovalStatus, ApprovalStatus::Approved.as_str())
        .value(Users::ApprovedAt, now())
        .value(Users::ApprovedBy, approved_by)
        .value(Users::EmploymentActive, true)
        .value(Users::UpdatedAt, now());
    if let Some(role) = role {
        q.value(Users::Role, role.as_str());
    }
    q.and_where(Expr::col(Users::Id).eq(user_id))
        .and_where(Expr::col(Users::ApprovalStatus).eq(ApprovalStatus::Pending.as_str()))
        .build(SqliteQueryBuilder)
}

/// Reject a pending account.
pub fn reject(user_id: &str, reason: Option<&str>) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::ApprovalStatus, ApprovalStatus::Rejected.as_str())
        .value(Users::RejectionReason, reason.map(|s| s.to_string()))
        .value(Users::EmploymentActive, false)
        .value(Users::UpdatedAt, now())
        .and_where(Expr::col(Users::Id).eq(user_id))
        .and_where(Expr::col(Users::ApprovalStatus).eq(ApprovalStatus::Pending.as_str()))
        .build(SqliteQueryBuilder)
}

/// Company admin edit of a member's profile. `None` leaves a column alone,
/// except `phone`, which is always replaced.
pub fn update_profile(
    user_id: &str,
    name: &str,
    phone: Option<&str>,
    role: Option<UserRole>,
    employment_active: Option<bool>,
) -> Built {
    let mut q = Query::update();
    q.table(Users::Table)
        .value(Users::Name, name)
        .value(Users::Phone, phone.map(|s| s.to_string()))
        .value(Users::UpdatedAt, now());
    if let Some(role) = role {
        q.value(Users::Role, role.as_str());
    }
    if let Some(active) = employment_active {
        q.value(Users::EmploymentActive, active);
    }
    q.and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

pub fn update_role(user_id: &str, role: UserRole) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::Role, role.as_str())
        .value(Users::UpdatedAt, now())
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

// ── Sensitive data ─────────────────────────────────────────────────────────

/// Insert or replace the sealed resident number of a user.
pub fn upsert_sensitive(user_id: &str, company_id: &str, sealed: &str) -> Built {
    Query::insert()
        .into_table(UserSensitive::Table)
        .columns([
            UserSensitive::UserId,
            UserSensitive::CompanyId,
            UserSensitive::ResidentNumberSealed,
            UserSensitive::UpdatedAt,
        ])
        .values_panic([user_id.into(), company_id.into(), sealed.into(), now()])
        .on_conflict(
            OnConflict::column(UserSensitive::UserId)
                .update_columns([
                    UserSensitive::CompanyId,
                    UserSensitive::ResidentNumberSealed,
                    UserSensitive::UpdatedAt,
                ])
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}

/// Sealed resident number and its update time.
pub fn get_sensitive(user_id: &str) -> Built {
    Query::select()
        .columns([
            UserSensitive::ResidentNumberSealed,
            UserSensitive::UpdatedAt,
        ])
        .from(UserSensitive::Table)
        .and_where(Expr::col(UserSensitive::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

// ── Refresh tokens ─────────────────────────────────────────────────────────

/// Insert refresh token.
pub fn insert_refresh_token(id: &str, user_id: &str, token_hash: &str, expires_at: &str) -> Built {
    Query::insert()
        .into_table(RefreshTokens::Table)
        .columns([
            RefreshTokens::Id,
            RefreshTokens::UserId,
            RefreshTokens::TokenHash,
            RefreshTokens::ExpiresAt,
        ])
        .values_panic([
            id.into(),
            user_id.into(),
            token_hash.into(),
            expires_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Lookup refresh token with user join.
pub fn lookup_refresh_token(token_hash: &str) -> Built {
    Query::select()
        .column((RefreshTokens::Table, RefreshTokens::Id))
        .column((RefreshTokens::Table, RefreshTokens::UserId))
        .column((RefreshTokens::Table, RefreshTokens::ExpiresAt))
        .column((Users::Table, Users::Name))
        .column((Users::Table, Users::Role))
        .from(RefreshTokens::Table)
        .inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id))
                .equals((RefreshTokens::Table, RefreshTokens::UserId)),
        )
        .and_where(Expr::col((RefreshTokens::Table, RefreshTokens::TokenHash)).eq(token_hash))
        .build(SqliteQueryBuilder)
}

/// Delete refresh token by hash.
pub fn delete_refresh_token(token_hash: &str) -> Built {
    Query::delete()
        .from_table(RefreshTokens::Table)
        .and_where(Expr::col(RefreshTokens::TokenHash).eq(token_hash))
        .build(SqliteQueryBuilder)
}

/// Delete refresh token by id.
pub fn delete_refresh_token_by_id(id: &str) -> Built {
    Query::delete()
        .from_table(RefreshTokens::Table)
        .and_where(Expr::col(RefreshTokens::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Revoke every session of a user (after a password change).
pub fn delete_refresh_tokens_for_user(user_id: &str) -> Built {
    Query::delete()
        .from_table(RefreshTokens::Table)
        .and_where(Expr::col(RefreshTokens::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}
