pub mod announcements;
pub mod attendance;
pub mod auth;
pub mod checklists;
pub mod companies;
pub mod health;
pub mod home;
pub mod landing;
pub mod lost_items;
pub mod problem_reports;
pub mod stores;
pub mod supply_requests;
pub mod users;

use rusqlite::Connection;

use cleanops_api::{Feature, StoreResponse, UserRole, db as dbq, plan};

use crate::error::ApiErr;
use crate::storage::{company_from_row, sq_query_opt, store_from_row};
use auth::AuthUser;

/// Staff and both subcontract roles.
pub(crate) const FIELD_WORKERS: &[UserRole] = &[
    UserRole::Staff,
    UserRole::SubcontractIndividual,
    UserRole::SubcontractCompany,
];

/// Field workers plus owners working a shift themselves.
pub(crate) const STAFF_MODE: &[UserRole] = &[
    UserRole::Staff,
    UserRole::SubcontractIndividual,
    UserRole::SubcontractCompany,
    UserRole::BusinessOwner,
];

pub(crate) const OWNERS: &[UserRole] = &[UserRole::BusinessOwner, UserRole::PlatformAdmin];

/// Roles that manage a company's people and announcements.
pub(crate) const COMPANY_ADMINS: &[UserRole] = &[
    UserRole::BusinessOwner,
    UserRole::FranchiseManager,
    UserRole::PlatformAdmin,
];

/// Roles that review submitted checklists.
pub(crate) const REVIEWERS: &[UserRole] = &[
    UserRole::Manager,
    UserRole::BusinessOwner,
    UserRole::PlatformAdmin,
];

pub(crate) const STORE_MANAGERS: &[UserRole] = &[UserRole::StoreManager];

pub(crate) const PLATFORM: &[UserRole] = &[UserRole::PlatformAdmin];

pub(crate) const LANDING_ADMINS: &[UserRole] = &[UserRole::Admin, UserRole::PlatformAdmin];

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now_unix() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Role check plus the plan gate of a business endpoint. Returns the company id.
///
/// Platform admins acting inside a company skip the plan gate.
pub(crate) fn business_scope(
    conn: &Connection,
    user: &AuthUser,
    allowed: &[UserRole],
    feature: Feature,
) -> Result<String, ApiErr> {
    user.require_role(allowed)?;
    let company_id = user.company_id()?.to_string();
    if user.role == UserRole::PlatformAdmin {
        return Ok(company_id);
    }

    let company = sq_query_opt(conn, dbq::companies::get_by_id(&company_id), company_from_row)
        .map_err(ApiErr::from_db("load company"))?
        .ok_or_else(|| ApiErr::forbidden("company not found"))?;
    plan::assert_business_feature(
        company.subscription_plan,
        company.subscription_status,
        company.trial_ends_at.as_deref(),
        company.premium_units,
        feature,
        chrono::Utc::now(),
    )?;
    Ok(company_id)
}

/// A store that exists, is not deleted and still has service running.
pub(crate) fn assert_store_active(
    conn: &Connection,
    store_id: &str,
) -> Result<StoreResponse, ApiErr> {
    let store = sq_query_opt(conn, dbq::stores::get_by_id(store_id), store_from_row)
        .map_err(ApiErr::from_db("load store"))?
        .ok_or_else(|| ApiErr::forbidden("store not found"))?;
    if !store.service_active {
        return Err(ApiErr::forbidden("store inactive"));
    }
    Ok(store)
}

/// Company-scoped lookup: missing → 404, another company's row → 403.
pub(crate) fn check_company<T>(
    row: Option<(String, T)>,
    company_id: &str,
    what: &str,
) -> Result<T, ApiErr> {
    match row {
        None => Err(ApiErr::not_found(format!("{what} not found"))),
        Some((owner, _)) if owner != company_id => Err(ApiErr::forbidden(format!(
            "{what} belongs to another company"
        ))),
        Some((_, value)) => Ok(value),
    }
}
