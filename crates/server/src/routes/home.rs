use axum::{
    Json,
    extract::{Path, State},
};

use cleanops_api::{
    FeaturesResponse, HomeResponse, Section, SectionAccessResponse, UserRole, db as dbq, plan,
    roles,
};

use super::auth::AuthUser;
use crate::error::ApiErr;
use crate::storage::{Db, company_from_row, sq_query_opt};

/// GET /api/home — where the caller lands after login.
pub async fn home(user: AuthUser) -> Json<HomeResponse> {
    Json(HomeResponse {
        role: user.role,
        home_path: roles::home_path(user.role).to_string(),
    })
}

/// GET /api/sections/{section} — role-gated layout check.
///
/// Anonymous callers are redirected, not rejected.
pub async fn section(
    user: Option<AuthUser>,
    Path(section): Path<String>,
) -> Result<Json<SectionAccessResponse>, ApiErr> {
    let section: Section = section
        .parse()
        .map_err(|_| ApiErr::not_found(format!("unknown section '{section}'")))?;
    let gate = roles::section_gate(user.map(|u| u.role), section);
    Ok(Json(gate.into()))
}

/// GET /api/features — what the caller's company plan unlocks right now.
///
/// An expired trial unlocks nothing.
pub async fn features(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<FeaturesResponse>, ApiErr> {
    user.require_role(UserRole::ALL)?;
    let company_id = user.company_id()?;

    let conn = db.conn();
    let company = sq_query_opt(&conn, dbq::companies::get_by_id(company_id), company_from_row)
        .map_err(ApiErr::from_db("load company"))?
        .ok_or_else(|| ApiErr::not_found("company not found"))?;

    let trial_expired = plan::is_trial_expired(
        company.subscription_plan,
        company.subscription_status,
        company.trial_ends_at.as_deref(),
        chrono::Utc::now(),
    );
    let features = if trial_expired {
        Vec::new()
    } else {
        plan::allowed_features(
            company.subscription_plan,
            company.subscription_status,
            company.premium_units,
        )
    };
    Ok(Json(FeaturesResponse {
        company_id: company.id,
        subscription_plan: company.subscription_plan,
        subscription_status: company.subscription_status,
        trial_ends_at: company.trial_ends_at,
        trial_expired,
        features,
    }))
}
