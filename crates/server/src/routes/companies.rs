use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use cleanops_api::{
    CompanyRequest, CompanyResponse, Envelope, Feature, FieldErrors, OkResponse,
    UpdateOwnCompanyRequest, db as dbq,
    db::companies::{CompanyExtras, CompanyPatch, OwnCompanyPatch},
    service,
};

use super::auth::AuthUser;
use super::{OWNERS, PLATFORM, business_scope};
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{
    Db, company_from_row, is_constraint_violation, sq_execute, sq_flag, sq_query_map,
    sq_query_opt,
};

fn load_company(conn: &Connection, id: &str) -> Result<CompanyResponse, ApiErr> {
    sq_query_opt(conn, dbq::companies::get_by_id(id), company_from_row)
        .map_err(ApiErr::from_db("load company"))?
        .ok_or_else(|| ApiErr::not_found("company not found"))
}

/// `Some(None)` clears the column; a missing field leaves it alone.
fn nullable(value: &Option<String>) -> Option<Option<String>> {
    value.clone().map(|v| service::blank_to_none(Some(v)))
}

// ---------------------------------------------------------------------------
// Platform admin
// ---------------------------------------------------------------------------

/// GET /api/platform/companies
pub async fn list(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<CompanyResponse>>>, ApiErr> {
    user.require_role(PLATFORM)?;
    let conn = db.conn();
    let companies = sq_query_map(&conn, dbq::companies::list_all(), company_from_row)
        .map_err(ApiErr::from_db("list companies"))?;
    Ok(Json(Envelope::ok(companies)))
}

/// POST /api/platform/companies — optional explicit id.
pub async fn create(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CompanyRequest>,
) -> Result<(StatusCode, Json<Envelope<CompanyResponse>>), ApiErr> {
    user.require_role(PLATFORM)?;
    let fields = service::validate_company_request(&req, true)?;
    let name = fields.name.clone().unwrap_or_default();
    let id = req.id.clone().unwrap_or_else(super::new_id);
    let address = service::blank_to_none(req.address.clone());
    let registration = service::blank_to_none(req.business_registration_number.clone());
    let trial_ends_at = service::blank_to_none(req.trial_ends_at.clone());
    let extras = CompanyExtras {
        address: address.as_deref(),
        registration_number: registration.as_deref(),
        trial_ends_at: trial_ends_at.as_deref(),
    };

    let conn = db.conn();
    sq_execute(&conn, dbq::companies::insert(&id, &name, &fields, &extras)).map_err(|e| {
        if is_constraint_violation(&e) {
            ApiErr::conflict("company id already exists")
        } else {
            tracing::error!("insert company: {e}");
            ApiErr::internal("internal server error")
        }
    })?;

    tracing::info!(company_id = %id, "company created");
    let company = load_company(&conn, &id)?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(company))))
}

/// GET /api/platform/companies/{id}
pub async fn get(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<CompanyResponse>>, ApiErr> {
    user.require_role(PLATFORM)?;
    let conn = db.conn();
    Ok(Json(Envelope::ok(load_company(&conn, &id)?)))
}

/// PUT /api/platform/companies/{id} — partial update.
pub async fn update(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CompanyRequest>,
) -> Result<Json<Envelope<CompanyResponse>>, ApiErr> {
    user.require_role(PLATFORM)?;
    let fields = service::validate_company_request(&req, false)?;
    let patch = CompanyPatch {
        address: nullable(&req.address),
        registration_number: nullable(&req.business_registration_number),
        trial_ends_at: nullable(&req.trial_ends_at),
    };

    let conn = db.conn();
    let current = load_company(&conn, &id)?;
    let Some(update) = dbq::companies::update(&id, &fields, &patch) else {
        return Ok(Json(Envelope::ok(current)));
    };
    sq_execute(&conn, update).map_err(ApiErr::from_db("update company"))?;
    Ok(Json(Envelope::ok(load_company(&conn, &id)?)))
}

/// DELETE /api/platform/companies/{id} — soft delete.
pub async fn delete(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    user.require_role(PLATFORM)?;
    let conn = db.conn();
    let deleted = sq_execute(&conn, dbq::companies::soft_delete(&id))
        .map_err(ApiErr::from_db("delete company"))?;
    if deleted == 0 {
        return Err(ApiErr::not_found("company not found"));
    }
    tracing::info!(company_id = %id, "company deleted");
    Ok(Json(OkResponse::ok()))
}

// ---------------------------------------------------------------------------
// Business owner
// ---------------------------------------------------------------------------

/// GET /api/business/company
pub async fn get_own(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<CompanyResponse>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Company)?;
    Ok(Json(Envelope::ok(load_company(&conn, &company_id)?)))
}

/// PUT /api/business/company — owner-editable settings, including the signup code.
pub async fn update_own(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateOwnCompanyRequest>,
) -> Result<Json<Envelope<CompanyResponse>>, ApiErr> {
    let mut errs = FieldErrors::default();
    let name = req
        .name
        .as_deref()
        .and_then(|n| service::require_text(&mut errs, "name", n, 200));
    let signup_code = req.signup_code.as_deref().map(|code| {
        let code = service::normalize_signup_code(code);
        if code.chars().count() > 50 {
            errs.push("signup_code", "must be at most 50 characters");
        }
        (!code.is_empty()).then_some(code)
    });
    if req.default_role.is_some_and(|r| !r.is_assignable_on_approval()) {
        errs.push("default_role", "cannot be used as a default role");
    }
    errs.into_result()?;

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Company)?;
    let current = load_company(&conn, &company_id)?;

    // The code that will be stored, whether it changes or is only re-activated.
    let effective_code = match &signup_code {
        Some(code) => code.clone(),
        None => current.signup_code.clone(),
    };
    if let Some(code) = effective_code.as_deref() {
        let held = sq_flag(&conn, dbq::companies::signup_code_taken(code, &company_id))
            .map_err(ApiErr::from_db("check signup code"))?;
        if held {
            return Err(ApiErr::conflict("signup code already in use"));
        }
    }

    let patch = OwnCompanyPatch {
        name,
        address: nullable(&req.address),
        registration_number: nullable(&req.business_registration_number),
        signup_code,
        signup_code_active: req.signup_code_active,
        requires_approval: req.requires_approval,
        default_role: req.default_role,
    };
    let Some(update) = dbq::companies::update_own(&company_id, &patch) else {
        return Ok(Json(Envelope::ok(current)));
    };
    sq_execute(&conn, update).map_err(|e| {
        if is_constraint_violation(&e) {
            ApiErr::conflict("signup code already in use")
        } else {
            tracing::error!("update company: {e}");
            ApiErr::internal("internal server error")
        }
    })?;
    Ok(Json(Envelope::ok(load_company(&conn, &company_id)?)))
}
