use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use cleanops_api::{
    ApprovalStatus, ApproveUserRequest, ChangeRoleRequest, CreateCompanyUserRequest, Envelope,
    Feature, RejectUserRequest, SensitiveInfoRequest, SensitiveInfoResponse, SignupType,
    UpdateCompanyUserRequest, UserResponse, UserRole, UserStoresRequest, crypto, db as dbq,
    service,
};

use super::auth::AuthUser;
use super::{COMPANY_ADMINS, PLATFORM, business_scope, check_company};
use crate::AppConfig;
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{Db, sq_execute, sq_query_map, sq_query_opt, sq_query_row, user_from_row};

fn load_user(conn: &Connection, id: &str) -> Result<Option<UserResponse>, ApiErr> {
    sq_query_opt(conn, dbq::users::get_by_id(id), user_from_row)
        .map_err(ApiErr::from_db("load user"))
}

/// A member of the caller's company.
fn company_member(conn: &Connection, id: &str, company_id: &str) -> Result<UserResponse, ApiErr> {
    let row = load_user(conn, id)?.map(|u| (u.company_id.clone().unwrap_or_default(), u));
    check_company(row, company_id, "user")
}

fn list_users(conn: &Connection, built: dbq::Built) -> Result<Vec<UserResponse>, ApiErr> {
    sq_query_map(conn, built, user_from_row).map_err(ApiErr::from_db("list users"))
}

/// Deduplicated store ids, all live stores of the company.
fn company_store_ids(
    conn: &Connection,
    company_id: &str,
    mut ids: Vec<String>,
) -> Result<Vec<String>, ApiErr> {
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(ids);
    }
    let owned: i64 = sq_query_row(conn, dbq::stores::count_company_stores(company_id, &ids), |row| {
        row.get(0)
    })
    .map_err(ApiErr::from_db("count company stores"))?;
    if owned as usize != ids.len() {
        return Err(ApiErr::bad_request("every store must belong to your company"));
    }
    Ok(ids)
}

/// Replace a user's store assignments inside the caller's transaction.
fn replace_assignments(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    store_ids: &[String],
) -> Result<(), ApiErr> {
    sq_execute(tx, dbq::stores::clear_user_assignments(user_id))
        .map_err(ApiErr::from_db("clear assignments"))?;
    for store_id in store_ids {
        sq_execute(tx, dbq::stores::assign(user_id, store_id))
            .map_err(ApiErr::from_db("assign store"))?;
    }
    Ok(())
}

/// Approval and rejection only apply while the account is still pending.
fn ensure_decided(updated: usize) -> Result<(), ApiErr> {
    if updated == 0 {
        return Err(ApiErr::conflict("user is no longer pending approval"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Company users
// ---------------------------------------------------------------------------

/// GET /api/business/users
pub async fn list_company_users(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<UserResponse>>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Users)?;
    let users = list_users(&conn, dbq::users::list_by_company(&company_id))?;
    Ok(Json(Envelope::ok(users)))
}

/// GET /api/business/users/pending — join requests awaiting a decision.
pub async fn list_pending(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<UserResponse>>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Users)?;
    let users = list_users(&conn, dbq::users::list_pending_by_company(&company_id))?;
    Ok(Json(Envelope::ok(users)))
}

/// PATCH /api/business/users/{id}/approve — optionally set role and stores.
pub async fn approve(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ApproveUserRequest>,
) -> Result<Json<Envelope<UserResponse>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Users)?;
    let target = company_member(&conn, &id, &company_id)?;
    if target.approval_status != ApprovalStatus::Pending {
        return Err(ApiErr::conflict("user is no longer pending approval"));
    }
    let role = service::approval_role(req.role, target.role)?;

    let store_ids = req
        .store_ids
        .map(|ids| company_store_ids(&conn, &company_id, ids))
        .transpose()?;

    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin approval"))?;
    let updated = sq_execute(&tx, dbq::users::approve(&id, Some(role), &user.user_id))
        .map_err(ApiErr::from_db("approve user"))?;
    ensure_decided(updated)?;
    if let Some(ids) = &store_ids {
        replace_assignments(&tx, &id, ids)?;
    }
    tx.commit().map_err(ApiErr::from_db("commit approval"))?;

    tracing::info!(user_id = %id, %role, approved_by = %user.user_id, "user approved");
    let approved = load_user(&conn, &id)?.ok_or_else(|| ApiErr::not_found("user not found"))?;
    Ok(Json(Envelope::ok(approved)))
}

/// PATCH /api/business/users/{id}/reject
pub async fn reject(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RejectUserRequest>,
) -> Result<Json<Envelope<UserResponse>>, ApiErr> {
    let reason = service::blank_to_none(req.rejection_reason);

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Users)?;
    company_member(&conn, &id, &company_id)?;
    let updated = sq_execute(&conn, dbq::users::reject(&id, reason.as_deref()))
        .map_err(ApiErr::from_db("reject user"))?;
    ensure_decided(updated)?;

    tracing::info!(user_id = %id, rejected_by = %user.user_id, "user rejected");
    let rejected = load_user(&conn, &id)?.ok_or_else(|| ApiErr::not_found("user not found"))?;
    Ok(Json(Envelope::ok(rejected)))
}

/// PATCH /api/business/users/{id}/role
pub async fn change_role(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ChangeRoleRequest>,
) -> Result<Json<Envelope<UserResponse>>, ApiErr> {
    service::check_role_change(user.role, req.role)?;
    if id == user.user_id {
        return Err(ApiErr::bad_request("you cannot change your own role"));
    }

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Users)?;
    company_member(&conn, &id, &company_id)?;
    sq_execute(&conn, dbq::users::update_role(&id, req.role))
        .map_err(ApiErr::from_db("update role"))?;

    tracing::info!(user_id = %id, role = %req.role, "role changed");
    let changed = load_user(&conn, &id)?.ok_or_else(|| ApiErr::not_found("user not found"))?;
    Ok(Json(Envelope::ok(changed)))
}

/// POST /api/business/users — add an approved member directly.
pub async fn create_company_user(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateCompanyUserRequest>,
) -> Result<(StatusCode, Json<Envelope<UserResponse>>), ApiErr> {
    let new_user = service::validate_company_user(&req)?;
    let (company_id, store_ids) = {
        let conn = db.conn();
        let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Users)?;
        super::auth::ensure_email_free(&conn, &new_user.email)?;
        let store_ids =
            company_store_ids(&conn, &company_id, req.store_ids.unwrap_or_default())?;
        (company_id, store_ids)
    };
    let (password_hash, password_salt) =
        super::auth::hash_password_off_thread(req.password).await?;

    let conn = db.conn();
    let id = super::new_id();
    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin user creation"))?;
    super::auth::insert_user(
        &tx,
        &dbq::users::NewUser {
            id: &id,
            email: &new_user.email,
            password_hash: &password_hash,
            password_salt: &password_salt,
            name: &new_user.name,
            phone: new_user.phone.as_deref(),
            role: new_user.role,
            company_id: &company_id,
            approval_status: ApprovalStatus::Approved,
            signup_type: SignupType::AdminCreated,
        },
    )?;
    replace_assignments(&tx, &id, &store_ids)?;
    tx.commit().map_err(ApiErr::from_db("commit user creation"))?;

    tracing::info!(user_id = %id, role = %new_user.role, created_by = %user.user_id, "company user created");
    let created = load_user(&conn, &id)?.ok_or_else(|| ApiErr::internal("user vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(created))))
}

/// PATCH /api/business/users/{id} — name, phone, role and employment state.
pub async fn update_company_user(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateCompanyUserRequest>,
) -> Result<Json<Envelope<UserResponse>>, ApiErr> {
    let name = service::validate_user_update(user.role, &req)?;
    if id == user.user_id && (req.role.is_some() || req.employment_active == Some(false)) {
        return Err(ApiErr::bad_request(
            "you cannot change your own role or employment",
        ));
    }
    let phone = service::blank_to_none(req.phone);

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Users)?;
    company_member(&conn, &id, &company_id)?;
    sq_execute(
        &conn,
        dbq::users::update_profile(&id, &name, phone.as_deref(), req.role, req.employment_active),
    )
    .map_err(ApiErr::from_db("update user"))?;

    tracing::info!(user_id = %id, updated_by = %user.user_id, "company user updated");
    let updated = load_user(&conn, &id)?.ok_or_else(|| ApiErr::not_found("user not found"))?;
    Ok(Json(Envelope::ok(updated)))
}

/// PUT /api/business/users/{id}/stores — replace the member's store assignments.
pub async fn set_user_stores(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UserStoresRequest>,
) -> Result<Json<Envelope<Vec<String>>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Users)?;
    company_member(&conn, &id, &company_id)?;
    let store_ids = company_store_ids(&conn, &company_id, req.store_ids)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin store assignment"))?;
    replace_assignments(&tx, &id, &store_ids)?;
    tx.commit().map_err(ApiErr::from_db("commit store assignment"))?;

    tracing::info!(user_id = %id, stores = store_ids.len(), "user stores replaced");
    Ok(Json(Envelope::ok(store_ids)))
}

// ---------------------------------------------------------------------------
// Sensitive data
// ---------------------------------------------------------------------------

/// PUT /api/business/users/{id}/sensitive — store the resident number sealed.
pub async fn put_sensitive(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SensitiveInfoRequest>,
) -> Result<Json<Envelope<SensitiveInfoResponse>>, ApiErr> {
    let rrn = service::normalize_resident_number(&req.resident_number)?;

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Users)?;
    company_member(&conn, &id, &company_id)?;

    let sealed = crypto::seal(&config.data_key, &rrn)?;
    sq_execute(&conn, dbq::users::upsert_sensitive(&id, &company_id, &sealed))
        .map_err(ApiErr::from_db("store sensitive info"))?;

    let updated_at = sq_query_opt(&conn, dbq::users::get_sensitive(&id), |row| {
        row.get::<_, String>("updated_at")
    })
    .map_err(ApiErr::from_db("load sensitive info"))?;
    Ok(Json(Envelope::ok(SensitiveInfoResponse {
        user_id: id,
        resident_number_masked: Some(crypto::mask_resident_number(&rrn)),
        updated_at,
    })))
}

/// GET /api/business/users/{id}/sensitive — masked resident number.
pub async fn get_sensitive(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<SensitiveInfoResponse>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, COMPANY_ADMINS, Feature::Users)?;
    company_member(&conn, &id, &company_id)?;

    let stored = sq_query_opt(&conn, dbq::users::get_sensitive(&id), |row| {
        Ok((
            row.get::<_, String>("resident_number_sealed")?,
            row.get::<_, String>("updated_at")?,
        ))
    })
    .map_err(ApiErr::from_db("load sensitive info"))?;

    let (masked, updated_at) = match stored {
        Some((sealed, updated_at)) => (
            Some(crypto::open_masked(&config.data_key, &sealed)),
            Some(updated_at),
        ),
        None => (None, None),
    };
    Ok(Json(Envelope::ok(SensitiveInfoResponse {
        user_id: id,
        resident_number_masked: masked,
        updated_at,
    })))
}

// ---------------------------------------------------------------------------
// Platform admin
// ---------------------------------------------------------------------------

/// GET /api/platform/users
pub async fn list_all(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<UserResponse>>>, ApiErr> {
    user.require_role(PLATFORM)?;
    let conn = db.conn();
    Ok(Json(Envelope::ok(list_users(&conn, dbq::users::list_all())?)))
}

/// GET /api/platform/users/pending-owner — self-signed-up owners to review.
pub async fn list_pending_owners(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<UserResponse>>>, ApiErr> {
    user.require_role(PLATFORM)?;
    let conn = db.conn();
    Ok(Json(Envelope::ok(list_users(
        &conn,
        dbq::users::list_pending_owners(),
    )?)))
}

/// PATCH /api/platform/users/{id}/approve-owner
pub async fn approve_owner(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<UserResponse>>, ApiErr> {
    user.require_role(PLATFORM)?;
    let conn = db.conn();
    let target = load_user(&conn, &id)?.ok_or_else(|| ApiErr::not_found("user not found"))?;
    let self_signed_owner = target.role == UserRole::BusinessOwner
        && target.signup_type.as_deref() == Some(SignupType::OwnerSelfSignup.as_str());
    if !self_signed_owner {
        return Err(ApiErr::bad_request(
            "only self-signed-up business owners are approved here",
        ));
    }

    let updated = sq_execute(&conn, dbq::users::approve(&id, None, &user.user_id))
        .map_err(ApiErr::from_db("approve owner"))?;
    ensure_decided(updated)?;

    tracing::info!(user_id = %id, "business owner approved");
    let approved = load_user(&conn, &id)?.ok_or_else(|| ApiErr::not_found("user not found"))?;
    Ok(Json(Envelope::ok(approved)))
}
