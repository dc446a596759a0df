use axum::{
    Json,
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts, Query, State},
    http::{StatusCode, request::Parts},
};
use chrono::{Duration, Utc};
use rusqlite::Connection;

use cleanops_api::{
    ApprovalStatus, AuthTokenResponse, ChangePasswordRequest, Envelope, JoinRequest,
    LoginRequest, LogoutRequest, OkResponse, RefreshRequest, SignupRequest, SignupType,
    UserResponse, UserRole, ValidateCodeQuery, ValidateCodeResponse, crypto, db as dbq,
    format::sqlite_timestamp, plan, roles, service,
};

use super::now_unix;
use crate::AppConfig;
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{
    Db, is_constraint_violation, sq_execute, sq_flag, sq_query_opt, user_from_row,
};

// ---------------------------------------------------------------------------
// Auth extractor
// ---------------------------------------------------------------------------

/// Authenticated user extracted from the `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub name: String,
    pub role: UserRole,
    pub company_id: Option<String>,
    pub approval_status: ApprovalStatus,
}

impl AuthUser {
    /// 403 unless the caller is approved and holds one of `allowed`.
    pub fn require_role(&self, allowed: &[UserRole]) -> Result<(), ApiErr> {
        if roles::has_role(self.role, self.approval_status, allowed) {
            Ok(())
        } else {
            Err(ApiErr::forbidden("insufficient permissions"))
        }
    }

    pub fn company_id(&self) -> Result<&str, ApiErr> {
        self.company_id
            .as_deref()
            .ok_or_else(|| ApiErr::forbidden("no company associated with this account"))
    }
}

impl From<UserResponse> for AuthUser {
    fn from(user: UserResponse) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
            role: user.role,
            company_id: user.company_id,
            approval_status: user.approval_status,
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Db: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiErr::unauthorized("missing or invalid Authorization header"))?;

        let config = AppConfig::from_ref(state);
        let user_id = service::resolve_auth_token(token, &config.jwt_secret, now_unix())?;

        let db = Db::from_ref(state);
        let conn = db.conn();
        let user = sq_query_opt(&conn, dbq::users::get_by_id(&user_id), user_from_row)
            .map_err(ApiErr::from_db("lookup user by id"))?
            .ok_or_else(|| ApiErr::unauthorized("user not found"))?;
        Ok(user.into())
    }
}

/// Anonymous when there is no usable token; other failures still reject.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Db: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(None);
        }
        match <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.status() == StatusCode::UNAUTHORIZED => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Token issue
// ---------------------------------------------------------------------------

fn issue_tokens(
    conn: &Connection,
    config: &AppConfig,
    user_id: &str,
    name: &str,
    role: UserRole,
) -> Result<AuthTokenResponse, ApiErr> {
    if config.jwt_secret.is_empty() {
        tracing::error!("JWT_SECRET not configured");
        return Err(ApiErr::internal("internal server error"));
    }

    let bundle = service::prepare_token_bundle(&config.jwt_secret, user_id, name, role, now_unix())?;
    sq_execute(
        conn,
        dbq::users::insert_refresh_token(
            &bundle.token_id,
            user_id,
            &bundle.token_hash,
            &bundle.expires_at,
        ),
    )
    .map_err(ApiErr::from_db("insert refresh token"))?;
    Ok(bundle.response)
}

/// PBKDF2 runs on the blocking pool, never under the database lock.
pub(crate) async fn hash_password_off_thread(password: String) -> Result<(String, String), ApiErr> {
    tokio::task::spawn_blocking(move || crypto::hash_password(&password))
        .await
        .map_err(ApiErr::from_db("hash password task"))?
        .map_err(ApiErr::from)
}

async fn verify_password_off_thread(
    password: String,
    hash: String,
    salt: String,
) -> Result<bool, ApiErr> {
    tokio::task::spawn_blocking(move || crypto::verify_password(&password, &hash, &salt))
        .await
        .map_err(ApiErr::from_db("verify password task"))
}

pub(crate) fn ensure_email_free(conn: &Connection, email: &str) -> Result<(), ApiErr> {
    let taken = sq_flag(conn, dbq::users::email_exists(email))
        .map_err(ApiErr::from_db("check email"))?;
    if taken {
        return Err(ApiErr::conflict("email already registered"));
    }
    Ok(())
}

pub(crate) fn insert_user(conn: &Connection, user: &dbq::users::NewUser<'_>) -> Result<(), ApiErr> {
    sq_execute(conn, dbq::users::insert(user)).map_err(|e| {
        if is_constraint_violation(&e) {
            ApiErr::conflict("email already registered")
        } else {
            tracing::error!("insert user: {e}");
            ApiErr::internal("internal server error")
        }
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Signup (business owner)
// ---------------------------------------------------------------------------

/// POST /api/auth/signup — create a company on a free trial and its pending owner.
pub async fn signup(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthTokenResponse>), ApiErr> {
    let email = service::validate_email(&req.email)?;
    service::validate_password(&req.password)?;
    let mut errs = cleanops_api::FieldErrors::default();
    let name = service::require_text(&mut errs, "name", &req.name, 100);
    let company_name = service::require_text(&mut errs, "company_name", &req.company_name, 200);
    errs.into_result()?;
    let (name, company_name) = (name.unwrap_or_default(), company_name.unwrap_or_default());

    let (password_hash, password_salt) = hash_password_off_thread(req.password.clone()).await?;
    let company_id = super::new_id();
    let user_id = super::new_id();
    let trial_ends_at = sqlite_timestamp(Utc::now() + Duration::days(plan::TRIAL_DAYS));
    let address = service::blank_to_none(req.company_address.clone());
    let registration = service::blank_to_none(req.business_registration_number.clone());
    let phone = service::blank_to_none(req.phone.clone());

    let conn = db.conn();
    ensure_email_free(&conn, &email)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin signup"))?;
    let extras = dbq::companies::CompanyExtras {
        address: address.as_deref(),
        registration_number: registration.as_deref(),
        trial_ends_at: None,
    };
    sq_execute(
        &tx,
        dbq::companies::insert_trial(&company_id, &company_name, &extras, &trial_ends_at),
    )
    .map_err(ApiErr::from_db("insert company"))?;
    insert_user(
        &tx,
        &dbq::users::NewUser {
            id: &user_id,
            email: &email,
            password_hash: &password_hash,
            password_salt: &password_salt,
            name: &name,
            phone: phone.as_deref(),
            role: UserRole::BusinessOwner,
            company_id: &company_id,
            approval_status: ApprovalStatus::Pending,
            signup_type: SignupType::OwnerSelfSignup,
        },
    )?;
    tx.commit().map_err(ApiErr::from_db("commit signup"))?;

    tracing::info!(%user_id, %company_id, "owner signed up");
    let tokens = issue_tokens(&conn, &config, &user_id, &name, UserRole::BusinessOwner)?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

// ---------------------------------------------------------------------------
// Signup code
// ---------------------------------------------------------------------------

struct CodeCompany {
    id: String,
    name: String,
    requires_approval: bool,
    default_role: String,
}

fn find_code_company(conn: &Connection, code: &str) -> Result<Option<CodeCompany>, ApiErr> {
    sq_query_opt(conn, dbq::companies::find_by_signup_code(code), |row| {
        Ok(CodeCompany {
            id: row.get("id")?,
            name: row.get("name")?,
            requires_approval: row.get("requires_approval")?,
            default_role: row.get("default_role")?,
        })
    })
    .map_err(ApiErr::from_db("lookup signup code"))
}

/// GET /api/auth/validate-code?code= — check a company signup code.
pub async fn validate_code(
    State(db): State<Db>,
    Query(q): Query<ValidateCodeQuery>,
) -> Result<Json<ValidateCodeResponse>, ApiErr> {
    let code = service::normalize_signup_code(q.code.as_deref().unwrap_or_default());
    if code.is_empty() {
        return Err(ApiErr::bad_request("signup code is required"));
    }

    let conn = db.conn();
    let resp = match find_code_company(&conn, &code)? {
        Some(company) => ValidateCodeResponse {
            valid: true,
            company_id: Some(company.id),
            company_name: Some(company.name),
            error: None,
        },
        None => ValidateCodeResponse {
            valid: false,
            company_id: None,
            company_name: None,
            error: Some("invalid or inactive signup code".into()),
        },
    };
    Ok(Json(resp))
}

/// POST /api/auth/join — staff signup with a company code.
pub async fn join(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ApiJson(req): ApiJson<JoinRequest>,
) -> Result<(StatusCode, Json<AuthTokenResponse>), ApiErr> {
    let email = service::validate_email(&req.email)?;
    service::validate_password(&req.password)?;
    let mut errs = cleanops_api::FieldErrors::default();
    let name = service::require_text(&mut errs, "name", &req.name, 100);
    let code = service::normalize_signup_code(&req.signup_code);
    if code.is_empty() {
        errs.push("signup_code", "required");
    }
    errs.into_result()?;
    let name = name.unwrap_or_default();
    let (password_hash, password_salt) = hash_password_off_thread(req.password.clone()).await?;

    let conn = db.conn();
    let company = find_code_company(&conn, &code)?
        .ok_or_else(|| ApiErr::bad_request("invalid or inactive signup code"))?;
    let role: UserRole = company.default_role.parse().unwrap_or_default();
    let approval_status = if company.requires_approval {
        ApprovalStatus::Pending
    } else {
        ApprovalStatus::Approved
    };

    ensure_email_free(&conn, &email)?;
    let user_id = super::new_id();
    let phone = service::blank_to_none(req.phone.clone());
    insert_user(
        &conn,
        &dbq::users::NewUser {
            id: &user_id,
            email: &email,
            password_hash: &password_hash,
            password_salt: &password_salt,
            name: &name,
            phone: phone.as_deref(),
            role,
            company_id: &company.id,
            approval_status,
            signup_type: SignupType::CompanyCode,
        },
    )?;

    tracing::info!(%user_id, company_id = %company.id, %approval_status, "user joined company");
    let tokens = issue_tokens(&conn, &config, &user_id, &name, role)?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

// ---------------------------------------------------------------------------
// Login / refresh / logout
// ---------------------------------------------------------------------------

/// POST /api/auth/login — email + password login.
pub async fn login(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, ApiErr> {
    let email = service::validate_email(&req.email)?;

    let row = {
        let conn = db.conn();
        sq_query_opt(&conn, dbq::users::get_by_email_for_login(&email), |row| {
            Ok((
                row.get::<_, String>("id")?,
                row.get::<_, String>("name")?,
                row.get::<_, String>("role")?,
                row.get::<_, String>("password_hash")?,
                row.get::<_, String>("password_salt")?,
            ))
        })
        .map_err(ApiErr::from_db("lookup user for login"))?
    };

    let Some((user_id, name, role, hash, salt)) = row else {
        return Err(ApiErr::unauthorized("invalid email or password"));
    };
    if !verify_password_off_thread(req.password, hash, salt).await? {
        return Err(ApiErr::unauthorized("invalid email or password"));
    }
    let role: UserRole = role
        .parse()
        .map_err(ApiErr::from_db("parse stored role"))?;

    let conn = db.conn();
    issue_tokens(&conn, &config, &user_id, &name, role).map(Json)
}

/// POST /api/auth/refresh — rotate a refresh token.
pub async fn refresh(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, ApiErr> {
    let token_hash = crypto::hash_token(&req.refresh_token);
    let conn = db.conn();

    let row = sq_query_opt(&conn, dbq::users::lookup_refresh_token(&token_hash), |row| {
        Ok((
            row.get::<_, String>("id")?,
            row.get::<_, String>("user_id")?,
            row.get::<_, String>("expires_at")?,
            row.get::<_, String>("name")?,
            row.get::<_, String>("role")?,
        ))
    })
    .map_err(ApiErr::from_db("lookup refresh token"))?;
    let Some((token_id, user_id, expires_at, name, role)) = row else {
        return Err(ApiErr::unauthorized("invalid refresh token"));
    };

    if expires_at < sqlite_timestamp(Utc::now()) {
        if let Err(e) = sq_execute(&conn, dbq::users::delete_refresh_token_by_id(&token_id)) {
            tracing::error!("delete expired refresh token: {e}");
        }
        return Err(ApiErr::unauthorized("refresh token expired"));
    }

    sq_execute(&conn, dbq::users::delete_refresh_token(&token_hash))
        .map_err(ApiErr::from_db("rotate refresh token"))?;
    let role: UserRole = role
        .parse()
        .map_err(ApiErr::from_db("parse stored role"))?;
    issue_tokens(&conn, &config, &user_id, &name, role).map(Json)
}

/// POST /api/auth/logout — revoke a refresh token.
pub async fn logout(
    State(db): State<Db>,
    ApiJson(req): ApiJson<LogoutRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    let token_hash = crypto::hash_token(&req.refresh_token);
    let conn = db.conn();
    sq_execute(&conn, dbq::users::delete_refresh_token(&token_hash))
        .map_err(ApiErr::from_db("logout refresh token delete"))?;
    Ok(Json(OkResponse::ok()))
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// PUT /api/auth/password — change password; every refresh token is revoked.
pub async fn change_password(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    service::validate_password(&req.new_password)?;

    let (hash, salt) = {
        let conn = db.conn();
        sq_query_opt(&conn, dbq::users::get_password_fields(&user.user_id), |row| {
            Ok((
                row.get::<_, String>("password_hash")?,
                row.get::<_, String>("password_salt")?,
            ))
        })
        .map_err(ApiErr::from_db("load password"))?
        .ok_or_else(|| ApiErr::not_found("user not found"))?
    };

    if !verify_password_off_thread(req.current_password, hash, salt).await? {
        return Err(ApiErr::unauthorized("current password is incorrect"));
    }
    let (new_hash, new_salt) = hash_password_off_thread(req.new_password).await?;

    let conn = db.conn();
    sq_execute(
        &conn,
        dbq::users::update_password(&user.user_id, &new_hash, &new_salt),
    )
    .map_err(ApiErr::from_db("update password"))?;
    sq_execute(
        &conn,
        dbq::users::delete_refresh_tokens_for_user(&user.user_id),
    )
    .map_err(ApiErr::from_db("revoke refresh tokens"))?;

    Ok(Json(OkResponse::ok()))
}

/// GET /api/auth/me — the caller's account.
pub async fn me(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<UserResponse>>, ApiErr> {
    let conn = db.conn();
    let me = sq_query_opt(&conn, dbq::users::get_by_id(&user.user_id), user_from_row)
        .map_err(ApiErr::from_db("load user"))?
        .ok_or_else(|| ApiErr::not_found("user not found"))?;
    Ok(Json(Envelope::ok(me)))
}
