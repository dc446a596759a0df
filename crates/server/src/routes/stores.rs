use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rusqlite::Connection;

use cleanops_api::{
    AssignStoreUsersRequest, AssignedStoreResponse, AssignedStoresQuery, Envelope, Feature,
    OkResponse, StoreRequest, StoreResponse, UserRole, db as dbq,
    format::{today_kst, yesterday_kst},
    service,
};

use super::auth::AuthUser;
use super::{OWNERS, PLATFORM, business_scope, check_company};
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{Db, sq_execute, sq_query_map, sq_query_opt, sq_query_row, store_from_row};

/// A live store of the caller's company.
fn owned_store(conn: &Connection, id: &str, company_id: &str) -> Result<StoreResponse, ApiErr> {
    let store = sq_query_opt(conn, dbq::stores::get_by_id(id), store_from_row)
        .map_err(ApiErr::from_db("load store"))?
        .map(|s| (s.company_id.clone(), s));
    check_company(store, company_id, "store")
}

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

/// GET /api/staff/assigned-stores — stores assigned to the caller.
///
/// `?include_attendance=1` adds `is_clocked_in` per store.
pub async fn assigned_stores(
    State(db): State<Db>,
    user: AuthUser,
    Query(q): Query<AssignedStoresQuery>,
) -> Result<Json<Envelope<Vec<AssignedStoreResponse>>>, ApiErr> {
    user.require_role(UserRole::ALL)?;
    let include = matches!(q.include_attendance.as_deref(), Some("1" | "true"));

    let now = Utc::now();
    let (today, yesterday) = (today_kst(now), yesterday_kst(now));
    let open_on = include.then(|| [today.as_str(), yesterday.as_str()]);

    let conn = db.conn();
    let stores = sq_query_map(
        &conn,
        dbq::stores::list_assigned(&user.user_id, open_on),
        |row| {
            Ok(AssignedStoreResponse {
                store: store_from_row(row)?,
                is_clocked_in: if include {
                    Some(row.get("is_clocked_in")?)
                } else {
                    None
                },
            })
        },
    )
    .map_err(ApiErr::from_db("list assigned stores"))?;
    Ok(Json(Envelope::ok(stores)))
}

// ---------------------------------------------------------------------------
// Business owner
// ---------------------------------------------------------------------------

/// GET /api/business/stores
pub async fn list_company_stores(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<StoreResponse>>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Stores)?;
    let stores = sq_query_map(&conn, dbq::stores::list_by_company(&company_id), store_from_row)
        .map_err(ApiErr::from_db("list stores"))?;
    Ok(Json(Envelope::ok(stores)))
}

/// POST /api/business/stores
pub async fn create_store(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<StoreRequest>,
) -> Result<(StatusCode, Json<Envelope<StoreResponse>>), ApiErr> {
    let fields = service::validate_store_request(&req, true)?;
    let name = fields.name.clone().unwrap_or_default();

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Stores)?;
    let id = super::new_id();
    sq_execute(&conn, dbq::stores::insert(&id, &company_id, &name, &fields))
        .map_err(ApiErr::from_db("insert store"))?;

    tracing::info!(store_id = %id, %company_id, "store created");
    let store = sq_query_row(&conn, dbq::stores::get_by_id(&id), store_from_row)
        .map_err(ApiErr::from_db("load store"))?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(store))))
}

/// GET /api/business/stores/{id}
pub async fn get_store(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<StoreResponse>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Stores)?;
    let store = owned_store(&conn, &id, &company_id)?;
    Ok(Json(Envelope::ok(store)))
}

/// PUT /api/business/stores/{id} — partial update.
pub async fn update_store(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StoreRequest>,
) -> Result<Json<Envelope<StoreResponse>>, ApiErr> {
    let fields = service::validate_store_request(&req, false)?;

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Stores)?;
    let current = owned_store(&conn, &id, &company_id)?;
    let Some(update) = dbq::stores::update(&id, &fields) else {
        return Ok(Json(Envelope::ok(current)));
    };
    sq_execute(&conn, update).map_err(ApiErr::from_db("update store"))?;

    let store = sq_query_row(&conn, dbq::stores::get_by_id(&id), store_from_row)
        .map_err(ApiErr::from_db("load store"))?;
    Ok(Json(Envelope::ok(store)))
}

/// DELETE /api/business/stores/{id} — soft delete.
pub async fn delete_store(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Stores)?;
    owned_store(&conn, &id, &company_id)?;
    sq_execute(&conn, dbq::stores::soft_delete(&id)).map_err(ApiErr::from_db("delete store"))?;
    tracing::info!(store_id = %id, "store deleted");
    Ok(Json(OkResponse::ok()))
}

/// PUT /api/business/stores/{id}/users — replace the store's assignees.
pub async fn assign_users(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AssignStoreUsersRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    let mut user_ids = req.user_ids;
    user_ids.sort();
    user_ids.dedup();

    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Stores)?;
    owned_store(&conn, &id, &company_id)?;

    if !user_ids.is_empty() {
        let members: i64 = sq_query_row(
            &conn,
            dbq::stores::count_company_users(&company_id, &user_ids),
            |row| row.get(0),
        )
        .map_err(ApiErr::from_db("count company users"))?;
        if members as usize != user_ids.len() {
            return Err(ApiErr::bad_request(
                "every assigned user must belong to your company",
            ));
        }
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin assignment"))?;
    sq_execute(&tx, dbq::stores::clear_store_assignments(&id))
        .map_err(ApiErr::from_db("clear assignments"))?;
    for user_id in &user_ids {
        sq_execute(&tx, dbq::stores::assign(user_id, &id))
            .map_err(ApiErr::from_db("assign user"))?;
    }
    tx.commit().map_err(ApiErr::from_db("commit assignment"))?;

    Ok(Json(OkResponse::ok()))
}

// ---------------------------------------------------------------------------
// Platform admin
// ---------------------------------------------------------------------------

/// GET /api/platform/stores — every live store.
pub async fn list_all_stores(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<StoreResponse>>>, ApiErr> {
    user.require_role(PLATFORM)?;
    let conn = db.conn();
    let stores = sq_query_map(&conn, dbq::stores::list_all(), store_from_row)
        .map_err(ApiErr::from_db("list stores"))?;
    Ok(Json(Envelope::ok(stores)))
}
