use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use cleanops_api::{
    CreateLostItemRequest, Envelope, Feature, LostItemResponse, OkResponse, db as dbq, service,
};

use super::auth::AuthUser;
use super::{OWNERS, STAFF_MODE, assert_store_active, business_scope, check_company};
use crate::error::ApiErr;
use crate::extract::ApiJson;
use crate::storage::{Db, lost_item_from_row, sq_execute, sq_flag, sq_query_map, sq_query_opt};

/// POST /api/staff/lost-items — report a found item.
pub async fn create(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateLostItemRequest>,
) -> Result<(StatusCode, Json<Envelope<LostItemResponse>>), ApiErr> {
    user.require_role(STAFF_MODE)?;
    let item = service::validate_lost_item(&req)?;

    let conn = db.conn();
    assert_store_active(&conn, &req.store_id)?;
    let assigned = sq_flag(&conn, dbq::stores::is_assigned(&user.user_id, &req.store_id))
        .map_err(ApiErr::from_db("check store assignment"))?;
    if !assigned {
        return Err(ApiErr::forbidden("store is not assigned to you"));
    }

    let id = super::new_id();
    sq_execute(
        &conn,
        dbq::lost_items::insert(&id, &req.store_id, &user.user_id, &item),
    )
    .map_err(ApiErr::from_db("insert lost item"))?;

    let created = sq_query_opt(&conn, dbq::lost_items::get_by_id(&id), lost_item_from_row)
        .map_err(ApiErr::from_db("load lost item"))?
        .ok_or_else(|| ApiErr::internal("lost item vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(created.item))))
}

/// GET /api/staff/lost-items
pub async fn list_mine(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<LostItemResponse>>>, ApiErr> {
    user.require_role(STAFF_MODE)?;
    let conn = db.conn();
    let items = sq_query_map(&conn, dbq::lost_items::list_for_user(&user.user_id), lost_item_from_row)
        .map_err(ApiErr::from_db("list lost items"))?
        .into_iter()
        .map(|row| row.item)
        .collect();
    Ok(Json(Envelope::ok(items)))
}

/// GET /api/business/lost-items
pub async fn list_for_company(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<Envelope<Vec<LostItemResponse>>>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Stores)?;
    let items = sq_query_map(
        &conn,
        dbq::lost_items::list_for_company(&company_id),
        lost_item_from_row,
    )
    .map_err(ApiErr::from_db("list lost items"))?
    .into_iter()
    .map(|row| row.item)
    .collect();
    Ok(Json(Envelope::ok(items)))
}

/// PATCH /api/business/lost-items/{id}/confirm — mark an item as handled.
pub async fn confirm(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    let company_id = business_scope(&conn, &user, OWNERS, Feature::Stores)?;
    let row = sq_query_opt(&conn, dbq::lost_items::get_by_id(&id), lost_item_from_row)
        .map_err(ApiErr::from_db("load lost item"))?
        .map(|r| (r.company_id, r.item));
    let item = check_company(row, &company_id, "lost item")?;
    service::check_lost_item_confirmable(item.status)?;

    let updated = sq_execute(&conn, dbq::lost_items::confirm(&id))
        .map_err(ApiErr::from_db("confirm lost item"))?;
    if updated == 0 {
        return Err(ApiErr::conflict("lost item was confirmed by someone else"));
    }
    tracing::info!(item_id = %id, "lost item confirmed");
    Ok(Json(OkResponse::ok()))
}
