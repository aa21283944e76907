use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use scribe_types::api::{CreateNamedRequest, RenameRequest};
use scribe_types::envelope::SuccessEnvelope;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::validation::{MAX_NAME_LEN, Validator};

pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CreateNamedRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.text("name", &req.name, MAX_NAME_LEN);
    v.finish()?;

    let name = req.name.trim().to_string();
    let category = state
        .run_db(move |stores, deadline| Ok(stores.categories.create(deadline, &name)?))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessEnvelope::new(Some(category), "category created successfully")),
    ))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let categories = state
        .run_db(|stores, deadline| Ok(stores.categories.get_all(deadline)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(categories), "")))
}

pub async fn get_category(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = path?;
    let category = state
        .run_db(move |stores, deadline| Ok(stores.categories.get_by_id(deadline, id)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(category), "")))
}

pub async fn get_category_by_name(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(name) = path?;
    let category = state
        .run_db(move |stores, deadline| Ok(stores.categories.get_by_name(deadline, &name)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(category), "")))
}

pub async fn rename_category(
    State(state): State<AppState>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.check(req.id > 0, "id", "id must be a positive integer");
    v.text("name", &req.name, MAX_NAME_LEN);
    v.finish()?;

    let name = req.name.trim().to_string();
    let modified = state
        .run_db(move |stores, deadline| Ok(stores.categories.update_name(deadline, req.id, &name)?))
        .await?;

    Ok(Json(SuccessEnvelope::new(Some(modified), "category updated successfully")))
}

pub async fn delete_category(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = path?;
    let modified = state
        .run_db(move |stores, deadline| Ok(stores.categories.delete_by_id(deadline, id)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(modified), "category deleted successfully")))
}

pub async fn delete_category_by_name(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(name) = path?;
    let modified = state
        .run_db(move |stores, deadline| Ok(stores.categories.delete_by_name(deadline, &name)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(modified), "category deleted successfully")))
}
