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

pub async fn create_tag(
    State(state): State<AppState>,
    payload: Result<Json<CreateNamedRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.text("name", &req.name, MAX_NAME_LEN);
    v.finish()?;

    let name = req.name.trim().to_string();
    let tag = state
        .run_db(move |stores, deadline| Ok(stores.tags.create(deadline, &name)?))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessEnvelope::new(Some(tag), "tag created successfully")),
    ))
}

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let tags = state
        .run_db(|stores, deadline| Ok(stores.tags.get_all(deadline)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(tags), "")))
}

pub async fn get_tag(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = path?;
    let tag = state
        .run_db(move |stores, deadline| Ok(stores.tags.get_by_id(deadline, id)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(tag), "")))
}

pub async fn get_tag_by_name(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(name) = path?;
    let tag = state
        .run_db(move |stores, deadline| Ok(stores.tags.get_by_name(deadline, &name)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(tag), "")))
}

pub async fn rename_tag(
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
        .run_db(move |stores, deadline| Ok(stores.tags.update_name(deadline, req.id, &name)?))
        .await?;

    Ok(Json(SuccessEnvelope::new(Some(modified), "tag updated successfully")))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = path?;
    let modified = state
        .run_db(move |stores, deadline| Ok(stores.tags.delete_by_id(deadline, id)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(modified), "tag deleted successfully")))
}

pub async fn delete_tag_by_name(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(name) = path?;
    let modified = state
        .run_db(move |stores, deadline| Ok(stores.tags.delete_by_name(deadline, &name)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(modified), "tag deleted successfully")))
}
