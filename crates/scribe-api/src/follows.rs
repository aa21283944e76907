use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use scribe_types::api::Claims;
use scribe_types::envelope::SuccessEnvelope;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn follow_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(user_id) = path?;
    let follow = state
        .run_db(move |stores, deadline| {
            stores.users.get_by_id(deadline, user_id)?;
            Ok(stores.followers.follow(deadline, claims.sub, user_id)?)
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessEnvelope::new(Some(follow), "user followed")),
    ))
}

pub async fn unfollow_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(user_id) = path?;
    let modified = state
        .run_db(move |stores, deadline| {
            Ok(stores.followers.unfollow(deadline, claims.sub, user_id)?)
        })
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(modified), "user unfollowed")))
}

pub async fn list_followers(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(user_id) = path?;
    let followers = state
        .run_db(move |stores, deadline| Ok(stores.followers.list_followers(deadline, user_id)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(followers), "")))
}

pub async fn list_following(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(user_id) = path?;
    let followed = state
        .run_db(move |stores, deadline| Ok(stores.followers.list_followed(deadline, user_id)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(followed), "")))
}
