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

pub async fn like_article(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let like = state
        .run_db(move |stores, deadline| {
            stores.articles.get_by_id(deadline, article_id)?;
            Ok(stores.articles.like(deadline, claims.sub, article_id)?)
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessEnvelope::new(Some(like), "article liked")),
    ))
}

pub async fn unlike_article(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let modified = state
        .run_db(move |stores, deadline| {
            Ok(stores.articles.unlike(deadline, claims.sub, article_id)?)
        })
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(modified), "article unliked")))
}

pub async fn list_likes(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let likes = state
        .run_db(move |stores, deadline| Ok(stores.articles.list_likes(deadline, article_id)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(likes), "")))
}

pub async fn save_article(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let saved = state
        .run_db(move |stores, deadline| {
            stores.articles.get_by_id(deadline, article_id)?;
            Ok(stores.articles.save(deadline, claims.sub, article_id)?)
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessEnvelope::new(Some(saved), "article saved")),
    ))
}

pub async fn unsave_article(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let modified = state
        .run_db(move |stores, deadline| {
            Ok(stores.articles.unsave(deadline, claims.sub, article_id)?)
        })
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(modified), "article removed from saved")))
}

pub async fn list_my_saved(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let saved = state
        .run_db(move |stores, deadline| Ok(stores.articles.list_saved(deadline, claims.sub)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(saved), "")))
}
