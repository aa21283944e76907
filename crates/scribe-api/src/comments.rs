use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use scribe_types::api::{Claims, CreateCommentRequest};
use scribe_types::envelope::SuccessEnvelope;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::Validator;

const MAX_COMMENT_LEN: usize = 5_000;

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.text("content", &req.content, MAX_COMMENT_LEN);
    v.finish()?;

    let comment = state
        .run_db(move |stores, deadline| {
            stores.articles.get_by_id(deadline, article_id)?;
            Ok(stores
                .comments
                .create(deadline, claims.sub, article_id, &req.content)?)
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessEnvelope::new(Some(comment), "comment added")),
    ))
}

pub async fn list_comments(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let comments = state
        .run_db(move |stores, deadline| {
            Ok(stores.comments.list_for_article(deadline, article_id)?)
        })
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(comments), "")))
}

/// Only the comment's author may delete it.
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(comment_id) = path?;
    let modified = state
        .run_db(move |stores, deadline| {
            let comment = stores.comments.get_by_id(deadline, comment_id)?;
            if comment.user_id != claims.sub {
                return Err(ApiError::Forbidden("only the author can delete this comment"));
            }
            Ok(stores.comments.delete(deadline, comment_id)?)
        })
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(modified), "comment deleted")))
}
