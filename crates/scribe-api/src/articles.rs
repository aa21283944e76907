//! Article lifecycle handlers: create (published or draft), read, list,
//! partial update, publish, archive, delete. Only the author may change an
//! article.

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use tracing::info;
use uuid::Uuid;

use scribe_db::articles::{ArticleFilter, ArticlePatch, NewArticle};
use scribe_db::filters::Filters;
use scribe_db::{DbError, Deadline, ErrorKind, Stores};
use scribe_types::api::{ArticleListQuery, Claims, CreateArticleRequest, UpdateArticleRequest};
use scribe_types::envelope::SuccessEnvelope;
use scribe_types::models::ArticleStatus;

use crate::error::{ApiError, ApiResult};
use crate::middleware::viewer;
use crate::state::AppState;
use crate::validation::{MAX_TAGS_PER_ARTICLE, MAX_TITLE_LEN, Validator};

/// Create and publish in one step. Title and content are required.
pub async fn create_article(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateArticleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.text("title", &req.title, MAX_TITLE_LEN);
    v.check(!req.content.trim().is_empty(), "content", "content is required");
    check_tags(&mut v, &req.tag_ids);
    v.finish()?;

    insert(state, claims, req, ArticleStatus::Published, "article published successfully").await
}

/// Save a draft. Title and content may be empty until publish.
pub async fn create_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateArticleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.check(
        req.title.chars().count() <= MAX_TITLE_LEN,
        "title",
        format!("title must not be more than {MAX_TITLE_LEN} characters"),
    );
    check_tags(&mut v, &req.tag_ids);
    v.finish()?;

    insert(state, claims, req, ArticleStatus::Draft, "draft saved successfully").await
}

async fn insert(
    state: AppState,
    claims: Claims,
    req: CreateArticleRequest,
    status: ArticleStatus,
    message: &'static str,
) -> ApiResult<impl IntoResponse> {
    let new = NewArticle {
        author_id: claims.sub,
        title: req.title,
        content: req.content,
        status,
        category_id: req.category_id,
        tag_ids: req.tag_ids,
    };
    let article = state
        .run_db(move |stores, deadline| {
            stores.users.get_by_id(deadline, new.author_id)?;
            if let Some(category_id) = new.category_id {
                stores.categories.get_by_id(deadline, category_id)?;
            }
            Ok(stores.articles.create(deadline, &new)?)
        })
        .await?;

    info!(article_id = %article.id, status = %article.status, "article created");
    Ok((
        StatusCode::CREATED,
        Json(SuccessEnvelope::new(Some(article), message)),
    ))
}

/// Drafts are visible to their author only; anyone else gets a 404.
pub async fn get_article(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let viewer = viewer(&state.jwt_secret, bearer);
    let article = state
        .run_db(move |stores, deadline| Ok(stores.articles.get_by_id(deadline, article_id)?))
        .await?;
    if article.status == ArticleStatus::Draft && viewer != Some(article.author_id) {
        return Err(DbError::new(
            ErrorKind::RecordNotFound,
            "article_getbyid",
            "requested record does not exist",
        )
        .into());
    }
    Ok(Json(SuccessEnvelope::new(Some(article), "")))
}

/// Without a `status` filter only published articles are listed. Listing
/// drafts needs a token and only returns the caller's own.
pub async fn list_articles(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    query: Result<Query<ArticleListQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let status = query.status.unwrap_or(ArticleStatus::Published);

    let mut author_id = query.author_id;
    if status == ArticleStatus::Draft {
        let viewer = viewer(&state.jwt_secret, bearer)
            .ok_or(ApiError::Unauthorized("sign in to list drafts"))?;
        if author_id.is_some_and(|id| id != viewer) {
            return Err(ApiError::Forbidden("drafts are visible to their author only"));
        }
        author_id = Some(viewer);
    }

    let filters = Filters::new(query.page, query.page_size);
    let mut v = Validator::new();
    for (field, problem) in filters.validate() {
        v.check(false, field, problem);
    }
    v.finish()?;

    let filter = ArticleFilter {
        author_id,
        status: Some(status),
        category_id: query.category_id,
    };
    let (articles, pagination) = state
        .run_db(move |stores, deadline| Ok(stores.articles.list(deadline, &filters, &filter)?))
        .await?;

    Ok(Json(
        SuccessEnvelope::new(Some(articles), "").with_pagination(pagination),
    ))
}

pub async fn update_article(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateArticleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let Json(req) = payload?;

    let mut v = Validator::new();
    if let Some(title) = &req.title {
        v.check(
            title.chars().count() <= MAX_TITLE_LEN,
            "title",
            format!("title must not be more than {MAX_TITLE_LEN} characters"),
        );
    }
    if let Some(tag_ids) = &req.tag_ids {
        check_tags(&mut v, tag_ids);
    }
    v.finish()?;

    let patch = ArticlePatch {
        title: req.title,
        content: req.content,
        status: None,
        category_id: req.category_id,
        tag_ids: req.tag_ids,
    };
    apply(state, claims, article_id, patch, "article updated successfully").await
}

pub async fn publish_article(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let patch = ArticlePatch {
        status: Some(ArticleStatus::Published),
        ..Default::default()
    };
    apply(state, claims, article_id, patch, "article published successfully").await
}

pub async fn archive_article(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let patch = ArticlePatch {
        status: Some(ArticleStatus::Archived),
        ..Default::default()
    };
    apply(state, claims, article_id, patch, "article archived successfully").await
}

async fn apply(
    state: AppState,
    claims: Claims,
    article_id: Uuid,
    patch: ArticlePatch,
    message: &'static str,
) -> ApiResult<impl IntoResponse> {
    let modified = state
        .run_db(move |stores, deadline| {
            ensure_author(stores, deadline, article_id, claims.sub)?;
            if let Some(category_id) = patch.category_id {
                stores.categories.get_by_id(deadline, category_id)?;
            }
            Ok(stores.articles.update(deadline, article_id, &patch)?)
        })
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(modified), message)))
}

pub async fn delete_article(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(article_id) = path?;
    let modified = state
        .run_db(move |stores, deadline| {
            ensure_author(stores, deadline, article_id, claims.sub)?;
            Ok(stores.articles.delete(deadline, article_id)?)
        })
        .await?;

    info!(article_id = %article_id, "article deleted");
    Ok(Json(SuccessEnvelope::new(
        Some(modified),
        "article deleted successfully",
    )))
}

fn ensure_author(stores: &Stores, deadline: &Deadline, article_id: Uuid, user_id: Uuid) -> ApiResult<()> {
    let article = stores.articles.get_by_id(deadline, article_id)?;
    if article.author_id != user_id {
        return Err(ApiError::Forbidden("only the author can modify this article"));
    }
    Ok(())
}

fn check_tags(v: &mut Validator, tag_ids: &[i64]) {
    v.check(
        tag_ids.len() <= MAX_TAGS_PER_ARTICLE,
        "tag_ids",
        format!("an article can have at most {MAX_TAGS_PER_ARTICLE} tags"),
    );
    v.check(
        tag_ids.iter().all(|id| *id > 0),
        "tag_ids",
        "tag ids must be positive integers",
    );
}
