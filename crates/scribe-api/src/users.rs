use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    response::IntoResponse,
};
use uuid::Uuid;

use scribe_db::users::UserPatch;
use scribe_types::api::{Claims, UpdateEmailRequest, UpdatePasswordRequest, UpdateUserRequest};
use scribe_types::envelope::SuccessEnvelope;

use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::{MAX_NAME_LEN, Validator};

pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(user_id) = path?;
    let user = state
        .run_db(move |stores, deadline| Ok(stores.users.get_by_id(deadline, user_id)?))
        .await?;
    Ok(Json(SuccessEnvelope::new(Some(user), "")))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    if let Some(first_name) = &req.first_name {
        v.text("first_name", first_name, MAX_NAME_LEN);
    }
    if let Some(last_name) = &req.last_name {
        v.text("last_name", last_name, MAX_NAME_LEN);
    }
    v.finish()?;

    let patch = UserPatch {
        first_name: req.first_name,
        last_name: req.last_name,
        bio: req.bio,
        profile_picture_url: req.profile_picture_url,
        activated: req.activated,
    };
    let user = state
        .run_db(move |stores, deadline| {
            Ok(stores.users.update_details(deadline, claims.sub, &patch)?)
        })
        .await?;

    Ok(Json(SuccessEnvelope::new(Some(user), "user updated successfully")))
}

/// Requires the current password. The old email is read from the stored
/// row, not from the token, so a stale token cannot move someone else's
/// address.
pub async fn update_email(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<UpdateEmailRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.email("new_email", &req.new_email);
    v.check(!req.password.is_empty(), "password", "password is required");
    v.finish()?;

    let modified = state
        .run_db(move |stores, deadline| {
            let user = stores.users.get_by_id(deadline, claims.sub)?;
            if !verify_password(&req.password, &user.password_hash) {
                return Err(ApiError::InvalidCredentials);
            }
            Ok(stores
                .users
                .update_email(deadline, &user.email, &req.new_email)?)
        })
        .await?;

    Ok(Json(SuccessEnvelope::new(
        Some(modified),
        "user email updated successfully",
    )))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.check(
        !req.current_password.is_empty(),
        "current_password",
        "current_password is required",
    );
    v.password("new_password", &req.new_password);
    v.finish()?;

    let modified = state
        .run_db(move |stores, deadline| {
            let user = stores.users.get_by_id(deadline, claims.sub)?;
            if !verify_password(&req.current_password, &user.password_hash) {
                return Err(ApiError::InvalidCredentials);
            }
            let password_hash = hash_password(&req.new_password)?;
            Ok(stores
                .users
                .update_password(deadline, &user.email, &password_hash)?)
        })
        .await?;

    Ok(Json(SuccessEnvelope::new(
        Some(modified),
        "user password updated successfully",
    )))
}
