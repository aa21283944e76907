//! Registration, login and the password-reset flow, plus the credential
//! primitives they share.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use scribe_db::ErrorKind;
use scribe_db::users::NewUser;
use scribe_types::api::{
    Claims, LoginRequest, LoginResponse, PasswordResetIssued, PasswordResetRequest,
    RegisterRequest, RegisterResponse, ResetPasswordRequest,
};
use scribe_types::envelope::SuccessEnvelope;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::{MAX_NAME_LEN, Validator};

pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.email("email", &req.email);
    v.password("password", &req.password);
    v.text("first_name", &req.first_name, MAX_NAME_LEN);
    v.text("last_name", &req.last_name, MAX_NAME_LEN);
    v.finish()?;

    // Hashing is CPU-bound, so it runs on the blocking pool with the insert.
    let user = state
        .run_db(move |stores, deadline| {
            let password_hash = hash_password(&req.password)?;
            let user = stores.users.create(
                deadline,
                &NewUser {
                    email: req.email,
                    password_hash,
                    first_name: req.first_name,
                    last_name: req.last_name,
                    bio: req.bio,
                    profile_picture_url: req.profile_picture_url,
                },
            )?;
            Ok(user)
        })
        .await?;

    let token = create_token(&state.jwt_secret, user.id, &user.email)?;
    info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(SuccessEnvelope::new(
            Some(RegisterResponse { user, token }),
            "user registered successfully",
        )),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.email("email", &req.email);
    v.check(!req.password.is_empty(), "password", "password is required");
    v.finish()?;

    let user = state
        .run_db(move |stores, deadline| {
            let user = match stores.users.get_by_email(deadline, &req.email) {
                Ok(user) => user,
                Err(err) if err.is(ErrorKind::RecordNotFound) => {
                    return Err(ApiError::InvalidCredentials);
                }
                Err(err) => return Err(err.into()),
            };
            if !verify_password(&req.password, &user.password_hash) {
                return Err(ApiError::InvalidCredentials);
            }
            Ok(user)
        })
        .await?;

    let token = create_token(&state.jwt_secret, user.id, &user.email)?;

    Ok(Json(SuccessEnvelope::new(
        Some(LoginResponse {
            user_id: user.id,
            email: user.email,
            token,
        }),
        "login successful",
    )))
}

/// Issues (or supersedes) the user's reset token. Unknown emails get the
/// same message and no token.
pub async fn request_password_reset(
    State(state): State<AppState>,
    payload: Result<Json<PasswordResetRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.email("email", &req.email);
    v.finish()?;

    let issued = state
        .run_db(move |stores, deadline| {
            let user = match stores.users.get_by_email(deadline, &req.email) {
                Ok(user) => user,
                Err(err) if err.is(ErrorKind::RecordNotFound) => return Ok(None),
                Err(err) => return Err(err.into()),
            };
            let (reset_token, expiration) = generate_reset_token();
            let token = stores
                .reset_tokens
                .issue(deadline, user.id, &reset_token, expiration)?;
            Ok(Some(PasswordResetIssued {
                reset_token: token.reset_token,
                expiration: token.expiration,
            }))
        })
        .await?;

    Ok(Json(SuccessEnvelope::new(
        issued,
        "a reset token has been sent to your email if you have an account",
    )))
}

pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.check(!req.reset_token.is_empty(), "reset_token", "reset_token is required");
    v.password("new_password", &req.new_password);
    v.finish()?;

    let modified = state
        .run_db(move |stores, deadline| {
            let token = stores.reset_tokens.get_by_token(deadline, &req.reset_token)?;
            if token.is_expired(Utc::now()) {
                stores.reset_tokens.delete_by_token(deadline, &req.reset_token)?;
                return Err(ApiError::Expired("password reset token has expired"));
            }

            let password_hash = hash_password(&req.new_password)?;
            Ok(stores
                .reset_tokens
                .redeem(deadline, &req.reset_token, &password_hash)?)
        })
        .await?;

    info!(user_id = %modified.id, "password reset");
    Ok(Json(SuccessEnvelope::new(
        Some(modified),
        "password has been reset successfully",
    )))
}

pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> ApiResult<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (Utc::now() + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

/// 32 random bytes, URL-safe base64 without padding.
pub fn generate_reset_token() -> (String, DateTime<Utc>) {
    let bytes: [u8; 32] = rand::random();
    (URL_SAFE_NO_PAD.encode(bytes), Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES))
}
