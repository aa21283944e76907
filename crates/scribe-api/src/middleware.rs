use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use uuid::Uuid;

use scribe_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Validate the bearer token and make its [`Claims`] available to the
/// handler as `Extension<Claims>`.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| ApiError::Unauthorized("missing or malformed bearer token"))?;

    let claims = decode_token(&state.jwt_secret, bearer.token())
        .ok_or(ApiError::Unauthorized("invalid or expired token"))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// The caller's user id on routes where a token is optional. A missing or
/// invalid token reads as anonymous.
pub fn viewer(
    secret: &str,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
) -> Option<Uuid> {
    let TypedHeader(Authorization(bearer)) = bearer.ok()?;
    decode_token(secret, bearer.token()).map(|claims| claims.sub)
}

pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .ok()
    .map(|data| data.claims)
}
