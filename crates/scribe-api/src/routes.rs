use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{articles, auth, categories, comments, engagement, follows, tags, users};

/// All `/v1` routes. Reads are public; anything that writes needs a bearer
/// token, except the auth endpoints themselves.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/request-password-reset", post(auth::request_password_reset))
        .route("/auth/reset-password", patch(auth::reset_password))
        .route("/categories", get(categories::list_categories))
        .route("/categories/{id}", get(categories::get_category))
        .route("/categories/name/{name}", get(categories::get_category_by_name))
        .route("/tags", get(tags::list_tags))
        .route("/tags/{id}", get(tags::get_tag))
        .route("/tags/name/{name}", get(tags::get_tag_by_name))
        .route("/articles", get(articles::list_articles))
        .route("/articles/{id}", get(articles::get_article))
        .route("/articles/{id}/likes", get(engagement::list_likes))
        .route("/articles/{id}/comments", get(comments::list_comments))
        .route("/users/{id}/followers", get(follows::list_followers))
        .route("/users/{id}/following", get(follows::list_following));

    let protected_routes = Router::new()
        .route("/users/me", patch(users::update_me))
        .route("/users/me/email", patch(users::update_email))
        .route("/users/me/password", patch(users::update_password))
        .route("/users/me/saved", get(engagement::list_my_saved))
        .route("/users/{id}", get(users::get_user))
        .route(
            "/users/{id}/follow",
            post(follows::follow_user).delete(follows::unfollow_user),
        )
        .route(
            "/categories",
            post(categories::create_category).patch(categories::rename_category),
        )
        .route("/categories/{id}", delete(categories::delete_category))
        .route(
            "/categories/name/{name}",
            delete(categories::delete_category_by_name),
        )
        .route("/tags", post(tags::create_tag).patch(tags::rename_tag))
        .route("/tags/{id}", delete(tags::delete_tag))
        .route("/tags/name/{name}", delete(tags::delete_tag_by_name))
        .route("/articles", post(articles::create_article))
        .route("/articles/drafts", post(articles::create_draft))
        .route(
            "/articles/{id}",
            patch(articles::update_article).delete(articles::delete_article),
        )
        .route("/articles/{id}/publish", post(articles::publish_article))
        .route("/articles/{id}/archive", post(articles::archive_article))
        .route(
            "/articles/{id}/like",
            post(engagement::like_article).delete(engagement::unlike_article),
        )
        .route(
            "/articles/{id}/save",
            post(engagement::save_article).delete(engagement::unsave_article),
        )
        .route("/articles/{id}/comments", post(comments::create_comment))
        .route("/comments/{id}", delete(comments::delete_comment))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/v1", public_routes.merge(protected_routes))
        .with_state(state)
}
