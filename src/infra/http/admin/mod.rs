mod auth;
mod errors;
mod health;
mod posts;
mod state;

pub use state::AdminState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use super::middleware::{log_responses, set_request_context};

pub fn build_admin_router(state: AdminState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.upload_limit_bytes);

    let routes = Router::new()
        .route(
            "/posts",
            get(posts::admin_posts)
                .post(posts::admin_post_store)
                .layer(upload_limit),
        )
        .route("/posts/mine", get(posts::admin_posts_mine))
        .route("/posts/create", get(posts::admin_post_create_form))
        .route(
            "/posts/{id}",
            get(posts::admin_post_show)
                .put(posts::admin_post_update)
                .post(posts::admin_post_update)
                .delete(posts::admin_post_delete)
                .layer(upload_limit),
        )
        .route("/posts/{id}/edit", get(posts::admin_post_edit))
        .route("/posts/{id}/delete", post(posts::admin_post_delete))
        .route("/getslug", get(posts::admin_get_slug))
        .route("/_health/db", get(health::admin_health));

    Router::new()
        .nest("/admin", routes)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}
