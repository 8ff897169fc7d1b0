//! API route definitions
//!
//! Each protected group stacks `authenticate` (outer) in front of
//! `require_roles` (inner), so the guard always sees an identity.

use crate::auth::middleware::{authenticate, require_roles};
use crate::handlers::{admin, auth, blog, moments};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use moments_core::Role;
use std::sync::Arc;

/// Roles allowed to write blog posts
pub const WRITERS: &[Role] = &[Role::Admin, Role::Author];

/// Admin area
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Create the `/api` routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/admin/login", post(auth::admin_login_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/blog/all", get(blog::list_published))
        .route("/blog/:blog_id", get(blog::get_blog))
        .route("/blog/user/:author", get(blog::list_by_author))
        .route("/blog/add-comment", post(blog::add_comment))
        .route("/blog/comments", post(blog::list_comments))
        .route("/moments", get(moments::list_moments));

    // Any authenticated account
    let session_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    // Admin or author
    let writer_routes = Router::new()
        .route("/blog/add", post(blog::add_blog))
        .route("/blog/delete", post(blog::delete_blog))
        .route("/blog/toggle-publish", post(blog::toggle_publish))
        .route("/blog/mine", get(blog::list_mine))
        .route_layer(middleware::from_fn(require_roles(WRITERS)))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    // Admin only
    let admin_routes = Router::new()
        .route("/admin/blogs", get(admin::list_blogs))
        .route("/admin/comments", get(admin::list_comments))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/approve-comment", post(admin::approve_comment))
        .route("/admin/delete-comment", post(admin::delete_comment))
        .route("/moments", post(moments::create_moment))
        .route("/moments/:id", delete(moments::delete_moment))
        .route_layer(middleware::from_fn(require_roles(ADMIN_ONLY)))
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(writer_routes)
        .merge(admin_routes)
}
