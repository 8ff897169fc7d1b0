//! Blog handlers
//!
//! Reading and commenting are public. Writing needs the admin or author
//! role (enforced by the route guard); authors may only delete or toggle
//! their own posts, which is checked here.

use super::{parse_id, IdRequest, MessageResponse};
use crate::auth::Identity;
use crate::content::{Blog, Comment, NewBlog, NewComment};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct BlogListResponse {
    pub success: bool,
    pub blogs: Vec<Blog>,
}

impl BlogListResponse {
    fn new(blogs: Vec<Blog>) -> Self {
        Self {
            success: true,
            blogs,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlogResponse {
    pub success: bool,
    pub blog: Blog,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentListResponse {
    pub success: bool,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
pub struct BlogCommentsRequest {
    pub blog_id: Uuid,
}

/// Published posts
pub async fn list_published(State(state): State<Arc<AppState>>) -> Json<BlogListResponse> {
    Json(BlogListResponse::new(state.content.list_blogs(false).await))
}

pub async fn get_blog(
    State(state): State<Arc<AppState>>,
    Path(blog_id): Path<String>,
) -> Result<Json<BlogResponse>, AppError> {
    let blog = state.content.get_blog(parse_id(&blog_id, "Blog")?).await?;
    Ok(Json(BlogResponse {
        success: true,
        blog,
    }))
}

/// Published posts by author subject (email)
pub async fn list_by_author(
    State(state): State<Arc<AppState>>,
    Path(author): Path<String>,
) -> Json<BlogListResponse> {
    let blogs = state.content.blogs_by_author(&author).await;
    Json(BlogListResponse::new(
        blogs.into_iter().filter(|b| b.is_published).collect(),
    ))
}

/// Queue a comment for moderation
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(comment) = payload?;
    state.content.add_comment(comment).await?;
    Ok(Json(MessageResponse::ok("Comment added for review")))
}

/// Approved comments of one post
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BlogCommentsRequest>, JsonRejection>,
) -> Result<Json<CommentListResponse>, AppError> {
    let Json(request) = payload?;
    Ok(Json(CommentListResponse {
        success: true,
        comments: state.content.approved_comments(request.blog_id).await,
    }))
}

pub async fn add_blog(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    payload: Result<Json<NewBlog>, JsonRejection>,
) -> Result<Json<BlogResponse>, AppError> {
    let Json(blog) = payload?;
    blog.validate()?;

    let author = state.auth.profile(&identity).await?;
    let blog = state
        .content
        .add_blog(blog, identity.subject(), &author.name)
        .await;

    tracing::info!(blog_id = %blog.id, author = %identity.subject(), "Blog added");
    Ok(Json(BlogResponse {
        success: true,
        blog,
    }))
}

/// Authors may only touch their own posts
async fn owned_blog(state: &AppState, identity: &Identity, id: Uuid) -> Result<Blog, AppError> {
    let blog = state.content.get_blog(id).await?;
    if !identity.is_admin() && blog.author != identity.subject() {
        return Err(AppError::Forbidden(
            "You can only manage your own posts".to_string(),
        ));
    }
    Ok(blog)
}

pub async fn delete_blog(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    payload: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<BlogResponse>, AppError> {
    let Json(IdRequest { id }) = payload?;
    owned_blog(&state, &identity, id).await?;

    let blog = state.content.delete_blog(id).await?;
    tracing::info!(blog_id = %id, by = %identity.subject(), "Blog deleted");
    Ok(Json(BlogResponse {
        success: true,
        blog,
    }))
}

pub async fn toggle_publish(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    payload: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<BlogResponse>, AppError> {
    let Json(IdRequest { id }) = payload?;
    owned_blog(&state, &identity, id).await?;

    let blog = state.content.toggle_publish(id).await?;
    Ok(Json(BlogResponse {
        success: true,
        blog,
    }))
}

/// Posts written by the caller, drafts included
pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Json<BlogListResponse> {
    Json(BlogListResponse::new(
        state.content.blogs_by_author(identity.subject()).await,
    ))
}
