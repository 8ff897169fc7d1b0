//! Admin area handlers (admin role only)

use super::blog::{BlogListResponse, CommentListResponse};
use super::{IdRequest, MessageResponse};
use crate::content::Dashboard;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub dashboard: Dashboard,
}

/// Every post, drafts included
pub async fn list_blogs(State(state): State<Arc<AppState>>) -> Json<BlogListResponse> {
    Json(BlogListResponse {
        success: true,
        blogs: state.content.list_blogs(true).await,
    })
}

/// Every comment, approved or pending
pub async fn list_comments(State(state): State<Arc<AppState>>) -> Json<CommentListResponse> {
    Json(CommentListResponse {
        success: true,
        comments: state.content.all_comments().await,
    })
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        success: true,
        dashboard: state.content.dashboard().await,
    })
}

pub async fn approve_comment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(IdRequest { id }) = payload?;
    state.content.approve_comment(id).await?;
    Ok(Json(MessageResponse::ok("Comment approved successfully")))
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(IdRequest { id }) = payload?;
    state.content.delete_comment(id).await?;
    Ok(Json(MessageResponse::ok("Comment deleted successfully")))
}
