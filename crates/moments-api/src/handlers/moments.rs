//! Photo moment handlers
//!
//! Listing is public; posting and deleting need the admin role.

use super::{parse_id, MessageResponse};
use crate::auth::Identity;
use crate::content::{Moment, NewMoment};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

/// All moments, latest date first
pub async fn list_moments(State(state): State<Arc<AppState>>) -> Json<Vec<Moment>> {
    Json(state.content.list_moments().await)
}

pub async fn create_moment(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    payload: Result<Json<NewMoment>, JsonRejection>,
) -> Result<(StatusCode, Json<Moment>), AppError> {
    let Json(moment) = payload?;
    moment.validate()?;

    let moment = state.content.add_moment(moment, identity.subject()).await;
    tracing::info!(moment_id = %moment.id, by = %identity.subject(), "Moment created");
    Ok((StatusCode::CREATED, Json(moment)))
}

pub async fn delete_moment(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id, "Moment")?;
    state.content.delete_moment(id).await?;
    tracing::info!(moment_id = %id, by = %identity.subject(), "Moment deleted");
    Ok(Json(MessageResponse::ok("Moment deleted successfully")))
}
