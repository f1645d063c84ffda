//! Group and membership endpoints.

use api_types::group::{GroupNew, GroupView, MemberView, MembershipResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::User;
use uuid::Uuid;

use crate::{
    ServerError,
    convert::{group_view, member_view, membership_status},
    server::ServerState,
};

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<GroupView>>, ServerError> {
    let groups = state.engine.groups_for_user(user.id).await?;
    Ok(Json(groups.into_iter().map(group_view).collect()))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupView>), ServerError> {
    let group = state
        .engine
        .create_group(&payload.name, user.id, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(group_view(group))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupView>, ServerError> {
    let group = state.engine.group(group_id, user.id).await?;
    Ok(Json(group_view(group)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<GroupNew>,
) -> Result<Json<GroupView>, ServerError> {
    let group = state
        .engine
        .rename_group(group_id, &payload.name, user.id)
        .await?;
    Ok(Json(group_view(group)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_group(group_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn members(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<MemberView>>, ServerError> {
    let members = state.engine.group_members(group_id, user.id).await?;
    Ok(Json(members.into_iter().map(member_view).collect()))
}

pub async fn add_member(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MembershipResponse>, ServerError> {
    let change = state
        .engine
        .add_member(group_id, user_id, user.id, Utc::now())
        .await?;
    Ok(Json(MembershipResponse {
        group_id,
        user_id,
        status: membership_status(change),
    }))
}

pub async fn remove_member(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MembershipResponse>, ServerError> {
    let change = state
        .engine
        .remove_member(group_id, user_id, user.id)
        .await?;
    Ok(Json(MembershipResponse {
        group_id,
        user_id,
        status: membership_status(change),
    }))
}
