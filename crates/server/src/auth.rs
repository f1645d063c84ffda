//! Registration, login and token endpoints.

use api_types::auth::{ChangePassword, Message, Token, UserLogin, UserRegister, UserView};
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;
use engine::{NewUser, User};
use uuid::Uuid;

use crate::{ServerError, convert::user_view, server::ServerState};

fn bearer_token(state: &ServerState, user_id: Uuid) -> Result<Json<Token>, ServerError> {
    let access_token = state.tokens.create_token(user_id)?;
    Ok(Json(Token {
        access_token,
        token_type: "bearer".to_string(),
        user_id,
    }))
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<UserRegister>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state
        .engine
        .register(
            NewUser {
                first_name: payload.first_name,
                last_name: payload.last_name,
                login: payload.login,
                password: payload.password,
            },
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(user_view(user))))
}

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<Token>, ServerError> {
    let user = state
        .engine
        .authenticate(&payload.login, &payload.password)
        .await?;
    tracing::debug!(user_id = %user.id, "login succeeded");
    bearer_token(&state, user.id)
}

pub async fn me(Extension(user): Extension<User>) -> Json<UserView> {
    Json(user_view(user))
}

pub async fn change_password(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ChangePassword>,
) -> Result<Json<Message>, ServerError> {
    state
        .engine
        .change_password(user.id, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(Message {
        message: "password changed".to_string(),
    }))
}

pub async fn refresh_token(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Token>, ServerError> {
    bearer_token(&state, user.id)
}
