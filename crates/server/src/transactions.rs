//! Transaction endpoints.

use api_types::{
    page::Page,
    transaction::{TransactionNew, TransactionQuery, TransactionUpdate, TransactionView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{NewTransaction, User};
use uuid::Uuid;

use crate::{
    ServerError,
    convert::{
        filter_from_query, kind_from_api, page_from_query, page_view, parse_amount,
        transaction_view,
    },
    server::ServerState,
};

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Page<TransactionView>>, ServerError> {
    let filter = filter_from_query(&query)?;
    let page = page_from_query(&query)?;
    let result = state
        .engine
        .list_transactions(user.id, &filter, page)
        .await?;
    Ok(Json(page_view(result)))
}

pub async fn list_group(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Page<TransactionView>>, ServerError> {
    let filter = filter_from_query(&query)?;
    let page = page_from_query(&query)?;
    let result = state
        .engine
        .list_group_transactions(group_id, user.id, &filter, page)
        .await?;
    Ok(Json(page_view(result)))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let cmd = NewTransaction {
        name: payload.name,
        kind: kind_from_api(payload.kind),
        category: payload.category,
        amount: parse_amount(&payload.amount)?,
        occurred_at: payload.occurred_at,
        description: payload.description,
        is_recurring: payload.is_recurring,
        recurring_period_days: payload.recurring_period_days,
        next_run: payload.next_run,
        group_ids: payload.group_ids,
    };
    let tx = state
        .engine
        .create_transaction(user.id, cmd, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(transaction_view(tx))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(transaction_id, user.id).await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let cmd = engine::TransactionUpdate {
        name: payload.name,
        kind: payload.kind.map(kind_from_api),
        category: payload.category,
        amount: payload.amount.as_ref().map(parse_amount).transpose()?,
        occurred_at: payload.occurred_at,
        description: payload.description,
        is_recurring: payload.is_recurring,
        recurring_period_days: payload.recurring_period_days,
        next_run: payload.next_run,
        group_ids: payload.group_ids,
    };
    let tx = state
        .engine
        .update_transaction(transaction_id, user.id, cmd, Utc::now())
        .await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transaction(transaction_id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
