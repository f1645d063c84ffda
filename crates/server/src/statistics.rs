use api_types::{stats::Statistic, transaction::TransactionQuery};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use engine::{StatsScope, User};
use uuid::Uuid;

use crate::{
    ServerError,
    convert::{filter_from_query, period_from_query, statistic_view},
    server::ServerState,
};

async fn statistics_for(
    state: &ServerState,
    user: &User,
    scope: StatsScope,
    query: &TransactionQuery,
) -> Result<Json<Statistic>, ServerError> {
    let filter = filter_from_query(query)?;
    let period = period_from_query(query)?;
    let stats = state
        .engine
        .statistics(user.id, scope, &filter, period)
        .await?;
    Ok(Json(statistic_view(stats)))
}

pub async fn user_stats(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Statistic>, ServerError> {
    statistics_for(&state, &user, StatsScope::User(user.id), &query).await
}

pub async fn group_stats(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Statistic>, ServerError> {
    statistics_for(&state, &user, StatsScope::Group(group_id), &query).await
}
