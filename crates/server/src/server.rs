use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use std::{future::Future, sync::Arc};

use crate::{ServerError, auth, groups, reminders, statistics, transactions};
use api_types::Health;
use engine::{Engine, EngineError, NotificationSink, TokenIssuer};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub tokens: Arc<TokenIssuer>,
    /// Receives the events of manually triggered reminder scans.
    pub sink: Arc<dyn NotificationSink>,
}

/// Resolves the bearer token to a user and stores it in the request
/// extensions.
///
/// Missing, invalid and expired tokens, and tokens of deleted users, all
/// answer 401.
async fn auth(
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(EngineError::Unauthorized("missing bearer token".to_string()).into());
    };

    let user_id = state.tokens.decode_token(bearer.token())?;
    let user = state.engine.user(user_id).await.map_err(|err| match err {
        EngineError::KeyNotFound(_) => EngineError::Unauthorized("unknown user".to_string()),
        other => other,
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

/// Builds the full HTTP router.
pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/change-password", put(auth::change_password))
        .route("/api/auth/refresh-token", post(auth::refresh_token))
        .route("/api/groups", get(groups::list).post(groups::create))
        .route(
            "/api/groups/{id}",
            get(groups::get).put(groups::update).delete(groups::delete),
        )
        .route("/api/groups/{id}/users", get(groups::members))
        .route(
            "/api/groups/{id}/users/{user_id}",
            post(groups::add_member).delete(groups::remove_member),
        )
        .route(
            "/api/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route("/api/transactions/stats", get(statistics::user_stats))
        .route("/api/transactions/group/{id}", get(transactions::list_group))
        .route(
            "/api/transactions/group/{id}/stats",
            get(statistics::group_stats),
        )
        .route(
            "/api/transactions/{id}",
            get(transactions::get)
                .put(transactions::update)
                .delete(transactions::delete),
        )
        .route("/reminders", get(reminders::check))
        .route_layer(middleware::from_fn_with_state(state.clone(), self::auth));

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

/// Serves until `shutdown` resolves.
pub async fn run_with_listener<F>(
    state: ServerState,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener, std::future::pending()).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
