use api_types::ErrorBody;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use server::{ServerState, router, run_with_listener, spawn_with_listener};

mod auth;
mod convert;
mod groups;
mod reminders;
mod server;
mod statistics;
mod transactions;

pub mod types {
    pub mod auth {
        pub use api_types::auth::{ChangePassword, Message, Token, UserLogin, UserRegister, UserView};
    }

    pub mod group {
        pub use api_types::group::{
            GroupNew, GroupView, MemberView, MembershipResponse, MembershipRole, MembershipStatus,
        };
    }

    pub mod transaction {
        pub use api_types::transaction::{
            Amount, GroupRef, TransactionKind, TransactionNew, TransactionQuery,
            TransactionUpdate, TransactionView,
        };
    }

    pub mod page {
        pub use api_types::page::Page;
    }

    pub mod stats {
        pub use api_types::stats::Statistic;
    }

    pub mod reminder {
        pub use api_types::reminder::{ReminderView, RemindersResponse};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::InvalidId(_) => StatusCode::BAD_REQUEST,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidRecurrence(_)
        | EngineError::InvalidInput(_)
        | EngineError::InvalidPage(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
