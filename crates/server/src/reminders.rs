use api_types::reminder::RemindersResponse;
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use engine::{ReminderScope, User};

use crate::{ServerError, convert::reminder_view, server::ServerState};

/// Runs a reminder scan over the caller's recurring transactions, pushes
/// every event to the configured sink and returns them.
pub async fn check(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<RemindersResponse>, ServerError> {
    let scan = state
        .engine
        .scan_reminders(ReminderScope::User(user.id), Utc::now())
        .await?;

    let events: Vec<_> = scan
        .inspect(|event| state.sink.notify(event))
        .map(|event| reminder_view(&event))
        .collect();

    Ok(Json(RemindersResponse {
        count: events.len(),
        events,
    }))
}
