use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, prelude::*};

use crate::{ReminderScan, ReminderScope, ResultEngine, transactions};

use super::Engine;

impl Engine {
    /// Loads the recurring transactions in `scope` and returns a single-pass
    /// scan classifying them against `now`.
    ///
    /// Nothing is written.
    pub async fn scan_reminders(
        &self,
        scope: ReminderScope,
        now: DateTime<Utc>,
    ) -> ResultEngine<ReminderScan> {
        self.with_tx(|_engine, db_tx| {
            Box::pin(async move {
                let mut query = transactions::Entity::find()
                    .filter(transactions::Column::IsRecurring.eq(true))
                    .filter(transactions::Column::NextRun.is_not_null());
                if let ReminderScope::User(user_id) = scope {
                    query = query.filter(transactions::Column::UserId.eq(user_id.to_string()));
                }
                let rows = query
                    .order_by_asc(transactions::Column::NextRun)
                    .order_by_asc(transactions::Column::Id)
                    .all(db_tx)
                    .await?;
                Ok(ReminderScan::new(rows, now))
            })
        })
        .await
    }
}
