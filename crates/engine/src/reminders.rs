//! Reminder classification for recurring transactions.
//!
//! The scan is read-only: it never touches `next_run`. Each recurring
//! transaction falls into at most one [`ReminderBucket`] depending on how many
//! calendar days separate its next run from today.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, Transaction, transactions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderBucket {
    DueToday,
    DueTomorrow,
    DueIn3Days,
    DueInWeek,
    Overdue { days: i64 },
}

impl ReminderBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DueToday => "due_today",
            Self::DueTomorrow => "due_tomorrow",
            Self::DueIn3Days => "due_in_3_days",
            Self::DueInWeek => "due_in_week",
            Self::Overdue { .. } => "overdue",
        }
    }

    /// Days overdue, for the `Overdue` bucket only.
    pub fn overdue_days(self) -> Option<i64> {
        match self {
            Self::Overdue { days } => Some(days),
            _ => None,
        }
    }
}

/// Calendar-day distance between `next_run` and `now` (UTC dates).
///
/// Elapsed hours are irrelevant: 23:59 today and 00:01 tomorrow are one day
/// apart.
pub fn days_left(next_run: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (next_run.date_naive() - now.date_naive()).num_days()
}

/// Picks the bucket for a transaction scheduled at `next_run`.
pub fn classify(next_run: DateTime<Utc>, now: DateTime<Utc>) -> Option<ReminderBucket> {
    match days_left(next_run, now) {
        0 => Some(ReminderBucket::DueToday),
        1 => Some(ReminderBucket::DueTomorrow),
        3 => Some(ReminderBucket::DueIn3Days),
        7 => Some(ReminderBucket::DueInWeek),
        days if days < 0 => Some(ReminderBucket::Overdue { days: -days }),
        _ => None,
    }
}

/// A notification about an upcoming or overdue recurring transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: String,
    pub amount_minor: i64,
    pub next_run: DateTime<Utc>,
    pub bucket: ReminderBucket,
}

impl ReminderEvent {
    pub fn amount(&self) -> Money {
        Money::new(self.amount_minor)
    }
}

/// Receives reminder events for delivery (log, webhook, ...).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: &ReminderEvent);
}

/// Which recurring transactions a scan looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReminderScope {
    All,
    User(Uuid),
}

/// A single pass over the recurring transactions loaded for a scan.
///
/// Rows are classified lazily as the iterator advances; malformed rows are
/// skipped with a warning.
#[derive(Debug)]
pub struct ReminderScan {
    rows: std::vec::IntoIter<transactions::Model>,
    now: DateTime<Utc>,
}

impl ReminderScan {
    pub(crate) fn new(rows: Vec<transactions::Model>, now: DateTime<Utc>) -> Self {
        Self {
            rows: rows.into_iter(),
            now,
        }
    }

    fn event_for(&self, model: transactions::Model) -> Option<ReminderEvent> {
        let tx = match Transaction::try_from(model) {
            Ok(tx) => tx,
            Err(err) => {
                tracing::warn!("skipping malformed recurring transaction: {err}");
                return None;
            }
        };
        let next_run = tx.next_run?;
        let bucket = classify(next_run, self.now)?;
        Some(ReminderEvent {
            transaction_id: tx.id,
            user_id: tx.user_id,
            name: tx.name,
            category: tx.category,
            amount_minor: tx.amount_minor,
            next_run,
            bucket,
        })
    }
}

impl Iterator for ReminderScan {
    type Item = ReminderEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let model = self.rows.next()?;
            if let Some(event) = self.event_for(model) {
                return Some(event);
            }
        }
    }
}
