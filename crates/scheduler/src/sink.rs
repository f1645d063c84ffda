use engine::{NotificationSink, ReminderEvent};

/// Writes reminder events to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &ReminderEvent) {
        tracing::info!(
            user_id = %event.user_id,
            transaction_id = %event.transaction_id,
            bucket = event.bucket.as_str(),
            days_overdue = event.bucket.overdue_days(),
            next_run = %event.next_run,
            "reminder: {} ({}) {}",
            event.name,
            event.category,
            event.amount()
        );
    }
}
