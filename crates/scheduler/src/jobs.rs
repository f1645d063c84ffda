//! The two built-in periodic jobs. Failures are logged and the next tick
//! retries.

use chrono::Utc;
use engine::{Engine, NotificationSink, RecurringReport, ReminderScope};

/// One recurring-payments tick at the current time.
pub async fn recurring_payments(engine: &Engine) -> Option<RecurringReport> {
    match engine.process_recurring(Utc::now()).await {
        Ok(report) => {
            tracing::info!(
                processed = report.processed,
                skipped = report.skipped,
                "recurring payments processed"
            );
            Some(report)
        }
        Err(err) => {
            tracing::error!("recurring payments failed: {err}");
            None
        }
    }
}

/// Scans every user's recurring transactions and pushes each event to
/// `sink`. Returns the number of events sent.
pub async fn reminders(engine: &Engine, sink: &dyn NotificationSink) -> usize {
    let scan = match engine.scan_reminders(ReminderScope::All, Utc::now()).await {
        Ok(scan) => scan,
        Err(err) => {
            tracing::error!("reminder scan failed: {err}");
            return 0;
        }
    };

    let mut sent = 0;
    for event in scan {
        sink.notify(&event);
        sent += 1;
    }
    if sent == 0 {
        tracing::info!("no reminders to send");
    } else {
        tracing::info!(events = sent, "reminder scan finished");
    }
    sent
}
