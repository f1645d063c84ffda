use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};

use crate::{ResultEngine, Transaction, transactions};

use super::Engine;

/// Outcome of one recurring-payments tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecurringReport {
    /// Templates that emitted a copy and were advanced.
    pub processed: usize,
    /// Malformed templates, and templates advanced concurrently by someone
    /// else.
    pub skipped: usize,
}

impl Engine {
    /// Materializes every recurring template due at `now`.
    ///
    /// Each due template emits one non-recurring copy and moves its
    /// `next_run` to `now + period`. The advance is a compare-and-set on the
    /// `next_run` read at the start of the tick, and the copy is inserted
    /// only when that update hit a row, so running the same tick twice emits
    /// each copy once. The whole tick is a single DB transaction.
    pub async fn process_recurring(&self, now: DateTime<Utc>) -> ResultEngine<RecurringReport> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let due = due_templates(db_tx, now).await?;
                engine.materialize_due(db_tx, due, now).await
            })
        })
        .await
    }

    /// Emits a copy for each template in `due` whose `next_run` still matches
    /// the value in the snapshot, and advances it.
    async fn materialize_due(
        &self,
        db_tx: &DatabaseTransaction,
        due: Vec<transactions::Model>,
        now: DateTime<Utc>,
    ) -> ResultEngine<RecurringReport> {
        let ids: Vec<String> = due.iter().map(|m| m.id.clone()).collect();
        let mut groups = self.load_groups(db_tx, &ids).await?;
        let mut report = RecurringReport::default();

        for model in due {
            let linked = groups.remove(&model.id).unwrap_or_default();
            let raw_id = model.id.clone();
            let mut template = match Transaction::try_from(model) {
                Ok(template) => template,
                Err(err) => {
                    tracing::warn!(transaction_id = %raw_id, "skipping malformed recurring template: {err}");
                    report.skipped += 1;
                    continue;
                }
            };
            template.groups = linked;

            let Some(previous) = template.next_run else {
                report.skipped += 1;
                continue;
            };
            let next = match template.next_run_after(now) {
                Ok(next) => next,
                Err(err) => {
                    tracing::warn!(transaction_id = %template.id, "skipping recurring template: {err}");
                    report.skipped += 1;
                    continue;
                }
            };

            let advanced = transactions::Entity::update_many()
                .col_expr(transactions::Column::NextRun, Expr::value(next))
                .filter(transactions::Column::Id.eq(template.id.to_string()))
                .filter(transactions::Column::NextRun.eq(previous))
                .exec(db_tx)
                .await?;
            if advanced.rows_affected == 0 {
                tracing::debug!(transaction_id = %template.id, "template already advanced");
                report.skipped += 1;
                continue;
            }

            let copy = template.materialize(now);
            transactions::ActiveModel::from(&copy).insert(db_tx).await?;
            let group_ids: Vec<_> = copy.groups.iter().map(|g| g.id).collect();
            self.link_groups(db_tx, copy.id, &group_ids).await?;

            tracing::info!(
                template_id = %template.id,
                copy_id = %copy.id,
                next_run = %next,
                "recurring transaction materialized"
            );
            report.processed += 1;
        }

        Ok(report)
    }
}

async fn due_templates(
    db_tx: &DatabaseTransaction,
    now: DateTime<Utc>,
) -> ResultEngine<Vec<transactions::Model>> {
    let due = transactions::Entity::find()
        .filter(transactions::Column::IsRecurring.eq(true))
        .filter(transactions::Column::NextRun.is_not_null())
        .filter(transactions::Column::NextRun.lte(now))
        .order_by_asc(transactions::Column::NextRun)
        .order_by_asc(transactions::Column::Id)
        .all(db_tx)
        .await?;
    Ok(due)
}
