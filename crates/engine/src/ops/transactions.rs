use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, Transaction, TransactionKind, transaction_groups,
    transactions,
    util::{normalize_optional, normalize_required, validate_recurrence},
};

use super::{Engine, access::dedup_ids};

mod list;

pub use list::{Page, PageRequest, TransactionFilter};
pub(super) use list::{ApplyTxFilters, owned_by, shared_with};

/// Input for [`Engine::create_transaction`].
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub name: String,
    pub kind: TransactionKind,
    pub category: String,
    pub amount: Money,
    /// Defaults to the creation time.
    pub occurred_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub is_recurring: bool,
    pub recurring_period_days: Option<i32>,
    /// First scheduled run of a recurring template; defaults to the creation
    /// time.
    pub next_run: Option<DateTime<Utc>>,
    pub group_ids: Vec<Uuid>,
}

/// Partial update for [`Engine::update_transaction`]; `None` keeps the
/// current value.
#[derive(Clone, Debug, Default)]
pub struct TransactionUpdate {
    pub name: Option<String>,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub amount: Option<Money>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub is_recurring: Option<bool>,
    pub recurring_period_days: Option<i32>,
    pub next_run: Option<DateTime<Utc>>,
    /// Replaces the whole group set when present.
    pub group_ids: Option<Vec<Uuid>>,
}

/// Largest accepted amount: one trillion units.
pub const MAX_AMOUNT_MINOR: i64 = 100_000_000_000_000;

fn validate_amount(amount: Money) -> ResultEngine<i64> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(format!(
            "amount must be > 0, got {amount}"
        )));
    }
    if amount.minor() > MAX_AMOUNT_MINOR {
        return Err(EngineError::InvalidAmount(format!(
            "amount must be <= {}, got {amount}",
            Money::new(MAX_AMOUNT_MINOR)
        )));
    }
    Ok(amount.minor())
}

impl Engine {
    /// Records a transaction owned by `user_id`, optionally shared with
    /// groups the user belongs to.
    pub async fn create_transaction(
        &self,
        user_id: Uuid,
        cmd: NewTransaction,
        now: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        let amount_minor = validate_amount(cmd.amount)?;
        let name = normalize_required(&cmd.name, "name")?;
        let category = normalize_required(&cmd.category, "category")?;
        validate_recurrence(cmd.is_recurring, cmd.recurring_period_days)?;
        let group_ids = dedup_ids(&cmd.group_ids);

        let (recurring_period_days, next_run) = if cmd.is_recurring {
            (cmd.recurring_period_days, Some(cmd.next_run.unwrap_or(now)))
        } else {
            (None, None)
        };
        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id,
            name,
            kind: cmd.kind,
            category,
            amount_minor,
            occurred_at: cmd.occurred_at.unwrap_or(now),
            description: normalize_optional(cmd.description.as_deref()),
            is_recurring: cmd.is_recurring,
            recurring_period_days,
            next_run,
            created_at: now,
            groups: Vec::new(),
        };

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                engine
                    .require_member_of_all(db_tx, &group_ids, user_id)
                    .await?;

                let model = transactions::ActiveModel::from(&tx).insert(db_tx).await?;
                engine.link_groups(db_tx, tx.id, &group_ids).await?;

                let mut out = engine.with_groups(db_tx, vec![model]).await?;
                let created = out.pop().ok_or_else(|| {
                    EngineError::KeyNotFound("transaction not exists".to_string())
                })?;
                tracing::debug!(transaction_id = %created.id, %user_id, "transaction created");
                Ok(created)
            })
        })
        .await
    }

    /// Return a transaction owned by `user_id`.
    pub async fn transaction(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Transaction> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = engine
                    .require_owned_transaction(db_tx, transaction_id, user_id)
                    .await?;
                let mut out = engine.with_groups(db_tx, vec![model]).await?;
                out.pop()
                    .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
            })
        })
        .await
    }

    /// Applies a partial update to a transaction owned by `user_id`.
    ///
    /// Turning `is_recurring` off clears the period and the next run.
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
        cmd: TransactionUpdate,
        now: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        let amount_minor = cmd.amount.map(validate_amount).transpose()?;
        let name = cmd
            .name
            .as_deref()
            .map(|n| normalize_required(n, "name"))
            .transpose()?;
        let category = cmd
            .category
            .as_deref()
            .map(|c| normalize_required(c, "category"))
            .transpose()?;
        let group_ids = cmd.group_ids.as_deref().map(dedup_ids);

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = engine
                    .require_owned_transaction(db_tx, transaction_id, user_id)
                    .await?;
                let mut tx = Transaction::try_from(model)?;

                if let Some(name) = name {
                    tx.name = name;
                }
                if let Some(kind) = cmd.kind {
                    tx.kind = kind;
                }
                if let Some(category) = category {
                    tx.category = category;
                }
                if let Some(amount_minor) = amount_minor {
                    tx.amount_minor = amount_minor;
                }
                if let Some(occurred_at) = cmd.occurred_at {
                    tx.occurred_at = occurred_at;
                }
                if cmd.description.is_some() {
                    tx.description = normalize_optional(cmd.description.as_deref());
                }
                if let Some(is_recurring) = cmd.is_recurring {
                    tx.is_recurring = is_recurring;
                }
                if cmd.recurring_period_days.is_some() {
                    tx.recurring_period_days = cmd.recurring_period_days;
                }
                if let Some(next_run) = cmd.next_run {
                    tx.next_run = Some(next_run);
                }

                if tx.is_recurring {
                    validate_recurrence(true, tx.recurring_period_days)?;
                    tx.next_run = Some(tx.next_run.unwrap_or(now));
                } else {
                    tx.recurring_period_days = None;
                    tx.next_run = None;
                }

                if let Some(group_ids) = &group_ids {
                    engine
                        .require_member_of_all(db_tx, group_ids, user_id)
                        .await?;
                }

                let model = transactions::ActiveModel::from(&tx).update(db_tx).await?;
                if let Some(group_ids) = &group_ids {
                    engine.link_groups(db_tx, tx.id, group_ids).await?;
                }

                let mut out = engine.with_groups(db_tx, vec![model]).await?;
                out.pop()
                    .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
            })
        })
        .await
    }

    /// Deletes a transaction owned by `user_id` together with its group links.
    pub async fn delete_transaction(&self, transaction_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine
                    .require_owned_transaction(db_tx, transaction_id, user_id)
                    .await?;
                transaction_groups::Entity::delete_many()
                    .filter(
                        transaction_groups::Column::TransactionId.eq(transaction_id.to_string()),
                    )
                    .exec(db_tx)
                    .await?;
                transactions::Entity::delete_by_id(transaction_id.to_string())
                    .exec(db_tx)
                    .await?;
                tracing::debug!(%transaction_id, %user_id, "transaction deleted");
                Ok(())
            })
        })
        .await
    }
}
