//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense owned by one user and
//! optionally shared with groups. A transaction flagged as recurring acts as a
//! template: the recurring engine periodically materializes non-recurring
//! copies of it and moves its `next_run` forward.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Group, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: TransactionKind,
    pub category: String,
    pub amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
    pub description: Option<String>,
    pub is_recurring: bool,
    pub recurring_period_days: Option<i32>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub groups: Vec<Group>,
}

impl Transaction {
    /// Builds the non-recurring instance emitted for this template at `now`.
    ///
    /// The copy keeps name, type, category, amount, description, owner and
    /// groups; it gets a fresh id and timestamp.
    pub fn materialize(&self, now: DateTime<Utc>) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            name: self.name.clone(),
            kind: self.kind,
            category: self.category.clone(),
            amount_minor: self.amount_minor,
            occurred_at: now,
            description: self.description.clone(),
            is_recurring: false,
            recurring_period_days: None,
            next_run: None,
            created_at: now,
            groups: self.groups.clone(),
        }
    }

    /// Next scheduled run for a template processed at `now`.
    ///
    /// Computed from `now` rather than from the stored `next_run`, so a
    /// template that was overdue for several periods fires once and then
    /// resumes its cadence.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> ResultEngine<DateTime<Utc>> {
        let invalid = || {
            EngineError::InvalidRecurrence(format!(
                "transaction {} is not a valid recurring template",
                self.id
            ))
        };
        match self.recurring_period_days {
            Some(days) if self.is_recurring && days > 0 => now
                .checked_add_signed(Duration::days(i64::from(days)))
                .ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub category: String,
    pub amount_minor: i64,
    pub occurred_at: DateTimeUtc,
    pub description: Option<String>,
    pub is_recurring: bool,
    pub recurring_period_days: Option<i32>,
    pub next_run: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(has_many = "super::transaction_groups::Entity")]
    TransactionGroups,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::transaction_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionGroups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.to_string()),
            name: ActiveValue::Set(tx.name.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            category: ActiveValue::Set(tx.category.clone()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            description: ActiveValue::Set(tx.description.clone()),
            is_recurring: ActiveValue::Set(tx.is_recurring),
            recurring_period_days: ActiveValue::Set(tx.recurring_period_days),
            next_run: ActiveValue::Set(tx.next_run),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

/// Converts a row without its groups; callers attach them separately.
impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: parse_uuid(&model.user_id, "user")?,
            name: model.name,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            category: model.category,
            amount_minor: model.amount_minor,
            occurred_at: model.occurred_at,
            description: model.description,
            is_recurring: model.is_recurring,
            recurring_period_days: model.recurring_period_days,
            next_run: model.next_run,
            created_at: model.created_at,
            groups: Vec::new(),
        })
    }
}
