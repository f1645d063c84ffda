//! Aggregation of transactions into totals and expense breakdowns.

use std::{collections::BTreeMap, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, Transaction, TransactionKind};

/// Granularity of the `by_period` breakdown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodBucket {
    Year,
    #[default]
    Month,
    Day,
}

impl PeriodBucket {
    /// Truncates `at` to the bucket and renders it as a sortable key.
    pub fn key(self, at: DateTime<Utc>) -> String {
        match self {
            Self::Year => at.format("%Y").to_string(),
            Self::Month => at.format("%Y-%m").to_string(),
            Self::Day => at.format("%Y-%m-%d").to_string(),
        }
    }
}

impl FromStr for PeriodBucket {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "day" => Ok(Self::Day),
            other => Err(EngineError::InvalidInput(format!(
                "invalid period: {other}"
            ))),
        }
    }
}

/// What a statistics request aggregates over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatsScope {
    /// Transactions owned by the user.
    User(Uuid),
    /// Transactions shared with the group.
    Group(Uuid),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_income_minor: i64,
    pub total_expense_minor: i64,
    pub balance_minor: i64,
    pub total_count: u64,
    /// Expense totals per category.
    pub by_category: BTreeMap<String, i64>,
    /// Expense totals per period key.
    pub by_period: BTreeMap<String, i64>,
}

fn add_minor(total: &mut i64, amount_minor: i64) -> ResultEngine<()> {
    *total = Money::new(*total)
        .checked_add(Money::new(amount_minor))
        .map(Money::minor)
        .ok_or_else(overflow)?;
    Ok(())
}

fn overflow() -> EngineError {
    EngineError::InvalidAmount("statistics total out of range".to_string())
}

impl Statistics {
    /// Folds already-filtered transactions into totals.
    ///
    /// Fails with `InvalidAmount` if a total leaves the `i64` range.
    pub fn from_transactions<'a, I>(transactions: I, period: PeriodBucket) -> ResultEngine<Self>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut stats = Statistics::default();
        for tx in transactions {
            stats.total_count += 1;
            match tx.kind {
                TransactionKind::Income => add_minor(&mut stats.total_income_minor, tx.amount_minor)?,
                TransactionKind::Expense => {
                    add_minor(&mut stats.total_expense_minor, tx.amount_minor)?;
                    add_minor(
                        stats.by_category.entry(tx.category.clone()).or_default(),
                        tx.amount_minor,
                    )?;
                    add_minor(
                        stats.by_period.entry(period.key(tx.occurred_at)).or_default(),
                        tx.amount_minor,
                    )?;
                }
            }
        }
        stats.balance_minor = Money::new(stats.total_income_minor)
            .checked_sub(Money::new(stats.total_expense_minor))
            .map(Money::minor)
            .ok_or_else(overflow)?;
        Ok(stats)
    }
}
