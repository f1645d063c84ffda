use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait,
    prelude::*,
};

use crate::{
    EngineError, ResultEngine, Transaction, TransactionKind, transaction_groups, transactions,
};

use super::super::Engine;

/// Conjunctive filters over transactions; `None` or empty imposes no
/// constraint.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    /// Substring of the name.
    pub name: Option<String>,
    pub kind: Option<TransactionKind>,
    /// Exact category.
    pub category: Option<String>,
    /// Inclusive lower bound on the amount.
    pub min_amount_minor: Option<i64>,
    /// Inclusive lower bound on `occurred_at`.
    pub from: Option<DateTime<Utc>>,
    /// Keeps transactions shared with at least one of these groups.
    pub group_ids: Vec<Uuid>,
}

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// 1-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> ResultEngine<Self> {
        let request = Self { page, size };
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> ResultEngine<()> {
        if self.page < 1 {
            return Err(EngineError::InvalidPage("page must be >= 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.size) {
            return Err(EngineError::InvalidPage(format!(
                "size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let in_range = (self.page - 1)
            .checked_mul(self.size)
            .is_some_and(|offset| i64::try_from(offset).is_ok());
        if !in_range {
            return Err(EngineError::InvalidPage(format!(
                "page {} is out of range",
                self.page
            )));
        }
        Ok(())
    }

    /// Rows to skip. Only meaningful for a validated request.
    fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
            pages: total.div_ceil(request.size),
        }
    }
}

/// Restricts a query to transactions linked to any of `group_ids`.
fn shared_with_any(group_ids: &[Uuid]) -> sea_orm::sea_query::SimpleExpr {
    let ids: Vec<String> = group_ids.iter().map(Uuid::to_string).collect();
    transactions::Column::Id.in_subquery(
        transaction_groups::Entity::find()
            .select_only()
            .column(transaction_groups::Column::TransactionId)
            .filter(transaction_groups::Column::GroupId.is_in(ids))
            .into_query(),
    )
}

pub(in crate::ops) trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionFilter) -> Self {
        if let Some(name) = filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            self = self.filter(transactions::Column::Name.contains(name));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category) = filter
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            self = self.filter(transactions::Column::Category.eq(category));
        }
        if let Some(min) = filter.min_amount_minor {
            self = self.filter(transactions::Column::AmountMinor.gte(min));
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if !filter.group_ids.is_empty() {
            self = self.filter(shared_with_any(&filter.group_ids));
        }
        self
    }
}

/// Base query for a user scope: transactions the user owns.
pub(in crate::ops) fn owned_by(user_id: Uuid) -> Select<transactions::Entity> {
    transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id.to_string()))
}

/// Base query for a group scope: transactions shared with the group.
pub(in crate::ops) fn shared_with(group_id: Uuid) -> Select<transactions::Entity> {
    transactions::Entity::find().filter(shared_with_any(&[group_id]))
}

impl Engine {
    async fn page_of(
        &self,
        db: &DatabaseTransaction,
        query: Select<transactions::Entity>,
        page: PageRequest,
    ) -> ResultEngine<Page<Transaction>> {
        let total = query.clone().count(db).await?;
        let models = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(page.offset())
            .limit(page.size)
            .all(db)
            .await?;
        let items = self.with_groups(db, models).await?;
        Ok(Page::new(items, total, page))
    }

    /// Lists the transactions owned by `user_id`, newest first.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> ResultEngine<Page<Transaction>> {
        page.validate()?;
        let filter = filter.clone();
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let query = owned_by(user_id).apply_tx_filters(&filter);
                engine.page_of(db_tx, query, page).await
            })
        })
        .await
    }

    /// Lists the transactions shared with a group, newest first. The actor
    /// must be a member.
    pub async fn list_group_transactions(
        &self,
        group_id: Uuid,
        actor_id: Uuid,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> ResultEngine<Page<Transaction>> {
        page.validate()?;
        let filter = filter.clone();
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group_member(db_tx, group_id, actor_id).await?;
                let query = shared_with(group_id).apply_tx_filters(&filter);
                engine.page_of(db_tx, query, page).await
            })
        })
        .await
    }
}
