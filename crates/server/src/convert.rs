//! Mapping between engine values and wire types.

use api_types::{
    auth::UserView,
    group::{GroupView, MemberView, MembershipRole as ApiRole, MembershipStatus},
    page::Page as ApiPage,
    reminder::ReminderView,
    stats::Statistic,
    transaction::{
        Amount, GroupRef, TransactionKind as ApiKind, TransactionQuery, TransactionView,
    },
};
use engine::{
    EngineError, Group, Member, MembershipChange, MembershipRole, Money, Page, PageRequest,
    PeriodBucket, ReminderEvent, Statistics, Transaction, TransactionFilter, TransactionKind,
    User,
};
use uuid::Uuid;

pub(crate) fn user_view(user: User) -> UserView {
    UserView {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        login: user.login,
        created_at: user.created_at,
    }
}

pub(crate) fn group_view(group: Group) -> GroupView {
    GroupView {
        id: group.id,
        name: group.name,
        owner_id: group.owner_id,
        created_at: group.created_at,
    }
}

pub(crate) fn member_view(member: Member) -> MemberView {
    MemberView {
        user_id: member.user.id,
        login: member.user.login,
        first_name: member.user.first_name,
        last_name: member.user.last_name,
        role: match member.role {
            MembershipRole::Owner => ApiRole::Owner,
            MembershipRole::Member => ApiRole::Member,
        },
        joined_at: member.joined_at,
    }
}

pub(crate) fn membership_status(change: MembershipChange) -> MembershipStatus {
    match change {
        MembershipChange::Added => MembershipStatus::Added,
        MembershipChange::AlreadyMember => MembershipStatus::AlreadyMember,
        MembershipChange::Removed => MembershipStatus::Removed,
        MembershipChange::NotMember => MembershipStatus::NotMember,
    }
}

pub(crate) fn kind_from_api(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Income => TransactionKind::Income,
        ApiKind::Expense => TransactionKind::Expense,
    }
}

fn kind_to_api(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Income => ApiKind::Income,
        TransactionKind::Expense => ApiKind::Expense,
    }
}

pub(crate) fn parse_amount(amount: &Amount) -> Result<Money, EngineError> {
    amount.to_decimal_string().parse()
}

pub(crate) fn transaction_view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        user_id: tx.user_id,
        name: tx.name,
        kind: kind_to_api(tx.kind),
        category: tx.category,
        amount: Money::new(tx.amount_minor).to_string(),
        amount_minor: tx.amount_minor,
        occurred_at: tx.occurred_at,
        description: tx.description,
        is_recurring: tx.is_recurring,
        recurring_period_days: tx.recurring_period_days,
        next_run: tx.next_run,
        created_at: tx.created_at,
        groups: tx
            .groups
            .into_iter()
            .map(|g| GroupRef {
                id: g.id,
                name: g.name,
            })
            .collect(),
    }
}

pub(crate) fn page_view(page: Page<Transaction>) -> ApiPage<TransactionView> {
    ApiPage {
        items: page.items.into_iter().map(transaction_view).collect(),
        total: page.total,
        page: page.page,
        size: page.size,
        pages: page.pages,
    }
}

pub(crate) fn statistic_view(stats: Statistics) -> Statistic {
    Statistic {
        total_income: Money::new(stats.total_income_minor).to_string(),
        total_expense: Money::new(stats.total_expense_minor).to_string(),
        balance: Money::new(stats.balance_minor).to_string(),
        total_income_minor: stats.total_income_minor,
        total_expense_minor: stats.total_expense_minor,
        balance_minor: stats.balance_minor,
        total_count: stats.total_count,
        by_category: stats.by_category,
        by_period: stats.by_period,
    }
}

pub(crate) fn reminder_view(event: &ReminderEvent) -> ReminderView {
    ReminderView {
        transaction_id: event.transaction_id,
        user_id: event.user_id,
        name: event.name.clone(),
        category: event.category.clone(),
        amount: event.amount().to_string(),
        amount_minor: event.amount_minor,
        next_run: event.next_run,
        bucket: event.bucket.as_str().to_string(),
        days_overdue: event.bucket.overdue_days(),
    }
}

fn parse_group_ids(raw: &str) -> Result<Vec<Uuid>, EngineError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| EngineError::InvalidInput(format!("invalid group id: {s}")))
        })
        .collect()
}

pub(crate) fn filter_from_query(query: &TransactionQuery) -> Result<TransactionFilter, EngineError> {
    Ok(TransactionFilter {
        name: query.name.clone(),
        kind: query.kind.map(kind_from_api),
        category: query.category.clone(),
        min_amount_minor: query.amount_minor,
        from: query.from,
        group_ids: query
            .group_ids
            .as_deref()
            .map(parse_group_ids)
            .transpose()?
            .unwrap_or_default(),
    })
}

pub(crate) fn page_from_query(query: &TransactionQuery) -> Result<PageRequest, EngineError> {
    let default = PageRequest::default();
    PageRequest::new(
        query.page.unwrap_or(default.page),
        query.size.unwrap_or(default.size),
    )
}

pub(crate) fn period_from_query(query: &TransactionQuery) -> Result<PeriodBucket, EngineError> {
    query
        .period
        .as_deref()
        .map(str::parse::<PeriodBucket>)
        .transpose()
        .map(Option::unwrap_or_default)
}
