use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserRegister {
        pub first_name: String,
        pub last_name: String,
        pub login: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserLogin {
        pub login: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub first_name: String,
        pub last_name: String,
        pub login: String,
        pub created_at: DateTime<Utc>,
    }

    /// Access token returned by login and refresh.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Token {
        pub access_token: String,
        /// Always `bearer`.
        pub token_type: String,
        pub user_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChangePassword {
        pub current_password: String,
        pub new_password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Message {
        pub message: String,
    }
}

pub mod group {
    use super::*;

    /// Body for both group creation and rename.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: Uuid,
        pub name: String,
        pub owner_id: Uuid,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MembershipRole {
        Owner,
        Member,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub user_id: Uuid,
        pub login: String,
        pub first_name: String,
        pub last_name: String,
        pub role: MembershipRole,
        pub joined_at: DateTime<Utc>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MembershipStatus {
        Added,
        AlreadyMember,
        Removed,
        NotMember,
    }

    /// Result of adding or removing a member.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembershipResponse {
        pub group_id: Uuid,
        pub user_id: Uuid,
        pub status: MembershipStatus,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    /// A decimal amount, accepted either as a JSON string (`"12.34"`) or a
    /// JSON number (`12.34`).
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum Amount {
        Text(String),
        Number(f64),
    }

    impl Amount {
        /// Decimal text suitable for exact parsing.
        pub fn to_decimal_string(&self) -> String {
            match self {
                Self::Text(text) => text.clone(),
                Self::Number(number) => number.to_string(),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub name: String,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub category: String,
        pub amount: Amount,
        pub occurred_at: Option<DateTime<Utc>>,
        pub description: Option<String>,
        #[serde(default)]
        pub is_recurring: bool,
        pub recurring_period_days: Option<i32>,
        pub next_run: Option<DateTime<Utc>>,
        #[serde(default)]
        pub group_ids: Vec<Uuid>,
    }

    /// Partial update; absent fields are left unchanged.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub name: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub category: Option<String>,
        pub amount: Option<Amount>,
        pub occurred_at: Option<DateTime<Utc>>,
        pub description: Option<String>,
        pub is_recurring: Option<bool>,
        pub recurring_period_days: Option<i32>,
        pub next_run: Option<DateTime<Utc>>,
        pub group_ids: Option<Vec<Uuid>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupRef {
        pub id: Uuid,
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub user_id: Uuid,
        pub name: String,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub category: String,
        /// Decimal amount with two digits, e.g. `"12.30"`.
        pub amount: String,
        pub amount_minor: i64,
        pub occurred_at: DateTime<Utc>,
        pub description: Option<String>,
        pub is_recurring: bool,
        pub recurring_period_days: Option<i32>,
        pub next_run: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
        pub groups: Vec<GroupRef>,
    }

    /// Query string shared by list and statistics endpoints.
    ///
    /// `group_ids` is a comma-separated list of UUIDs.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionQuery {
        pub page: Option<u64>,
        pub size: Option<u64>,
        pub name: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub category: Option<String>,
        pub amount_minor: Option<i64>,
        pub from: Option<DateTime<Utc>>,
        pub group_ids: Option<String>,
        /// `year`, `month` (default) or `day`; statistics only.
        pub period: Option<String>,
    }
}

pub mod page {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Page<T> {
        pub items: Vec<T>,
        pub total: u64,
        pub page: u64,
        pub size: u64,
        pub pages: u64,
    }
}

pub mod stats {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Statistic {
        pub total_income: String,
        pub total_expense: String,
        pub balance: String,
        pub total_income_minor: i64,
        pub total_expense_minor: i64,
        pub balance_minor: i64,
        pub total_count: u64,
        /// Expense totals per category, in minor units.
        pub by_category: BTreeMap<String, i64>,
        /// Expense totals per period key, in minor units.
        pub by_period: BTreeMap<String, i64>,
    }
}

pub mod reminder {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReminderView {
        pub transaction_id: Uuid,
        pub user_id: Uuid,
        pub name: String,
        pub category: String,
        pub amount: String,
        pub amount_minor: i64,
        pub next_run: DateTime<Utc>,
        /// `due_today`, `due_tomorrow`, `due_in_3_days`, `due_in_week` or
        /// `overdue`.
        pub bucket: String,
        pub days_overdue: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RemindersResponse {
        pub count: usize,
        pub events: Vec<ReminderView>,
    }
}
