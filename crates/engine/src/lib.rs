//! Core of the tally backend: users, groups, transactions, recurring
//! payments, reminders and statistics on top of a sea-orm database.

pub use credentials::{
    DEFAULT_TOKEN_TTL_MINUTES, MIN_SECRET_LEN, TokenIssuer, hash_password, verify_password,
};
pub use error::EngineError;
pub use group_members::{Member, MembershipChange, MembershipRole};
pub use groups::Group;
pub use money::Money;
pub use ops::{
    Engine, EngineBuilder, NewTransaction, NewUser, Page, PageRequest, RecurringReport,
    TransactionFilter, TransactionUpdate,
};
pub use reminders::{
    NotificationSink, ReminderBucket, ReminderEvent, ReminderScan, ReminderScope, classify,
    days_left,
};
pub use statistics::{PeriodBucket, Statistics, StatsScope};
pub use transactions::{Transaction, TransactionKind};
pub use users::User;

mod credentials;
mod error;
mod group_members;
mod groups;
mod money;
mod ops;
mod reminders;
mod statistics;
mod transaction_groups;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
