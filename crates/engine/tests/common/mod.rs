#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, Money, NewTransaction, NewUser, TransactionKind, User};
use migration::MigratorTrait;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub async fn register(engine: &Engine, login: &str) -> User {
    engine
        .register(
            NewUser {
                first_name: "Test".to_string(),
                last_name: login.to_string(),
                login: login.to_string(),
                password: "password123".to_string(),
            },
            Utc::now(),
        )
        .await
        .unwrap()
}

pub fn expense(name: &str, category: &str, amount: &str) -> NewTransaction {
    NewTransaction {
        name: name.to_string(),
        kind: TransactionKind::Expense,
        category: category.to_string(),
        amount: amount.parse::<Money>().unwrap(),
        occurred_at: None,
        description: None,
        is_recurring: false,
        recurring_period_days: None,
        next_run: None,
        group_ids: Vec::new(),
    }
}

pub fn income(name: &str, category: &str, amount: &str) -> NewTransaction {
    NewTransaction {
        kind: TransactionKind::Income,
        ..expense(name, category, amount)
    }
}

pub fn recurring(name: &str, amount: &str, period_days: i32, next_run: DateTime<Utc>) -> NewTransaction {
    NewTransaction {
        is_recurring: true,
        recurring_period_days: Some(period_days),
        next_run: Some(next_run),
        ..expense(name, "Bills", amount)
    }
}

pub async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}
