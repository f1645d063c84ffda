mod common;

use chrono::{Duration, Utc};
use common::{at, count_rows, engine_with_db, expense, income, register};
use engine::{
    EngineError, Money, NewUser, PageRequest, PeriodBucket, StatsScope, TransactionFilter,
    TransactionKind, TransactionUpdate,
};

#[tokio::test]
async fn duplicate_login_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    register(&engine, "alice").await;

    let err = engine
        .register(
            NewUser {
                first_name: "Other".to_string(),
                last_name: "Alice".to_string(),
                login: " alice ".to_string(),
                password: "secret".to_string(),
            },
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("alice".to_string()));
}

#[tokio::test]
async fn authenticate_and_change_password() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;

    assert_eq!(
        engine.authenticate("alice", "password123").await.unwrap().id,
        alice.id
    );
    assert!(matches!(
        engine.authenticate("alice", "nope").await,
        Err(EngineError::Unauthorized(_))
    ));
    assert!(matches!(
        engine.authenticate("nobody", "password123").await,
        Err(EngineError::Unauthorized(_))
    ));

    assert!(matches!(
        engine.change_password(alice.id, "wrong", "newpass").await,
        Err(EngineError::Unauthorized(_))
    ));
    engine
        .change_password(alice.id, "password123", "newpass")
        .await
        .unwrap();
    assert!(engine.authenticate("alice", "newpass").await.is_ok());
    assert!(engine.authenticate("alice", "password123").await.is_err());
}

#[tokio::test]
async fn negative_amount_is_rejected_without_persisting() {
    let (engine, db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;

    for amount in ["-5.00", "0"] {
        let err = engine
            .create_transaction(alice.id, expense("Coffee", "Food", amount), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    assert_eq!(count_rows(&db, "transactions").await, 0);
}

#[tokio::test]
async fn recurring_requires_positive_period() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;

    let mut cmd = expense("Gym", "Health", "30");
    cmd.is_recurring = true;
    cmd.recurring_period_days = Some(0);
    assert!(matches!(
        engine.create_transaction(alice.id, cmd.clone(), Utc::now()).await,
        Err(EngineError::InvalidRecurrence(_))
    ));

    cmd.recurring_period_days = None;
    assert!(matches!(
        engine.create_transaction(alice.id, cmd.clone(), Utc::now()).await,
        Err(EngineError::InvalidRecurrence(_))
    ));

    cmd.recurring_period_days = Some(30);
    let now = at(2026, 10, 1, 12);
    let tx = engine.create_transaction(alice.id, cmd, now).await.unwrap();
    assert_eq!(tx.next_run, Some(now));

    let err = engine
        .update_transaction(
            tx.id,
            alice.id,
            TransactionUpdate {
                recurring_period_days: Some(-1),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRecurrence(_)));
}

#[tokio::test]
async fn recurring_period_out_of_range_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let now = at(2026, 10, 1, 12);

    for days in [36_501, i32::MAX] {
        let mut cmd = expense("Gym", "Health", "30");
        cmd.is_recurring = true;
        cmd.recurring_period_days = Some(days);
        let err = engine
            .create_transaction(alice.id, cmd, now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRecurrence(_)));
    }
    assert_eq!(count_rows(&db, "transactions").await, 0);

    let mut cmd = expense("Gym", "Health", "30");
    cmd.is_recurring = true;
    cmd.recurring_period_days = Some(36_500);
    let tx = engine.create_transaction(alice.id, cmd, now).await.unwrap();

    let err = engine
        .update_transaction(
            tx.id,
            alice.id,
            TransactionUpdate {
                recurring_period_days: Some(i32::MAX),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRecurrence(_)));
    let stored = engine.transaction(tx.id, alice.id).await.unwrap();
    assert_eq!(stored.recurring_period_days, Some(36_500));
}

#[tokio::test]
async fn oversized_amount_is_rejected_without_persisting() {
    let (engine, db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;

    let err = engine
        .create_transaction(
            alice.id,
            income("Jackpot", "Luck", "50000000000000000"),
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    assert_eq!(count_rows(&db, "transactions").await, 0);

    let largest = income("Jackpot", "Luck", "1000000000000");
    engine
        .create_transaction(alice.id, largest.clone(), Utc::now())
        .await
        .unwrap();
    engine
        .create_transaction(alice.id, largest, Utc::now())
        .await
        .unwrap();
    let stats = engine
        .statistics(
            alice.id,
            StatsScope::User(alice.id),
            &TransactionFilter::default(),
            PeriodBucket::Month,
        )
        .await
        .unwrap();
    assert_eq!(stats.total_income_minor, 200_000_000_000_000);
    assert_eq!(stats.balance_minor, 200_000_000_000_000);
}

#[tokio::test]
async fn turning_recurrence_off_clears_schedule() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let now = at(2026, 10, 1, 12);

    let tx = engine
        .create_transaction(alice.id, common::recurring("Rent", "800", 30, now), now)
        .await
        .unwrap();
    let updated = engine
        .update_transaction(
            tx.id,
            alice.id,
            TransactionUpdate {
                is_recurring: Some(false),
                amount: Some("850.50".parse::<Money>().unwrap()),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();

    assert!(!updated.is_recurring);
    assert_eq!(updated.next_run, None);
    assert_eq!(updated.recurring_period_days, None);
    assert_eq!(updated.amount_minor, 85_050);
}

#[tokio::test]
async fn transactions_are_private_to_their_owner() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let bob = register(&engine, "bob").await;

    let tx = engine
        .create_transaction(alice.id, expense("Coffee", "Food", "3.50"), Utc::now())
        .await
        .unwrap();
    assert_eq!(tx.amount_minor, 350);
    assert_eq!(tx.user_id, alice.id);

    assert!(matches!(
        engine.transaction(tx.id, bob.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.delete_transaction(tx.id, bob.id).await,
        Err(EngineError::KeyNotFound(_))
    ));

    engine.delete_transaction(tx.id, alice.id).await.unwrap();
    assert!(matches!(
        engine.transaction(tx.id, alice.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn sharing_requires_membership() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let bob = register(&engine, "bob").await;
    let group = engine
        .create_group("Flat", alice.id, Utc::now())
        .await
        .unwrap();

    let mut cmd = expense("Pizza", "Food", "20");
    cmd.group_ids = vec![group.id];
    assert!(matches!(
        engine.create_transaction(bob.id, cmd.clone(), Utc::now()).await,
        Err(EngineError::Forbidden(_))
    ));

    engine
        .add_member(group.id, bob.id, alice.id, Utc::now())
        .await
        .unwrap();
    let tx = engine
        .create_transaction(bob.id, cmd, Utc::now())
        .await
        .unwrap();
    assert_eq!(tx.groups.iter().map(|g| g.id).collect::<Vec<_>>(), vec![group.id]);

    let shared = engine
        .list_group_transactions(
            group.id,
            alice.id,
            &TransactionFilter::default(),
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(shared.total, 1);
    assert_eq!(shared.items[0].id, tx.id);
}

#[tokio::test]
async fn list_filters_are_conjunctive() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let group = engine
        .create_group("Flat", alice.id, Utc::now())
        .await
        .unwrap();
    let base = at(2026, 9, 1, 12);

    engine
        .create_transaction(alice.id, income("Salary", "Work", "3000"), base)
        .await
        .unwrap();
    engine
        .create_transaction(alice.id, expense("Groceries", "Food", "45.10"), base)
        .await
        .unwrap();
    let mut shared = expense("Dinner out", "Food", "80");
    shared.group_ids = vec![group.id];
    engine
        .create_transaction(alice.id, shared, base + Duration::days(10))
        .await
        .unwrap();

    let all = engine
        .list_transactions(alice.id, &TransactionFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.items[0].name, "Dinner out");

    let food = TransactionFilter {
        kind: Some(TransactionKind::Expense),
        category: Some("Food".to_string()),
        ..Default::default()
    };
    let page = engine
        .list_transactions(alice.id, &food, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    let expensive_food = TransactionFilter {
        min_amount_minor: Some(5_000),
        ..food.clone()
    };
    let page = engine
        .list_transactions(alice.id, &expensive_food, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].name, "Dinner out");

    let recent = TransactionFilter {
        from: Some(base + Duration::days(5)),
        ..Default::default()
    };
    assert_eq!(
        engine
            .list_transactions(alice.id, &recent, PageRequest::default())
            .await
            .unwrap()
            .total,
        1
    );

    let in_group = TransactionFilter {
        group_ids: vec![group.id],
        ..Default::default()
    };
    assert_eq!(
        engine
            .list_transactions(alice.id, &in_group, PageRequest::default())
            .await
            .unwrap()
            .total,
        1
    );

    let by_name = TransactionFilter {
        name: Some("Sal".to_string()),
        ..Default::default()
    };
    assert_eq!(
        engine
            .list_transactions(alice.id, &by_name, PageRequest::default())
            .await
            .unwrap()
            .items[0]
            .name,
        "Salary"
    );
}

#[tokio::test]
async fn pagination_splits_results() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let base = at(2026, 9, 1, 12);

    for i in 0..5 {
        engine
            .create_transaction(
                alice.id,
                expense(&format!("Item {i}"), "Misc", "1"),
                base + Duration::minutes(i),
            )
            .await
            .unwrap();
    }

    let page = engine
        .list_transactions(
            alice.id,
            &TransactionFilter::default(),
            PageRequest::new(2, 2).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.pages, 3);
    assert_eq!(page.page, 2);
    let names: Vec<_> = page.items.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Item 2", "Item 1"]);

    let err = engine
        .list_transactions(
            alice.id,
            &TransactionFilter::default(),
            engine::PageRequest { page: 0, size: 20 },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPage(_)));

    let err = engine
        .list_transactions(
            alice.id,
            &TransactionFilter::default(),
            engine::PageRequest {
                page: u64::MAX,
                size: 100,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPage(_)));
}

#[tokio::test]
async fn deleting_a_shared_transaction_removes_links() {
    let (engine, db) = engine_with_db().await;
    let alice = register(&engine, "alice").await;
    let group = engine
        .create_group("Flat", alice.id, Utc::now())
        .await
        .unwrap();
    let mut cmd = expense("Internet", "Bills", "30");
    cmd.group_ids = vec![group.id, group.id];
    let tx = engine
        .create_transaction(alice.id, cmd, Utc::now())
        .await
        .unwrap();
    assert_eq!(tx.groups.len(), 1);

    engine.delete_transaction(tx.id, alice.id).await.unwrap();

    let shared = engine
        .list_group_transactions(
            group.id,
            alice.id,
            &TransactionFilter::default(),
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(shared.total, 0);
    assert_eq!(count_rows(&db, "transaction_groups").await, 0);
}
