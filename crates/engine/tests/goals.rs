use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    AllocationPolicy, AllocationStrategy, Engine, EngineError, GoalNewCmd, GoalUpdateCmd,
    NotificationKind, TransactionKind, TransactionListFilter, TransactionNewCmd,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn prepare(db: &DatabaseConnection) {
    migration::Migrator::up(db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in ["alice", "bob"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![username.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
}

async fn engine_with_policy(policy: AllocationPolicy) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    prepare(&db).await;
    let engine = Engine::builder()
        .database(db.clone())
        .allocation(policy)
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    engine_with_policy(AllocationPolicy::default()).await
}

fn deadline() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()
}

async fn income(engine: &Engine, user: &str, amount_minor: i64) -> Uuid {
    engine
        .new_transaction(TransactionNewCmd::new(
            user,
            TransactionKind::Income,
            amount_minor,
            "Salary",
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        ))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn income_allocates_ten_percent_to_auto_goal() {
    let (engine, _db) = engine_with_db().await;
    let goal = engine
        .new_goal(GoalNewCmd::new("alice", "Holiday", 10_000, deadline()).auto_allocate(true))
        .await
        .unwrap();

    let income_id = income(&engine, "alice", 1_000).await;

    let goal = engine.goal(goal.id, "alice").await.unwrap();
    assert_eq!(goal.current_minor, 100);

    let notifications = engine.notifications("alice").await.unwrap();
    assert_eq!(notifications.len(), 2);
    assert!(
        notifications
            .iter()
            .all(|n| n.kind == NotificationKind::GoalAllocation)
    );
    let messages: Vec<&str> = notifications.iter().map(|n| n.message.as_str()).collect();
    assert!(messages.contains(&"1.00 LKR has been allocated to your goal \"Holiday\"."));
    assert!(messages.contains(
        &"A total of 1.00 LKR from your income has been allocated to your savings goals."
    ));

    let savings = engine
        .transactions(
            "alice",
            &TransactionListFilter {
                category: Some("Savings: Holiday".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(savings.len(), 1);
    assert_eq!(savings[0].kind, TransactionKind::Expense);
    assert_eq!(savings[0].amount_minor, 100);
    assert_eq!(savings[0].goal_id, Some(goal.id));
    assert_eq!(savings[0].source_transaction_id, Some(income_id));
}

#[tokio::test]
async fn goals_without_auto_allocate_are_skipped() {
    let (engine, _db) = engine_with_db().await;
    let goal = engine
        .new_goal(GoalNewCmd::new("alice", "Car", 10_000, deadline()))
        .await
        .unwrap();

    income(&engine, "alice", 1_000).await;

    assert_eq!(engine.goal(goal.id, "alice").await.unwrap().current_minor, 0);
    assert!(engine.notifications("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn allocation_never_overshoots_the_target() {
    let (engine, _db) = engine_with_db().await;
    let goal = engine
        .new_goal(
            GoalNewCmd::new("alice", "Phone", 1_000, deadline())
                .current_minor(950)
                .auto_allocate(true),
        )
        .await
        .unwrap();

    income(&engine, "alice", 10_000).await;
    assert_eq!(engine.goal(goal.id, "alice").await.unwrap().current_minor, 1_000);

    // A completed goal receives nothing and produces no notifications.
    let before = engine.notifications("alice").await.unwrap().len();
    income(&engine, "alice", 10_000).await;
    assert_eq!(engine.goal(goal.id, "alice").await.unwrap().current_minor, 1_000);
    assert_eq!(engine.notifications("alice").await.unwrap().len(), before);
}

#[tokio::test]
async fn per_goal_rate_overrides_the_default() {
    let (engine, _db) = engine_with_db().await;
    let goal = engine
        .new_goal(
            GoalNewCmd::new("alice", "House", 1_000_000, deadline())
                .auto_allocate(true)
                .allocation_rate_bps(2_500),
        )
        .await
        .unwrap();

    let shares = engine
        .allocate_income("alice", 10_000, Utc::now())
        .await
        .unwrap();
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].amount.minor(), 2_500);
    assert_eq!(engine.goal(goal.id, "alice").await.unwrap().current_minor, 2_500);
}

#[tokio::test]
async fn capped_priority_allocation_serves_highest_priority_first() {
    let policy = AllocationPolicy {
        rate_bps: 1_000,
        strategy: AllocationStrategy::Priority,
        max_total_bps: Some(1_500),
    };
    let (engine, _db) = engine_with_policy(policy).await;

    let low = engine
        .new_goal(GoalNewCmd::new("alice", "Low", 1_000_000, deadline()).auto_allocate(true))
        .await
        .unwrap();
    let high = engine
        .new_goal(
            GoalNewCmd::new("alice", "High", 1_000_000, deadline())
                .auto_allocate(true)
                .priority(5),
        )
        .await
        .unwrap();

    income(&engine, "alice", 10_000).await;

    assert_eq!(engine.goal(high.id, "alice").await.unwrap().current_minor, 1_000);
    assert_eq!(engine.goal(low.id, "alice").await.unwrap().current_minor, 500);
}

#[tokio::test]
async fn raising_current_savings_records_a_contribution() {
    let (engine, _db) = engine_with_db().await;
    let goal = engine
        .new_goal(GoalNewCmd::new("alice", "Bike", 50_000, deadline()))
        .await
        .unwrap();

    let updated = engine
        .update_goal(GoalUpdateCmd::new(goal.id, "alice").current_minor(20_000))
        .await
        .unwrap();
    assert_eq!(updated.current_minor, 20_000);

    let notifications = engine.notifications("alice").await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].message,
        "200.00 LKR has been added to your goal \"Bike\"."
    );
    let savings = engine
        .transactions(
            "alice",
            &TransactionListFilter {
                category: Some("savings bike".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(savings.len(), 1);
    assert_eq!(savings[0].amount_minor, 20_000);

    // Lowering only corrects the stored value.
    engine
        .update_goal(GoalUpdateCmd::new(goal.id, "alice").current_minor(5_000))
        .await
        .unwrap();
    assert_eq!(engine.notifications("alice").await.unwrap().len(), 1);

    let err = engine
        .update_goal(GoalUpdateCmd::new(goal.id, "alice").current_minor(60_000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn goal_validation_and_ownership() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .new_goal(GoalNewCmd::new("alice", "Zero", 0, deadline()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .new_goal(GoalNewCmd::new("alice", "   ", 100, deadline()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingField(_)));

    let goal = engine
        .new_goal(GoalNewCmd::new("alice", "Watch", 100, deadline()))
        .await
        .unwrap();
    let err = engine.goal(goal.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.delete_goal(goal.id, "alice").await.unwrap();
    let err = engine.goal(goal.id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn concurrent_incomes_never_overfill_a_goal() {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join(format!("goals_{}.db", Uuid::new_v4()));
    let db = Database::connect(format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    prepare(&db).await;
    let engine = Arc::new(
        Engine::builder()
            .database(db.clone())
            .build()
            .await
            .unwrap(),
    );

    let goal = engine
        .new_goal(GoalNewCmd::new("alice", "Fund", 1_000, deadline()).auto_allocate(true))
        .await
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move { income(&engine, "alice", 3_000).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    assert_eq!(engine.goal(goal.id, "alice").await.unwrap().current_minor, 1_000);
    let savings: i64 = engine
        .transactions(
            "alice",
            &TransactionListFilter {
                category: Some("Savings: Fund".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .iter()
        .map(|tx| tx.amount_minor)
        .sum();
    assert_eq!(savings, 1_000);

    drop(engine);
    drop(db);
    let _ = std::fs::remove_file(path);
}
