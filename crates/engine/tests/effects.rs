use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    BudgetNewCmd, EffectKind, EffectStatus, Engine, GoalNewCmd, TransactionKind,
    TransactionNewCmd,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn exec(db: &DatabaseConnection, sql: &str) {
    db.execute_unprepared(sql).await.unwrap();
}

#[tokio::test]
async fn failed_budget_alert_stays_pending_until_retried() {
    let (engine, db) = engine_with_db().await;
    let budget = engine
        .new_budget(BudgetNewCmd::new("alice", "Food", 1_000, 3, 2025))
        .await
        .unwrap();

    exec(&db, "ALTER TABLE notifications RENAME TO notifications_off").await;

    // The expense itself is recorded even though its alert cannot be written.
    let tx = engine
        .new_transaction(TransactionNewCmd::new(
            "alice",
            TransactionKind::Expense,
            1_500,
            "Food",
            Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap(),
        ))
        .await
        .unwrap();
    assert!(engine.transaction(tx.id, "alice").await.is_ok());

    let pending = engine.pending_effects("alice").await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, EffectKind::BudgetAlert);
    assert_eq!(pending[0].status, EffectStatus::Pending);
    assert_eq!(pending[0].transaction_id, tx.id);
    assert_eq!(pending[0].attempts, 1);
    assert!(pending[0].last_error.is_some());
    assert!(!engine.budget(budget.id, "alice").await.unwrap().alert_sent);

    exec(&db, "ALTER TABLE notifications_off RENAME TO notifications").await;

    let run = engine.run_pending_effects().await.unwrap();
    assert_eq!(run.completed, 1);
    assert_eq!(run.failed, 0);
    assert!(engine.pending_effects("alice").await.unwrap().is_empty());
    assert!(engine.budget(budget.id, "alice").await.unwrap().alert_sent);
    assert_eq!(engine.notifications("alice").await.unwrap().len(), 1);

    let run = engine.run_pending_effects().await.unwrap();
    assert_eq!(run.completed, 0);
    assert_eq!(engine.notifications("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn retried_allocation_is_applied_once() {
    let (engine, db) = engine_with_db().await;
    let goal = engine
        .new_goal(
            GoalNewCmd::new(
                "alice",
                "Trip",
                100_000,
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            )
            .auto_allocate(true),
        )
        .await
        .unwrap();

    exec(&db, "ALTER TABLE notifications RENAME TO notifications_off").await;
    engine
        .new_transaction(TransactionNewCmd::new(
            "alice",
            TransactionKind::Income,
            20_000,
            "Salary",
            Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
        ))
        .await
        .unwrap();

    // The allocation rolled back as a whole.
    assert_eq!(engine.goal(goal.id, "alice").await.unwrap().current_minor, 0);
    assert_eq!(engine.pending_effects("alice").await.unwrap().len(), 1);

    exec(&db, "ALTER TABLE notifications_off RENAME TO notifications").await;
    assert_eq!(engine.run_pending_effects().await.unwrap().completed, 1);
    assert_eq!(engine.run_pending_effects().await.unwrap().completed, 0);

    assert_eq!(engine.goal(goal.id, "alice").await.unwrap().current_minor, 2_000);
    assert_eq!(engine.notifications("alice").await.unwrap().len(), 2);
}
