use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    AllocationShare, Currency, EngineError, Goal, GoalNewCmd, GoalUpdateCmd, Money,
    NotificationKind, Recurrence, ResultEngine, Transaction, TransactionKind, goals,
    util::{ensure_owner, normalize_category, normalize_required_name},
};

use super::{
    Engine, notifications::insert_notification, transactions::insert_transaction, validate_bps,
    with_tx,
};

fn validate_goal_amounts(target_minor: i64, current_minor: i64) -> ResultEngine<()> {
    if target_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "target amount must be > 0".to_string(),
        ));
    }
    if current_minor < 0 || current_minor > target_minor {
        return Err(EngineError::InvalidAmount(format!(
            "current savings must be between 0 and {}",
            Money::new(target_minor)
        )));
    }
    Ok(())
}

async fn require_goal<C: ConnectionTrait>(
    db: &C,
    goal_id: Uuid,
    user_id: &str,
) -> ResultEngine<goals::Model> {
    let model = goals::Entity::find_by_id(goal_id).one(db).await?;
    ensure_owner(model, |m| m.user_id.as_str(), user_id, "goal")
}

/// Record money moved into a goal as an expense tagged with the goal.
async fn insert_savings_transaction<C: ConnectionTrait>(
    db: &C,
    goal: &Goal,
    amount: Money,
    occurred_at: DateTime<Utc>,
    source_transaction_id: Option<Uuid>,
) -> ResultEngine<Transaction> {
    let (category, category_norm) = normalize_category(&format!("Savings: {}", goal.name))?;
    let tx = Transaction {
        id: Uuid::new_v4(),
        user_id: goal.user_id.clone(),
        kind: TransactionKind::Expense,
        amount_minor: amount.minor(),
        original_amount_minor: amount.minor(),
        currency: Currency::base(),
        category,
        tags: Vec::new(),
        recurrence: Recurrence::None,
        occurred_at,
        note: None,
        goal_id: Some(goal.id),
        source_transaction_id,
        created_at: Utc::now(),
    };
    insert_transaction(db, &tx, &category_norm).await?;
    Ok(tx)
}

async fn set_current<C: ConnectionTrait>(db: &C, goal_id: Uuid, current_minor: i64) -> ResultEngine<()> {
    goals::ActiveModel {
        id: ActiveValue::Set(goal_id),
        current_minor: ActiveValue::Set(current_minor),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

impl Engine {
    /// Move a share of `income` into every auto-allocate goal of the owner.
    ///
    /// Each share becomes a `Savings: <goal>` expense dated at
    /// `occurred_at` and a per-goal notification; a summary notification
    /// follows when anything was allocated.
    pub(super) async fn allocate_income_in<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        income: Money,
        occurred_at: DateTime<Utc>,
        source_transaction_id: Option<Uuid>,
    ) -> ResultEngine<Vec<AllocationShare>> {
        let goals: Vec<Goal> = goals::Entity::find()
            .filter(goals::Column::UserId.eq(user_id))
            .filter(goals::Column::AutoAllocate.eq(true))
            .all(db)
            .await?
            .into_iter()
            .map(Goal::try_from)
            .collect::<ResultEngine<_>>()?;

        let shares = self.allocation.plan(income, &goals);
        let base = Currency::base();
        let mut total = Money::ZERO;

        for share in &shares {
            let Some(goal) = goals.iter().find(|g| g.id == share.goal_id) else {
                continue;
            };
            insert_savings_transaction(db, goal, share.amount, occurred_at, source_transaction_id)
                .await?;
            set_current(db, goal.id, goal.current_minor + share.amount.minor()).await?;
            insert_notification(
                db,
                user_id,
                NotificationKind::GoalAllocation,
                format!(
                    "{} has been allocated to your goal \"{}\".",
                    share.amount.with_currency(&base),
                    goal.name
                ),
            )
            .await?;
            total += share.amount;
        }

        if total.is_positive() {
            insert_notification(
                db,
                user_id,
                NotificationKind::GoalAllocation,
                format!(
                    "A total of {} from your income has been allocated to your savings goals.",
                    total.with_currency(&base)
                ),
            )
            .await?;
            tracing::info!(user_id, total_minor = total.minor(), goals = shares.len(), "income allocated");
        }

        Ok(shares)
    }

    /// Allocate an income amount (base currency) to the owner's goals.
    ///
    /// Calling this twice allocates twice; incomes recorded through
    /// [`Engine::new_transaction`] are allocated exactly once by the outbox.
    pub async fn allocate_income(
        &self,
        user_id: &str,
        income_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Vec<AllocationShare>> {
        if income_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "income must be > 0".to_string(),
            ));
        }
        let _guard = self.lock_owner(user_id).await;
        with_tx!(self, |db_tx| {
            let shares = self
                .allocate_income_in(&db_tx, user_id, Money::new(income_minor), occurred_at, None)
                .await?;
            Ok(shares)
        })
    }

    pub async fn new_goal(&self, cmd: GoalNewCmd) -> ResultEngine<Goal> {
        let name = normalize_required_name(&cmd.name, "goal name")?;
        validate_goal_amounts(cmd.target_minor, cmd.current_minor)?;
        if let Some(bps) = cmd.allocation_rate_bps {
            validate_bps(bps, "allocation rate")?;
        }

        let goal = Goal {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            name,
            target_minor: cmd.target_minor,
            current_minor: cmd.current_minor,
            deadline: cmd.deadline,
            auto_allocate: cmd.auto_allocate,
            priority: cmd.priority,
            allocation_rate_bps: cmd.allocation_rate_bps,
            created_at: Utc::now(),
        };

        with_tx!(self, |db_tx| {
            goals::ActiveModel {
                id: ActiveValue::Set(goal.id),
                user_id: ActiveValue::Set(goal.user_id.clone()),
                name: ActiveValue::Set(goal.name.clone()),
                target_minor: ActiveValue::Set(goal.target_minor),
                current_minor: ActiveValue::Set(goal.current_minor),
                deadline: ActiveValue::Set(goal.deadline),
                auto_allocate: ActiveValue::Set(goal.auto_allocate),
                priority: ActiveValue::Set(goal.priority),
                allocation_rate_bps: ActiveValue::Set(goal.allocation_rate_bps.map(|bps| bps as i32)),
                created_at: ActiveValue::Set(goal.created_at),
            }
            .insert(&db_tx)
            .await?;
            Ok(goal)
        })
    }

    /// Goals of `user_id`, oldest first.
    pub async fn goals(&self, user_id: &str) -> ResultEngine<Vec<Goal>> {
        let models = goals::Entity::find()
            .filter(goals::Column::UserId.eq(user_id))
            .order_by_asc(goals::Column::CreatedAt)
            .order_by_asc(goals::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Goal::try_from).collect()
    }

    pub async fn goal(&self, goal_id: Uuid, user_id: &str) -> ResultEngine<Goal> {
        let model = require_goal(&self.database, goal_id, user_id).await?;
        Goal::try_from(model)
    }

    /// Apply a partial update.
    ///
    /// A higher `current_minor` is a manual contribution: the difference is
    /// recorded as a savings expense and the owner is notified. Lowering it
    /// only corrects the stored value.
    pub async fn update_goal(&self, cmd: GoalUpdateCmd) -> ResultEngine<Goal> {
        let GoalUpdateCmd {
            goal_id,
            user_id,
            name,
            target_minor,
            current_minor,
            deadline,
            auto_allocate,
            priority,
            allocation_rate_bps,
        } = cmd;

        let _guard = self.lock_owner(&user_id).await;

        with_tx!(self, |db_tx| {
            let model = require_goal(&db_tx, goal_id, &user_id).await?;
            let before = Goal::try_from(model)?;
            let mut goal = before.clone();

            if let Some(name) = name {
                goal.name = normalize_required_name(&name, "goal name")?;
            }
            if let Some(target_minor) = target_minor {
                goal.target_minor = target_minor;
            }
            if let Some(current_minor) = current_minor {
                goal.current_minor = current_minor;
            }
            if let Some(deadline) = deadline {
                goal.deadline = deadline;
            }
            if let Some(auto_allocate) = auto_allocate {
                goal.auto_allocate = auto_allocate;
            }
            if let Some(priority) = priority {
                goal.priority = priority;
            }
            if let Some(bps) = allocation_rate_bps {
                validate_bps(bps, "allocation rate")?;
                goal.allocation_rate_bps = Some(bps);
            }
            validate_goal_amounts(goal.target_minor, goal.current_minor)?;

            goals::ActiveModel {
                id: ActiveValue::Set(goal.id),
                user_id: ActiveValue::Unchanged(goal.user_id.clone()),
                name: ActiveValue::Set(goal.name.clone()),
                target_minor: ActiveValue::Set(goal.target_minor),
                current_minor: ActiveValue::Set(goal.current_minor),
                deadline: ActiveValue::Set(goal.deadline),
                auto_allocate: ActiveValue::Set(goal.auto_allocate),
                priority: ActiveValue::Set(goal.priority),
                allocation_rate_bps: ActiveValue::Set(goal.allocation_rate_bps.map(|bps| bps as i32)),
                created_at: ActiveValue::Unchanged(goal.created_at),
            }
            .update(&db_tx)
            .await?;

            let contribution = Money::new(goal.current_minor - before.current_minor);
            if contribution.is_positive() {
                insert_savings_transaction(&db_tx, &goal, contribution, Utc::now(), None).await?;
                insert_notification(
                    &db_tx,
                    &goal.user_id,
                    NotificationKind::GoalAllocation,
                    format!(
                        "{} has been added to your goal \"{}\".",
                        contribution.with_currency(&Currency::base()),
                        goal.name
                    ),
                )
                .await?;
            }

            Ok(goal)
        })
    }

    pub async fn delete_goal(&self, goal_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            require_goal(&db_tx, goal_id, user_id).await?;
            goals::Entity::delete_by_id(goal_id).exec(&db_tx).await?;
            Ok(())
        })
    }
}
