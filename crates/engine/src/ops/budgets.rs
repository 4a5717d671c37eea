use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    Budget, BudgetEvaluation, BudgetNewCmd, BudgetStatus, BudgetUpdateCmd, EngineError, Money,
    ResultEngine, TransactionKind, budgets, transactions,
    util::{
        ensure_owner, month_bounds, normalize_category, normalize_category_key, validate_month,
    },
};

use super::{Engine, with_tx};

fn validate_limit(limit_minor: i64) -> ResultEngine<()> {
    if limit_minor < 0 {
        return Err(EngineError::InvalidAmount(
            "budget limit must be >= 0".to_string(),
        ));
    }
    Ok(())
}

fn duplicate_budget(category: &str, month: u32, year: i32) -> EngineError {
    EngineError::ExistingKey(format!("budget {category} {month:02}/{year}"))
}

fn map_unique_violation(err: DbErr, category: &str, month: u32, year: i32) -> EngineError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_budget(category, month, year),
        _ => EngineError::Database(err),
    }
}

/// Sum of the owner's expenses in a category for one calendar month.
pub(super) async fn spent_in_month<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    category_norm: &str,
    month: u32,
    year: i32,
) -> ResultEngine<Money> {
    let (start, end) = month_bounds(month, year)?;
    let amounts: Vec<i64> = transactions::Entity::find()
        .select_only()
        .column(transactions::Column::AmountMinor)
        .filter(transactions::Column::UserId.eq(user_id))
        .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
        .filter(transactions::Column::CategoryNorm.eq(category_norm))
        .filter(transactions::Column::OccurredAt.gte(start))
        .filter(transactions::Column::OccurredAt.lt(end))
        .into_tuple()
        .all(db)
        .await?;
    amounts
        .into_iter()
        .try_fold(Money::ZERO, |acc, amount| acc.checked_add(Money::new(amount)))
        .ok_or_else(|| EngineError::InvalidAmount("monthly spend too large".to_string()))
}

async fn find_period_budget<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    category_norm: &str,
    month: u32,
    year: i32,
) -> ResultEngine<Option<budgets::Model>> {
    let model = budgets::Entity::find()
        .filter(budgets::Column::UserId.eq(user_id))
        .filter(budgets::Column::CategoryNorm.eq(category_norm))
        .filter(budgets::Column::Month.eq(month as i32))
        .filter(budgets::Column::Year.eq(year))
        .one(db)
        .await?;
    Ok(model)
}

async fn require_budget<C: ConnectionTrait>(
    db: &C,
    budget_id: Uuid,
    user_id: &str,
) -> ResultEngine<budgets::Model> {
    let model = budgets::Entity::find_by_id(budget_id).one(db).await?;
    ensure_owner(model, |m| m.user_id.as_str(), user_id, "budget")
}

impl Engine {
    pub(super) async fn evaluate_budget_in<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        category_norm: &str,
        month: u32,
        year: i32,
        candidate: Money,
    ) -> ResultEngine<Option<BudgetEvaluation>> {
        let Some(budget) = find_period_budget(db, user_id, category_norm, month, year).await?
        else {
            return Ok(None);
        };
        let spent = spent_in_month(db, user_id, category_norm, month, year).await?;
        Ok(Some(BudgetEvaluation::compute(
            budget.id,
            Money::new(budget.limit_minor),
            spent,
            candidate,
        )))
    }

    /// Compare the month's spend plus `candidate_minor` with the budget of
    /// `(category, month, year)`.
    ///
    /// Returns `None` when no budget covers the period. Nothing is persisted.
    pub async fn evaluate_budget(
        &self,
        user_id: &str,
        category: &str,
        month: u32,
        year: i32,
        candidate_minor: i64,
    ) -> ResultEngine<Option<BudgetEvaluation>> {
        validate_month(month, year)?;
        let key = normalize_category_key(category)?;
        self.evaluate_budget_in(
            &self.database,
            user_id,
            &key,
            month,
            year,
            Money::new(candidate_minor),
        )
        .await
    }

    /// Add a budget. At most one budget exists per category and month.
    pub async fn new_budget(&self, cmd: BudgetNewCmd) -> ResultEngine<Budget> {
        validate_month(cmd.month, cmd.year)?;
        validate_limit(cmd.limit_minor)?;
        let (category, category_norm) = normalize_category(&cmd.category)?;

        let budget = Budget {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            category,
            limit_minor: cmd.limit_minor,
            month: cmd.month,
            year: cmd.year,
            alert_sent: false,
            created_at: Utc::now(),
        };

        with_tx!(self, |db_tx| {
            if find_period_budget(&db_tx, &budget.user_id, &category_norm, budget.month, budget.year)
                .await?
                .is_some()
            {
                return Err(duplicate_budget(&budget.category, budget.month, budget.year));
            }

            budgets::ActiveModel {
                id: ActiveValue::Set(budget.id),
                user_id: ActiveValue::Set(budget.user_id.clone()),
                category: ActiveValue::Set(budget.category.clone()),
                category_norm: ActiveValue::Set(category_norm.clone()),
                limit_minor: ActiveValue::Set(budget.limit_minor),
                month: ActiveValue::Set(budget.month as i32),
                year: ActiveValue::Set(budget.year),
                alert_sent: ActiveValue::Set(false),
                created_at: ActiveValue::Set(budget.created_at),
            }
            .insert(&db_tx)
            .await
            .map_err(|err| map_unique_violation(err, &budget.category, budget.month, budget.year))?;

            tracing::info!(user_id = %budget.user_id, category = %budget.category, "budget created");
            Ok(budget)
        })
    }

    /// Budgets of `user_id`, latest period first.
    pub async fn budgets(&self, user_id: &str) -> ResultEngine<Vec<Budget>> {
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_desc(budgets::Column::Year)
            .order_by_desc(budgets::Column::Month)
            .order_by_asc(budgets::Column::CategoryNorm)
            .all(&self.database)
            .await?;
        models.into_iter().map(Budget::try_from).collect()
    }

    pub async fn budget(&self, budget_id: Uuid, user_id: &str) -> ResultEngine<Budget> {
        let model = require_budget(&self.database, budget_id, user_id).await?;
        Budget::try_from(model)
    }

    /// Apply a partial update. Changing the limit re-arms the overrun alert.
    pub async fn update_budget(&self, cmd: BudgetUpdateCmd) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let model = require_budget(&db_tx, cmd.budget_id, &cmd.user_id).await?;

            let month = cmd.month.unwrap_or(model.month as u32);
            let year = cmd.year.unwrap_or(model.year);
            validate_month(month, year)?;
            let (category, category_norm) = match cmd.category.as_deref() {
                Some(category) => normalize_category(category)?,
                None => (model.category.clone(), model.category_norm.clone()),
            };

            let period_changed = month as i32 != model.month
                || year != model.year
                || category_norm != model.category_norm;
            if period_changed
                && find_period_budget(&db_tx, &cmd.user_id, &category_norm, month, year)
                    .await?
                    .is_some_and(|other| other.id != model.id)
            {
                return Err(duplicate_budget(&category, month, year));
            }

            let mut active: budgets::ActiveModel = model.clone().into();
            if let Some(limit_minor) = cmd.limit_minor {
                validate_limit(limit_minor)?;
                if limit_minor != model.limit_minor {
                    active.limit_minor = ActiveValue::Set(limit_minor);
                    active.alert_sent = ActiveValue::Set(false);
                }
            }
            active.category = ActiveValue::Set(category.clone());
            active.category_norm = ActiveValue::Set(category_norm);
            active.month = ActiveValue::Set(month as i32);
            active.year = ActiveValue::Set(year);

            let updated = active
                .update(&db_tx)
                .await
                .map_err(|err| map_unique_violation(err, &category, month, year))?;
            Budget::try_from(updated)
        })
    }

    pub async fn delete_budget(&self, budget_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            require_budget(&db_tx, budget_id, user_id).await?;
            budgets::Entity::delete_by_id(budget_id).exec(&db_tx).await?;
            Ok(())
        })
    }

    /// Spend against every budget of a period.
    pub async fn budget_status(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
    ) -> ResultEngine<Vec<BudgetStatus>> {
        validate_month(month, year)?;
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::Month.eq(month as i32))
            .filter(budgets::Column::Year.eq(year))
            .order_by_asc(budgets::Column::CategoryNorm)
            .all(&self.database)
            .await?;

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let spent =
                spent_in_month(&self.database, user_id, &model.category_norm, month, year).await?;
            let limit = Money::new(model.limit_minor);
            out.push(BudgetStatus {
                budget_id: model.id,
                category: model.category,
                limit_minor: model.limit_minor,
                spent_minor: spent.minor(),
                percentage: spent.percent_of(limit),
            });
        }
        Ok(out)
    }
}
