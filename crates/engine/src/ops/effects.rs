use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Currency, EffectRun, EffectStatus, EngineError, Money, NotificationKind, ResultEngine,
    SideEffect, budgets,
    effects::{self, EffectPayload},
};

use super::{Engine, notifications::insert_notification, with_tx};

impl Engine {
    /// Queue follow-up work for `transaction_id` inside the caller's DB
    /// transaction.
    pub(super) async fn enqueue_effect<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        transaction_id: Uuid,
        payload: &EffectPayload,
    ) -> ResultEngine<Uuid> {
        let id = Uuid::new_v4();
        effects::ActiveModel {
            id: ActiveValue::Set(id),
            user_id: ActiveValue::Set(user_id.to_string()),
            transaction_id: ActiveValue::Set(transaction_id),
            kind: ActiveValue::Set(payload.kind().as_str().to_string()),
            payload: ActiveValue::Set(serde_json::to_string(payload)?),
            status: ActiveValue::Set(EffectStatus::Pending.as_str().to_string()),
            attempts: ActiveValue::Set(0),
            last_error: ActiveValue::Set(None),
            created_at: ActiveValue::Set(Utc::now()),
            processed_at: ActiveValue::Set(None),
        }
        .insert(db)
        .await?;
        Ok(id)
    }

    /// Execute one effect and mark it done, atomically.
    ///
    /// Returns `false` when the effect was already done.
    async fn apply_effect(&self, effect_id: Uuid) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let model = effects::Entity::find_by_id(effect_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("side effect not exists".to_string()))?;
            if EffectStatus::try_from(model.status.as_str())? == EffectStatus::Done {
                return Ok(false);
            }

            let payload: EffectPayload = serde_json::from_str(&model.payload)?;
            match payload {
                EffectPayload::BudgetAlert {
                    budget_id,
                    category,
                    limit_minor,
                    total_minor,
                } => {
                    budgets::Entity::update_many()
                        .col_expr(budgets::Column::AlertSent, Expr::value(true))
                        .filter(budgets::Column::Id.eq(budget_id))
                        .exec(&db_tx)
                        .await?;
                    let base = Currency::base();
                    insert_notification(
                        &db_tx,
                        &model.user_id,
                        NotificationKind::BudgetExceeded,
                        format!(
                            "Your budget for {category} has been exceeded. Limit: {}, Spent: {}",
                            Money::new(limit_minor).with_currency(&base),
                            Money::new(total_minor).with_currency(&base)
                        ),
                    )
                    .await?;
                }
                EffectPayload::GoalAllocation {
                    income_minor,
                    occurred_at,
                } => {
                    self.allocate_income_in(
                        &db_tx,
                        &model.user_id,
                        Money::new(income_minor),
                        occurred_at,
                        Some(model.transaction_id),
                    )
                    .await?;
                }
            }

            let attempts = model.attempts + 1;
            let mut active: effects::ActiveModel = model.into();
            active.status = ActiveValue::Set(EffectStatus::Done.as_str().to_string());
            active.attempts = ActiveValue::Set(attempts);
            active.last_error = ActiveValue::Set(None);
            active.processed_at = ActiveValue::Set(Some(Utc::now()));
            active.update(&db_tx).await?;
            Ok(true)
        })
    }

    async fn record_effect_failure(&self, effect_id: Uuid, err: &EngineError) -> ResultEngine<()> {
        effects::Entity::update_many()
            .col_expr(
                effects::Column::Attempts,
                Expr::col(effects::Column::Attempts).add(1),
            )
            .col_expr(effects::Column::LastError, Expr::value(err.to_string()))
            .filter(effects::Column::Id.eq(effect_id))
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Run the given effects in order. The caller holds the owner lock.
    ///
    /// Failures are logged and recorded on the row, which stays pending.
    pub(super) async fn run_effects(&self, effect_ids: &[Uuid]) -> EffectRun {
        let mut run = EffectRun::default();
        for &effect_id in effect_ids {
            match self.apply_effect(effect_id).await {
                Ok(true) => run.completed += 1,
                Ok(false) => {}
                Err(err) => {
                    run.failed += 1;
                    tracing::warn!(effect_id = %effect_id, "side effect failed: {err}");
                    if let Err(record_err) = self.record_effect_failure(effect_id, &err).await {
                        tracing::error!(
                            effect_id = %effect_id,
                            "cannot record side effect failure: {record_err}"
                        );
                    }
                }
            }
        }
        run
    }

    /// Retry every pending effect, oldest first, one owner at a time.
    pub async fn run_pending_effects(&self) -> ResultEngine<EffectRun> {
        let pending = effects::Entity::find()
            .filter(effects::Column::Status.eq(EffectStatus::Pending.as_str()))
            .order_by_asc(effects::Column::UserId)
            .order_by_asc(effects::Column::CreatedAt)
            .all(&self.database)
            .await?;

        let mut total = EffectRun::default();
        let mut index = 0;
        while index < pending.len() {
            let user_id = pending[index].user_id.clone();
            let ids: Vec<Uuid> = pending[index..]
                .iter()
                .take_while(|m| m.user_id == user_id)
                .map(|m| m.id)
                .collect();
            index += ids.len();

            let _guard = self.lock_owner(&user_id).await;
            let run = self.run_effects(&ids).await;
            total.completed += run.completed;
            total.failed += run.failed;
        }

        if total.completed + total.failed > 0 {
            tracing::info!(
                completed = total.completed,
                failed = total.failed,
                "pending side effects processed"
            );
        }
        Ok(total)
    }

    /// Effects of `user_id` still waiting to run.
    pub async fn pending_effects(&self, user_id: &str) -> ResultEngine<Vec<SideEffect>> {
        let models = effects::Entity::find()
            .filter(effects::Column::UserId.eq(user_id))
            .filter(effects::Column::Status.eq(EffectStatus::Pending.as_str()))
            .order_by_asc(effects::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(SideEffect::try_from).collect()
    }
}
