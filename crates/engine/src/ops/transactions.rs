use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Query,
};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, Transaction, TransactionKind, TransactionNewCmd,
    TransactionUpdateCmd,
    effects::EffectPayload,
    transaction_tags, transactions,
    util::{
        day_range_bounds, ensure_owner, normalize_category, normalize_category_key,
        normalize_optional_text, normalize_tags,
    },
};

use super::{Engine, with_tx};

/// Filters for listing transactions.
///
/// Dates are inclusive calendar days in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    /// Matched on the normalized category key.
    pub category: Option<String>,
    /// Matches transactions carrying at least one of these tags.
    pub tags: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn validate_amount(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "amount must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Persist a transaction together with its tags.
pub(super) async fn insert_transaction<C: ConnectionTrait>(
    db: &C,
    tx: &Transaction,
    category_norm: &str,
) -> ResultEngine<()> {
    transactions::ActiveModel::from_transaction(tx, category_norm)
        .insert(db)
        .await?;
    insert_tags(db, tx.id, &tx.tags).await
}

async fn insert_tags<C: ConnectionTrait>(db: &C, transaction_id: Uuid, tags: &[String]) -> ResultEngine<()> {
    for tag in tags {
        transaction_tags::ActiveModel {
            transaction_id: ActiveValue::Set(transaction_id),
            tag: ActiveValue::Set(tag.clone()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn load_tags<C: ConnectionTrait>(
    db: &C,
    transaction_ids: Vec<Uuid>,
) -> ResultEngine<HashMap<Uuid, Vec<String>>> {
    if transaction_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = transaction_tags::Entity::find()
        .filter(transaction_tags::Column::TransactionId.is_in(transaction_ids))
        .order_by_asc(transaction_tags::Column::Tag)
        .all(db)
        .await?;
    let mut out: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in rows {
        out.entry(row.transaction_id).or_default().push(row.tag);
    }
    Ok(out)
}

/// Convert models and attach their tags.
pub(super) async fn hydrate<C: ConnectionTrait>(
    db: &C,
    models: Vec<transactions::Model>,
) -> ResultEngine<Vec<Transaction>> {
    let mut tags = load_tags(db, models.iter().map(|m| m.id).collect()).await?;
    models
        .into_iter()
        .map(|model| {
            let id = model.id;
            let mut tx = Transaction::try_from(model)?;
            tx.tags = tags.remove(&id).unwrap_or_default();
            Ok(tx)
        })
        .collect()
}

async fn require_transaction<C: ConnectionTrait>(
    db: &C,
    transaction_id: Uuid,
    user_id: &str,
) -> ResultEngine<transactions::Model> {
    let model = transactions::Entity::find_by_id(transaction_id).one(db).await?;
    ensure_owner(model, |m| m.user_id.as_str(), user_id, "transaction")
}

impl Engine {
    /// Record an income or an expense.
    ///
    /// The amount is converted to the base currency first. For an expense
    /// the budget of its month is evaluated before the insert; an overrun
    /// queues a budget alert. An income queues a goal allocation. Queued
    /// effects are committed with the transaction and run right after;
    /// a failing effect stays pending for [`Engine::run_pending_effects`].
    pub async fn new_transaction(&self, cmd: TransactionNewCmd) -> ResultEngine<Transaction> {
        let TransactionNewCmd {
            user_id,
            kind,
            amount_minor,
            currency,
            category,
            tags,
            recurrence,
            occurred_at,
            note,
        } = cmd;

        validate_amount(amount_minor)?;
        let (category, category_norm) = normalize_category(&category)?;
        let converted = self.converter.convert(amount_minor, &currency).await?;

        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id,
            kind,
            amount_minor: converted,
            original_amount_minor: amount_minor,
            currency,
            category,
            tags: normalize_tags(&tags),
            recurrence,
            occurred_at,
            note: normalize_optional_text(note.as_deref()),
            goal_id: None,
            source_transaction_id: None,
            created_at: Utc::now(),
        };

        let _guard = self.lock_owner(&tx.user_id).await;

        let queued: Vec<Uuid> = with_tx!(self, |db_tx| {
            let mut payloads = Vec::new();
            if tx.kind == TransactionKind::Expense {
                let evaluation = self
                    .evaluate_budget_in(
                        &db_tx,
                        &tx.user_id,
                        &category_norm,
                        tx.occurred_at.month(),
                        tx.occurred_at.year(),
                        Money::new(tx.amount_minor),
                    )
                    .await;
                match evaluation {
                    Ok(Some(evaluation)) if evaluation.exceeded => {
                        payloads.push(EffectPayload::BudgetAlert {
                            budget_id: evaluation.budget_id,
                            category: tx.category.clone(),
                            limit_minor: evaluation.limit_minor,
                            total_minor: evaluation.total_minor,
                        });
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(
                            user_id = %tx.user_id,
                            "budget evaluation failed, recording expense anyway: {err}"
                        );
                    }
                }
            } else {
                payloads.push(EffectPayload::GoalAllocation {
                    income_minor: tx.amount_minor,
                    occurred_at: tx.occurred_at,
                });
            }

            insert_transaction(&db_tx, &tx, &category_norm).await?;

            let mut queued = Vec::with_capacity(payloads.len());
            for payload in payloads {
                queued.push(
                    self.enqueue_effect(&db_tx, &tx.user_id, tx.id, &payload)
                        .await?,
                );
            }
            Ok::<_, EngineError>(queued)
        })?;

        tracing::info!(
            user_id = %tx.user_id,
            transaction_id = %tx.id,
            kind = tx.kind.as_str(),
            amount_minor = tx.amount_minor,
            "transaction recorded"
        );

        self.run_effects(&queued).await;
        Ok(tx)
    }

    /// Return a [`Transaction`] (snapshot from DB).
    pub async fn transaction(&self, transaction_id: Uuid, user_id: &str) -> ResultEngine<Transaction> {
        let model = require_transaction(&self.database, transaction_id, user_id).await?;
        let mut txs = hydrate(&self.database, vec![model]).await?;
        txs.pop()
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    /// Transactions of `user_id` matching `filter`, newest first.
    pub async fn transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let (from, to) = day_range_bounds(filter.start_date, filter.end_date)?;

        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::CreatedAt);

        if let Some(category) = filter.category.as_deref() {
            let key = normalize_category_key(category)?;
            query = query.filter(transactions::Column::CategoryNorm.eq(key));
        }
        if let Some(from) = from {
            query = query.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(transactions::Column::OccurredAt.lt(to));
        }
        let tags = normalize_tags(&filter.tags);
        if !tags.is_empty() {
            query = query.filter(
                transactions::Column::Id.in_subquery(
                    Query::select()
                        .column(transaction_tags::Column::TransactionId)
                        .from(transaction_tags::Entity)
                        .and_where(transaction_tags::Column::Tag.is_in(tags))
                        .to_owned(),
                ),
            );
        }

        let models = query.all(&self.database).await?;
        hydrate(&self.database, models).await
    }

    /// Apply a partial update.
    ///
    /// Budgets and goals are not re-evaluated: an edit never emits alerts
    /// or allocations.
    pub async fn update_transaction(&self, cmd: TransactionUpdateCmd) -> ResultEngine<Transaction> {
        let TransactionUpdateCmd {
            transaction_id,
            user_id,
            kind,
            amount_minor,
            currency,
            category,
            tags,
            recurrence,
            occurred_at,
            note,
        } = cmd;

        let _guard = self.lock_owner(&user_id).await;

        let model = require_transaction(&self.database, transaction_id, &user_id).await?;
        let mut category_norm = model.category_norm.clone();
        let mut tx = hydrate(&self.database, vec![model])
            .await?
            .pop()
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;

        if amount_minor.is_some() || currency.is_some() {
            let amount_minor = amount_minor.unwrap_or(tx.original_amount_minor);
            let currency = currency.unwrap_or_else(|| tx.currency.clone());
            validate_amount(amount_minor)?;
            tx.amount_minor = self.converter.convert(amount_minor, &currency).await?;
            tx.original_amount_minor = amount_minor;
            tx.currency = currency;
        }
        if let Some(category) = category {
            let (display, key) = normalize_category(&category)?;
            tx.category = display;
            category_norm = key;
        }
        if let Some(kind) = kind {
            tx.kind = kind;
        }
        if let Some(recurrence) = recurrence {
            tx.recurrence = recurrence;
        }
        if let Some(occurred_at) = occurred_at {
            tx.occurred_at = occurred_at;
        }
        if let Some(note) = note {
            tx.note = normalize_optional_text(Some(note.as_str()));
        }
        let new_tags = tags.map(|tags| normalize_tags(&tags));
        if let Some(tags) = &new_tags {
            tx.tags = tags.clone();
        }

        with_tx!(self, |db_tx| {
            transactions::ActiveModel::from_transaction(&tx, &category_norm)
                .update(&db_tx)
                .await?;
            if let Some(tags) = &new_tags {
                transaction_tags::Entity::delete_many()
                    .filter(transaction_tags::Column::TransactionId.eq(tx.id))
                    .exec(&db_tx)
                    .await?;
                insert_tags(&db_tx, tx.id, tags).await?;
            }
            Ok::<_, EngineError>(())
        })?;

        Ok(tx)
    }

    /// Delete a transaction and its tags. Allocations it triggered are kept.
    pub async fn delete_transaction(&self, transaction_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            require_transaction(&db_tx, transaction_id, user_id).await?;
            transaction_tags::Entity::delete_many()
                .filter(transaction_tags::Column::TransactionId.eq(transaction_id))
                .exec(&db_tx)
                .await?;
            transactions::Entity::delete_by_id(transaction_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
