//! Monthly per-category spending limits.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: String,
    pub category: String,
    pub limit_minor: i64,
    pub month: u32,
    pub year: i32,
    /// Set once an overrun alert has been emitted for this period; cleared
    /// when the limit changes.
    pub alert_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of comparing a month's spend (plus a candidate expense) with the
/// budget limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEvaluation {
    pub budget_id: Uuid,
    pub limit_minor: i64,
    /// Prior spend plus the candidate amount.
    pub total_minor: i64,
    pub exceeded: bool,
}

impl BudgetEvaluation {
    /// `exceeded` holds iff `spent + candidate > limit`.
    #[must_use]
    pub fn compute(budget_id: Uuid, limit: Money, spent: Money, candidate: Money) -> Self {
        let total = spent
            .checked_add(candidate)
            .unwrap_or(Money::new(i64::MAX));
        Self {
            budget_id,
            limit_minor: limit.minor(),
            total_minor: total.minor(),
            exceeded: total > limit,
        }
    }
}

/// Spend report for one budget of a period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub budget_id: Uuid,
    pub category: String,
    pub limit_minor: i64,
    pub spent_minor: i64,
    /// `spent / limit * 100`, two decimals; `None` for a zero limit.
    pub percentage: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub category: String,
    pub category_norm: String,
    pub limit_minor: i64,
    pub month: i32,
    pub year: i32,
    pub alert_sent: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let month = u32::try_from(model.month)
            .map_err(|_| EngineError::InvalidData(format!("invalid month {}", model.month)))?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            category: model.category,
            limit_minor: model.limit_minor,
            month,
            year: model.year,
            alert_sent: model.alert_sent,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(limit: i64, spent: i64, candidate: i64) -> BudgetEvaluation {
        BudgetEvaluation::compute(
            Uuid::nil(),
            Money::new(limit),
            Money::new(spent),
            Money::new(candidate),
        )
    }

    #[test]
    fn exceeded_only_when_strictly_above_limit() {
        let over = eval(50_000, 45_000, 10_000);
        assert!(over.exceeded);
        assert_eq!(over.total_minor, 55_000);

        assert!(!eval(50_000, 45_000, 5_000).exceeded);
        assert!(!eval(50_000, 0, 100).exceeded);
    }

    #[test]
    fn zero_limit_with_any_spend_is_exceeded() {
        assert!(eval(0, 0, 1).exceeded);
        assert!(!eval(0, 0, 0).exceeded);
    }
}
