//! Outbox of follow-up work queued by a transaction.
//!
//! Budget alerts and goal allocations are written here in the same database
//! transaction as the transaction that caused them and executed after the
//! commit. A failed effect stays `pending` and is picked up again by
//! `Engine::run_pending_effects`.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    BudgetAlert,
    GoalAllocation,
}

impl EffectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BudgetAlert => "budget_alert",
            Self::GoalAllocation => "goal_allocation",
        }
    }
}

impl TryFrom<&str> for EffectKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "budget_alert" => Ok(Self::BudgetAlert),
            "goal_allocation" => Ok(Self::GoalAllocation),
            other => Err(EngineError::InvalidData(format!(
                "invalid effect kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectStatus {
    Pending,
    Done,
}

impl EffectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }
}

impl TryFrom<&str> for EffectStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            other => Err(EngineError::InvalidData(format!(
                "invalid effect status: {other}"
            ))),
        }
    }
}

/// Work carried by an outbox row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum EffectPayload {
    BudgetAlert {
        budget_id: Uuid,
        category: String,
        limit_minor: i64,
        total_minor: i64,
    },
    GoalAllocation {
        income_minor: i64,
        occurred_at: DateTime<Utc>,
    },
}

impl EffectPayload {
    pub(crate) fn kind(&self) -> EffectKind {
        match self {
            Self::BudgetAlert { .. } => EffectKind::BudgetAlert,
            Self::GoalAllocation { .. } => EffectKind::GoalAllocation,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffect {
    pub id: Uuid,
    pub user_id: String,
    pub transaction_id: Uuid,
    pub kind: EffectKind,
    pub status: EffectStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Outcome of one outbox pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectRun {
    pub completed: usize,
    pub failed: usize,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "side_effects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub transaction_id: Uuid,
    pub kind: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTimeUtc,
    pub processed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for SideEffect {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            transaction_id: model.transaction_id,
            kind: EffectKind::try_from(model.kind.as_str())?,
            status: EffectStatus::try_from(model.status.as_str())?,
            attempts: u32::try_from(model.attempts).unwrap_or_default(),
            last_error: model.last_error,
            created_at: model.created_at,
            processed_at: model.processed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_tagged_by_kind() {
        let payload = EffectPayload::BudgetAlert {
            budget_id: Uuid::nil(),
            category: "Food".to_string(),
            limit_minor: 50_000,
            total_minor: 55_000,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "budget_alert");
        assert_eq!(payload.kind(), EffectKind::BudgetAlert);

        let back: EffectPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }
}
