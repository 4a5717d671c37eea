//! User-facing alerts.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BudgetExceeded,
    GoalAllocation,
    Reminder,
    UnusualSpending,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BudgetExceeded => "budget_exceeded",
            Self::GoalAllocation => "goal_allocation",
            Self::Reminder => "reminder",
            Self::UnusualSpending => "unusual_spending",
        }
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "budget_exceeded" => Ok(Self::BudgetExceeded),
            "goal_allocation" => Ok(Self::GoalAllocation),
            "reminder" => Ok(Self::Reminder),
            "unusual_spending" => Ok(Self::UnusualSpending),
            other => Err(EngineError::InvalidData(format!(
                "invalid notification kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Unread,
    Read,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
        }
    }
}

impl TryFrom<&str> for NotificationStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "unread" => Ok(Self::Unread),
            "read" => Ok(Self::Read),
            other => Err(EngineError::InvalidData(format!(
                "invalid notification status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub message: String,
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub message: String,
    pub kind: String,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Notification {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            message: model.message,
            kind: NotificationKind::try_from(model.kind.as_str())?,
            status: NotificationStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}
