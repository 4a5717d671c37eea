//! Savings goals.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub target_minor: i64,
    /// Always within `0..=target_minor`.
    pub current_minor: i64,
    pub deadline: NaiveDate,
    pub auto_allocate: bool,
    /// Higher goes first under the priority strategy.
    pub priority: i32,
    /// Overrides the engine-wide allocation rate for this goal.
    pub allocation_rate_bps: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Capacity left before the target is reached.
    #[must_use]
    pub fn remaining(&self) -> Money {
        Money::new(self.target_minor).saturating_remaining(Money::new(self.current_minor))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub target_minor: i64,
    pub current_minor: i64,
    pub deadline: Date,
    pub auto_allocate: bool,
    pub priority: i32,
    pub allocation_rate_bps: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Goal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let allocation_rate_bps = model
            .allocation_rate_bps
            .map(|bps| {
                u32::try_from(bps)
                    .map_err(|_| EngineError::InvalidData(format!("invalid allocation rate {bps}")))
            })
            .transpose()?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            target_minor: model.target_minor,
            current_minor: model.current_minor,
            deadline: model.deadline,
            auto_allocate: model.auto_allocate,
            priority: model.priority,
            allocation_rate_bps,
            created_at: model.created_at,
        })
    }
}
