//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense, always stored in the base
//! ledger currency. The amount originally entered and its currency are kept
//! next to the converted amount.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidData(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// How often a transaction repeats. Informational only: nothing is
/// scheduled from it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl TryFrom<&str> for Recurrence {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::InvalidData(format!(
                "invalid recurrence: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub kind: TransactionKind,
    /// Amount in the base currency, minor units, always > 0.
    pub amount_minor: i64,
    /// Amount as entered, in `currency` minor units.
    pub original_amount_minor: i64,
    /// Currency the amount was entered in.
    pub currency: Currency,
    pub category: String,
    pub tags: Vec<String>,
    pub recurrence: Recurrence,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    /// Set on the expense recorded when savings are moved into a goal.
    pub goal_id: Option<Uuid>,
    /// Income that triggered an automatic allocation.
    pub source_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub original_amount_minor: i64,
    pub currency: String,
    pub category: String,
    pub category_norm: String,
    pub recurrence: String,
    pub occurred_at: DateTimeUtc,
    pub note: Option<String>,
    pub goal_id: Option<Uuid>,
    pub source_transaction_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_tags::Entity")]
    Tags,
}

impl Related<super::transaction_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_transaction(tx: &Transaction, category_norm: &str) -> Self {
        Self {
            id: ActiveValue::Set(tx.id),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            original_amount_minor: ActiveValue::Set(tx.original_amount_minor),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            category: ActiveValue::Set(tx.category.clone()),
            category_norm: ActiveValue::Set(category_norm.to_string()),
            recurrence: ActiveValue::Set(tx.recurrence.as_str().to_string()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            note: ActiveValue::Set(tx.note.clone()),
            goal_id: ActiveValue::Set(tx.goal_id),
            source_transaction_id: ActiveValue::Set(tx.source_transaction_id),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            original_amount_minor: model.original_amount_minor,
            currency: Currency::try_from(model.currency.as_str())
                .map_err(|err| EngineError::InvalidData(err.to_string()))?,
            category: model.category,
            tags: Vec::new(),
            recurrence: Recurrence::try_from(model.recurrence.as_str())?,
            occurred_at: model.occurred_at,
            note: model.note,
            goal_id: model.goal_id,
            source_transaction_id: model.source_transaction_id,
            created_at: model.created_at,
        })
    }
}
