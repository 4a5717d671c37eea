//! Stored reports and the aggregation rule behind them.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, Transaction, TransactionKind, util::normalize_category_key,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Monthly,
    Yearly,
    Custom,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Custom => "custom",
        }
    }
}

impl TryFrom<&str> for ReportKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::InvalidData(format!(
                "invalid report kind: {other}"
            ))),
        }
    }
}

/// Totals computed over a set of transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportData {
    pub total_income_minor: i64,
    pub total_expense_minor: i64,
    pub net_balance_minor: i64,
    /// Category label -> income and expense amounts added together.
    pub category_breakdown: BTreeMap<String, i64>,
}

impl ReportData {
    /// Aggregates transactions into income/expense totals and a per-category
    /// breakdown.
    ///
    /// Categories are grouped by their normalized key and labelled with the
    /// first display label seen. Breakdown values are *not* netted: an income
    /// and an expense in the same category add up.
    pub fn aggregate<'a, I>(transactions: I) -> ResultEngine<Self>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let overflow = || EngineError::InvalidAmount("report total too large".to_string());

        let mut income = Money::ZERO;
        let mut expense = Money::ZERO;
        let mut labels: HashMap<String, String> = HashMap::new();
        let mut breakdown: BTreeMap<String, i64> = BTreeMap::new();

        for tx in transactions {
            let amount = Money::new(tx.amount_minor);
            match tx.kind {
                TransactionKind::Income => {
                    income = income.checked_add(amount).ok_or_else(overflow)?;
                }
                TransactionKind::Expense => {
                    expense = expense.checked_add(amount).ok_or_else(overflow)?;
                }
            }

            let key = normalize_category_key(&tx.category).unwrap_or_else(|_| tx.category.clone());
            let label = labels.entry(key).or_insert_with(|| tx.category.clone());
            let slot = breakdown.entry(label.clone()).or_insert(0);
            *slot = slot.checked_add(tx.amount_minor).ok_or_else(overflow)?;
        }

        Ok(Self {
            total_income_minor: income.minor(),
            total_expense_minor: expense.minor(),
            net_balance_minor: (income - expense).minor(),
            category_breakdown: breakdown,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub user_id: String,
    pub kind: ReportKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub categories: Vec<String>,
    pub data: ReportData,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub kind: String,
    pub start_date: Date,
    pub end_date: Date,
    /// JSON array of category labels used as filter.
    pub categories: String,
    /// JSON encoded [`ReportData`].
    pub data: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Report {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind: ReportKind::try_from(model.kind.as_str())?,
            start_date: model.start_date,
            end_date: model.end_date,
            categories: serde_json::from_str(&model.categories)?,
            data: serde_json::from_str(&model.data)?,
            created_at: model.created_at,
        })
    }
}
