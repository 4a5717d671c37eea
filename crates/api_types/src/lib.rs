use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Recurrence {
        #[default]
        None,
        Daily,
        Weekly,
        Monthly,
    }

    /// Request body of `POST /transactions`.
    ///
    /// Every field is optional on the wire so that a missing one is reported
    /// as a validation error naming the field.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionNew {
        /// Decimal amount in `currency` (`12.50`), must be > 0.
        pub amount: Option<f64>,
        /// Same amount in minor units; wins over `amount` when both are sent.
        pub amount_minor: Option<i64>,
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub category: Option<String>,
        /// Three-letter code; defaults to the base currency (`LKR`).
        pub currency: Option<String>,
        pub tags: Option<Vec<String>>,
        pub recurrence: Option<Recurrence>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub date: Option<DateTime<FixedOffset>>,
        pub notes: Option<String>,
    }

    /// Request body of `PUT /transactions/{id}`; absent fields are kept.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub amount: Option<f64>,
        pub amount_minor: Option<i64>,
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub category: Option<String>,
        pub currency: Option<String>,
        pub tags: Option<Vec<String>>,
        pub recurrence: Option<Recurrence>,
        pub date: Option<DateTime<FixedOffset>>,
        /// An empty string clears the notes.
        pub notes: Option<String>,
    }

    /// Query string of `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionQuery {
        pub category: Option<String>,
        /// Comma separated; matches transactions carrying any of them.
        pub tags: Option<String>,
        /// Inclusive.
        #[serde(alias = "startDate")]
        pub start_date: Option<NaiveDate>,
        /// Inclusive.
        #[serde(alias = "endDate")]
        pub end_date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        /// Amount in the base currency.
        pub amount_minor: i64,
        /// Amount as entered, in `currency`.
        pub original_amount_minor: i64,
        pub currency: String,
        pub category: String,
        pub tags: Vec<String>,
        pub recurrence: Recurrence,
        pub date: DateTime<Utc>,
        pub notes: Option<String>,
        /// Set on savings moved into a goal.
        pub goal_id: Option<Uuid>,
        pub source_transaction_id: Option<Uuid>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub category: Option<String>,
        /// Must be >= 0.
        pub limit_minor: Option<i64>,
        /// 1-12.
        pub month: Option<u32>,
        pub year: Option<i32>,
    }

    /// Absent fields are kept. A new limit re-arms the overrun alert.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        pub category: Option<String>,
        pub limit_minor: Option<i64>,
        pub month: Option<u32>,
        pub year: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub category: String,
        pub limit_minor: i64,
        pub month: u32,
        pub year: i32,
        pub alert_sent: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetListResponse {
        pub budgets: Vec<BudgetView>,
    }

    /// Query string of `GET /budgets/status/check`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetStatusQuery {
        pub month: Option<u32>,
        pub year: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetStatusView {
        pub budget_id: Uuid,
        pub category: String,
        pub limit_minor: i64,
        pub spent_minor: i64,
        /// Two decimals; `null` for a zero limit.
        pub percentage: Option<f64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetStatusResponse {
        pub month: u32,
        pub year: i32,
        pub budgets: Vec<BudgetStatusView>,
    }
}

pub mod goal {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GoalNew {
        pub name: Option<String>,
        /// Must be > 0.
        pub target_minor: Option<i64>,
        /// Defaults to 0; at most `target_minor`.
        pub current_minor: Option<i64>,
        pub deadline: Option<NaiveDate>,
        pub auto_allocate: Option<bool>,
        /// Higher goes first under the `priority` allocation strategy.
        pub priority: Option<i32>,
        /// Per-goal allocation rate in basis points (1000 = 10%).
        pub allocation_rate_bps: Option<u32>,
    }

    /// Absent fields are kept. Raising `current_minor` records a manual
    /// contribution.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GoalUpdate {
        pub name: Option<String>,
        pub target_minor: Option<i64>,
        pub current_minor: Option<i64>,
        pub deadline: Option<NaiveDate>,
        pub auto_allocate: Option<bool>,
        pub priority: Option<i32>,
        pub allocation_rate_bps: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalView {
        pub id: Uuid,
        pub name: String,
        pub target_minor: i64,
        pub current_minor: i64,
        pub deadline: NaiveDate,
        pub auto_allocate: bool,
        pub priority: i32,
        pub allocation_rate_bps: Option<u32>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalListResponse {
        pub goals: Vec<GoalView>,
    }
}

pub mod notification {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum NotificationKind {
        BudgetExceeded,
        GoalAllocation,
        Reminder,
        UnusualSpending,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum NotificationStatus {
        Unread,
        Read,
    }

    /// Request body of `POST /notify`. The notification is always created
    /// for the caller.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct NotificationNew {
        pub message: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<NotificationKind>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NotificationView {
        pub id: Uuid,
        pub message: String,
        #[serde(rename = "type")]
        pub kind: NotificationKind,
        pub status: NotificationStatus,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NotificationListResponse {
        pub notifications: Vec<NotificationView>,
    }
}

pub mod report {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ReportKind {
        Monthly,
        Yearly,
        Custom,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReportNew {
        #[serde(rename = "type")]
        pub kind: Option<ReportKind>,
        /// Inclusive.
        #[serde(alias = "startDate")]
        pub start_date: Option<NaiveDate>,
        /// Inclusive.
        #[serde(alias = "endDate")]
        pub end_date: Option<NaiveDate>,
        /// Empty or absent means every category.
        pub categories: Option<Vec<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportDataView {
        pub total_income_minor: i64,
        pub total_expense_minor: i64,
        pub net_balance_minor: i64,
        /// Category label -> income and expense amounts added together.
        pub category_breakdown: BTreeMap<String, i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportView {
        pub id: Uuid,
        #[serde(rename = "type")]
        pub kind: ReportKind,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
        pub categories: Vec<String>,
        pub data: ReportDataView,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportListResponse {
        pub reports: Vec<ReportView>,
    }
}

pub mod exchange {
    use super::*;

    /// Query string of `GET /exchange-rate`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExchangeRateQuery {
        pub base: Option<String>,
        pub target: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExchangeRateView {
        pub base: String,
        pub target: String,
        /// Units of `target` bought by one unit of `base`.
        pub rate: f64,
    }
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Confirmation body of the delete endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
