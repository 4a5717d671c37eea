//! Command structs for engine operations.
//!
//! These types group parameters for write operations (create/update of
//! transactions, budgets, goals, reports and notifications), keeping call
//! sites readable and avoiding long argument lists.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{Currency, NotificationKind, Recurrence, ReportKind, TransactionKind};

/// Record an income or an expense.
#[derive(Clone, Debug)]
pub struct TransactionNewCmd {
    pub user_id: String,
    pub kind: TransactionKind,
    /// Amount in `currency` minor units.
    pub amount_minor: i64,
    pub currency: Currency,
    pub category: String,
    pub tags: Vec<String>,
    pub recurrence: Recurrence,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl TransactionNewCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        kind: TransactionKind,
        amount_minor: i64,
        category: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            amount_minor,
            currency: Currency::base(),
            category: category.into(),
            tags: Vec::new(),
            recurrence: Recurrence::None,
            occurred_at,
            note: None,
        }
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Partial update of a transaction; `None` keeps the stored value.
///
/// When `amount_minor` or `currency` is set the amount is converted again
/// to the base currency.
#[derive(Clone, Debug)]
pub struct TransactionUpdateCmd {
    pub transaction_id: Uuid,
    pub user_id: String,
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub currency: Option<Currency>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub recurrence: Option<Recurrence>,
    pub occurred_at: Option<DateTime<Utc>>,
    /// An empty string clears the note.
    pub note: Option<String>,
}

impl TransactionUpdateCmd {
    #[must_use]
    pub fn new(transaction_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            transaction_id,
            user_id: user_id.into(),
            kind: None,
            amount_minor: None,
            currency: None,
            category: None,
            tags: None,
            recurrence: None,
            occurred_at: None,
            note: None,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Create a monthly spending limit for one category.
#[derive(Clone, Debug)]
pub struct BudgetNewCmd {
    pub user_id: String,
    pub category: String,
    pub limit_minor: i64,
    pub month: u32,
    pub year: i32,
}

impl BudgetNewCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        category: impl Into<String>,
        limit_minor: i64,
        month: u32,
        year: i32,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            category: category.into(),
            limit_minor,
            month,
            year,
        }
    }
}

/// Partial update of a budget; a new limit re-arms the overrun alert.
#[derive(Clone, Debug)]
pub struct BudgetUpdateCmd {
    pub budget_id: Uuid,
    pub user_id: String,
    pub category: Option<String>,
    pub limit_minor: Option<i64>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl BudgetUpdateCmd {
    #[must_use]
    pub fn new(budget_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            budget_id,
            user_id: user_id.into(),
            category: None,
            limit_minor: None,
            month: None,
            year: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn limit_minor(mut self, limit_minor: i64) -> Self {
        self.limit_minor = Some(limit_minor);
        self
    }

    #[must_use]
    pub fn period(mut self, month: u32, year: i32) -> Self {
        self.month = Some(month);
        self.year = Some(year);
        self
    }
}

/// Create a savings goal.
#[derive(Clone, Debug)]
pub struct GoalNewCmd {
    pub user_id: String,
    pub name: String,
    pub target_minor: i64,
    pub current_minor: i64,
    pub deadline: NaiveDate,
    pub auto_allocate: bool,
    pub priority: i32,
    pub allocation_rate_bps: Option<u32>,
}

impl GoalNewCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        target_minor: i64,
        deadline: NaiveDate,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            target_minor,
            current_minor: 0,
            deadline,
            auto_allocate: false,
            priority: 0,
            allocation_rate_bps: None,
        }
    }

    #[must_use]
    pub fn current_minor(mut self, current_minor: i64) -> Self {
        self.current_minor = current_minor;
        self
    }

    #[must_use]
    pub fn auto_allocate(mut self, auto_allocate: bool) -> Self {
        self.auto_allocate = auto_allocate;
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn allocation_rate_bps(mut self, bps: u32) -> Self {
        self.allocation_rate_bps = Some(bps);
        self
    }
}

/// Partial update of a goal.
///
/// Raising `current_minor` is recorded as a manual contribution.
#[derive(Clone, Debug)]
pub struct GoalUpdateCmd {
    pub goal_id: Uuid,
    pub user_id: String,
    pub name: Option<String>,
    pub target_minor: Option<i64>,
    pub current_minor: Option<i64>,
    pub deadline: Option<NaiveDate>,
    pub auto_allocate: Option<bool>,
    pub priority: Option<i32>,
    pub allocation_rate_bps: Option<u32>,
}

impl GoalUpdateCmd {
    #[must_use]
    pub fn new(goal_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            goal_id,
            user_id: user_id.into(),
            name: None,
            target_minor: None,
            current_minor: None,
            deadline: None,
            auto_allocate: None,
            priority: None,
            allocation_rate_bps: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn target_minor(mut self, target_minor: i64) -> Self {
        self.target_minor = Some(target_minor);
        self
    }

    #[must_use]
    pub fn current_minor(mut self, current_minor: i64) -> Self {
        self.current_minor = Some(current_minor);
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn auto_allocate(mut self, auto_allocate: bool) -> Self {
        self.auto_allocate = Some(auto_allocate);
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn allocation_rate_bps(mut self, bps: u32) -> Self {
        self.allocation_rate_bps = Some(bps);
        self
    }
}

/// Generate and store a report over an inclusive date range.
#[derive(Clone, Debug)]
pub struct ReportNewCmd {
    pub user_id: String,
    pub kind: ReportKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Empty means every category.
    pub categories: Vec<String>,
}

impl ReportNewCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        kind: ReportKind,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            start_date,
            end_date,
            categories: Vec::new(),
        }
    }

    #[must_use]
    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Clone, Debug)]
pub struct NotificationNewCmd {
    pub user_id: String,
    pub kind: NotificationKind,
    pub message: String,
}

impl NotificationNewCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            message: message.into(),
        }
    }
}
