pub use allocation::{
    AllocationPolicy, AllocationShare, AllocationStrategy, DEFAULT_ALLOCATION_RATE_BPS,
};
pub use budgets::{Budget, BudgetEvaluation, BudgetStatus};
pub use commands::{
    BudgetNewCmd, BudgetUpdateCmd, GoalNewCmd, GoalUpdateCmd, NotificationNewCmd, ReportNewCmd,
    TransactionNewCmd, TransactionUpdateCmd,
};
pub use currency::{BASE_CURRENCY_CODE, Currency};
pub use effects::{EffectKind, EffectRun, EffectStatus, SideEffect};
pub use error::EngineError;
pub use goals::Goal;
pub use money::{BPS_SCALE, Money};
pub use notifications::{Notification, NotificationKind, NotificationStatus};
pub use ops::{Engine, EngineBuilder, TransactionListFilter};
pub use rates::{
    CurrencyConverter, DEFAULT_RATE_TIMEOUT, FixedRateProvider, HttpRateProvider, RateProvider,
};
pub use reports::{Report, ReportData, ReportKind};
pub use transactions::{Recurrence, Transaction, TransactionKind};

mod allocation;
mod budgets;
mod commands;
mod currency;
mod effects;
mod error;
mod goals;
mod money;
mod notifications;
mod ops;
mod rates;
mod reports;
mod transaction_tags;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
