use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use api_types::ErrorResponse;
pub use server::{ServerState, router, run_with_listener};

mod budgets;
mod exchange;
mod goals;
mod notifications;
mod reports;
mod server;
mod transactions;
mod user;

pub mod types {
    pub mod transaction {
        pub use api_types::transaction::{
            TransactionListResponse, TransactionNew, TransactionQuery, TransactionUpdate,
            TransactionView,
        };
    }

    pub mod budget {
        pub use api_types::budget::{
            BudgetListResponse, BudgetNew, BudgetStatusQuery, BudgetStatusResponse, BudgetUpdate,
            BudgetView,
        };
    }

    pub mod goal {
        pub use api_types::goal::{GoalListResponse, GoalNew, GoalUpdate, GoalView};
    }

    pub mod notification {
        pub use api_types::notification::{
            NotificationListResponse, NotificationNew, NotificationView,
        };
    }

    pub mod report {
        pub use api_types::report::{ReportListResponse, ReportNew, ReportView};
    }

    pub mod exchange {
        pub use api_types::exchange::{ExchangeRateQuery, ExchangeRateView};
    }
}

pub enum ServerError {
    Engine(EngineError),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::MissingField(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidCategory(_)
        | EngineError::InvalidCurrency(_)
        | EngineError::InvalidPeriod(_)
        | EngineError::InvalidId(_)
        | EngineError::ExistingKey(_) => StatusCode::BAD_REQUEST,
        EngineError::RateUnavailable(_)
        | EngineError::Upstream(_)
        | EngineError::InvalidData(_)
        | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::InvalidData(msg) => {
            tracing::error!("invalid stored data: {msg}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let ServerError::Engine(err) = self;
        let (status, error) = (status_for_engine_error(&err), message_for_engine_error(err));

        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// Parse a path id, reporting a malformed one as a validation error.
fn parse_id(raw: &str, label: &str) -> Result<uuid::Uuid, ServerError> {
    uuid::Uuid::parse_str(raw.trim())
        .map_err(|_| EngineError::InvalidId(format!("invalid {label} id: {raw}")).into())
}

/// Resolve a request amount into minor units.
///
/// `amount_minor` is taken as is; otherwise the decimal `amount` is
/// converted. `None` when neither is present.
fn resolve_amount(amount_minor: Option<i64>, amount: Option<f64>) -> Result<Option<i64>, ServerError> {
    match (amount_minor, amount) {
        (Some(minor), _) => Ok(Some(minor)),
        (None, Some(amount)) => engine::Money::from_decimal(amount)
            .map(|money| Some(money.minor()))
            .ok_or_else(|| EngineError::InvalidAmount(format!("amount out of range: {amount}")).into()),
        (None, None) => Ok(None),
    }
}

/// Unwrap a required request field.
fn required<T>(value: Option<T>, field: &str) -> Result<T, ServerError> {
    value.ok_or_else(|| EngineError::MissingField(field.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_validation_maps_to_400() {
        for err in [
            EngineError::MissingField("amount".to_string()),
            EngineError::InvalidAmount("x".to_string()),
            EngineError::InvalidCurrency("x".to_string()),
            EngineError::ExistingKey("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn rate_provider_failures_map_to_500() {
        let res = ServerError::from(EngineError::Upstream("down".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let res =
            ServerError::from(EngineError::RateUnavailable("USD".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn database_message_is_hidden() {
        let err = EngineError::Database(sea_orm::DbErr::Custom("secret".to_string()));
        assert_eq!(message_for_engine_error(err), "internal server error");
    }

    #[test]
    fn minor_amount_wins_over_decimal_amount() {
        assert_eq!(resolve_amount(Some(120), Some(5.0)).ok(), Some(Some(120)));
        assert_eq!(resolve_amount(None, Some(12.5)).ok(), Some(Some(1_250)));
        assert_eq!(resolve_amount(None, None).ok(), Some(None));
        assert!(resolve_amount(None, Some(f64::INFINITY)).is_err());
    }

    #[test]
    fn malformed_id_is_a_validation_error() {
        let res = match parse_id("nope", "budget") {
            Err(err) => err.into_response(),
            Ok(_) => panic!("id should not parse"),
        };
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
