//! Budgets API endpoints

use api_types::MessageResponse;
use api_types::budget::{
    BudgetListResponse, BudgetNew, BudgetStatusQuery, BudgetStatusResponse, BudgetStatusView,
    BudgetUpdate, BudgetView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{BudgetNewCmd, BudgetUpdateCmd, EngineError};

use crate::{ServerError, parse_id, required, server::ServerState, user};

fn view(budget: engine::Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        category: budget.category,
        limit_minor: budget.limit_minor,
        month: budget.month,
        year: budget.year,
        alert_sent: budget.alert_sent,
        created_at: budget.created_at,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let category = required(payload.category, "category")?;
    let limit_minor = required(payload.limit_minor, "limit_minor")?;
    let month = required(payload.month, "month")?;
    let year = required(payload.year, "year")?;

    let budget = state
        .engine
        .new_budget(BudgetNewCmd::new(
            user.username,
            category,
            limit_minor,
            month,
            year,
        ))
        .await?;
    Ok((StatusCode::CREATED, Json(view(budget))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<BudgetListResponse>, ServerError> {
    let budgets = state.engine.budgets(&user.username).await?;
    Ok(Json(BudgetListResponse {
        budgets: budgets.into_iter().map(view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<BudgetView>, ServerError> {
    let id = parse_id(&id, "budget")?;
    let budget = state.engine.budget(id, &user.username).await?;
    Ok(Json(view(budget)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<BudgetUpdate>,
) -> Result<Json<BudgetView>, ServerError> {
    let id = parse_id(&id, "budget")?;

    let mut cmd = BudgetUpdateCmd::new(id, user.username);
    if let Some(category) = payload.category {
        cmd = cmd.category(category);
    }
    if let Some(limit_minor) = payload.limit_minor {
        cmd = cmd.limit_minor(limit_minor);
    }
    cmd.month = payload.month;
    cmd.year = payload.year;

    let budget = state.engine.update_budget(cmd).await?;
    Ok(Json(view(budget)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    let id = parse_id(&id, "budget")?;
    state.engine.delete_budget(id, &user.username).await?;
    Ok(Json(MessageResponse {
        message: "Budget deleted successfully".to_string(),
    }))
}

/// Spend and percentage used of every budget in a month.
pub async fn status(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<BudgetStatusQuery>,
) -> Result<Json<BudgetStatusResponse>, ServerError> {
    let (Some(month), Some(year)) = (query.month, query.year) else {
        return Err(EngineError::MissingField("month and year".to_string()).into());
    };

    let statuses = state
        .engine
        .budget_status(&user.username, month, year)
        .await?;
    Ok(Json(BudgetStatusResponse {
        month,
        year,
        budgets: statuses
            .into_iter()
            .map(|status| BudgetStatusView {
                budget_id: status.budget_id,
                category: status.category,
                limit_minor: status.limit_minor,
                spent_minor: status.spent_minor,
                percentage: status.percentage,
            })
            .collect(),
    }))
}
