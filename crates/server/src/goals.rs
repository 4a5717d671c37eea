//! Goals API endpoints

use api_types::MessageResponse;
use api_types::goal::{GoalListResponse, GoalNew, GoalUpdate, GoalView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{GoalNewCmd, GoalUpdateCmd};

use crate::{ServerError, parse_id, required, server::ServerState, user};

fn view(goal: engine::Goal) -> GoalView {
    GoalView {
        id: goal.id,
        name: goal.name,
        target_minor: goal.target_minor,
        current_minor: goal.current_minor,
        deadline: goal.deadline,
        auto_allocate: goal.auto_allocate,
        priority: goal.priority,
        allocation_rate_bps: goal.allocation_rate_bps,
        created_at: goal.created_at,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GoalNew>,
) -> Result<(StatusCode, Json<GoalView>), ServerError> {
    let name = required(payload.name, "name")?;
    let target_minor = required(payload.target_minor, "target_minor")?;
    let deadline = required(payload.deadline, "deadline")?;

    let mut cmd = GoalNewCmd::new(user.username, name, target_minor, deadline);
    if let Some(current_minor) = payload.current_minor {
        cmd = cmd.current_minor(current_minor);
    }
    if let Some(auto_allocate) = payload.auto_allocate {
        cmd = cmd.auto_allocate(auto_allocate);
    }
    if let Some(priority) = payload.priority {
        cmd = cmd.priority(priority);
    }
    if let Some(bps) = payload.allocation_rate_bps {
        cmd = cmd.allocation_rate_bps(bps);
    }

    let goal = state.engine.new_goal(cmd).await?;
    Ok((StatusCode::CREATED, Json(view(goal))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<GoalListResponse>, ServerError> {
    let goals = state.engine.goals(&user.username).await?;
    Ok(Json(GoalListResponse {
        goals: goals.into_iter().map(view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<GoalView>, ServerError> {
    let id = parse_id(&id, "goal")?;
    let goal = state.engine.goal(id, &user.username).await?;
    Ok(Json(view(goal)))
}

/// Partial update; a higher `current_minor` is booked as a contribution.
pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<GoalUpdate>,
) -> Result<Json<GoalView>, ServerError> {
    let id = parse_id(&id, "goal")?;

    let mut cmd = GoalUpdateCmd::new(id, user.username);
    if let Some(name) = payload.name {
        cmd = cmd.name(name);
    }
    if let Some(target_minor) = payload.target_minor {
        cmd = cmd.target_minor(target_minor);
    }
    if let Some(current_minor) = payload.current_minor {
        cmd = cmd.current_minor(current_minor);
    }
    if let Some(deadline) = payload.deadline {
        cmd = cmd.deadline(deadline);
    }
    if let Some(auto_allocate) = payload.auto_allocate {
        cmd = cmd.auto_allocate(auto_allocate);
    }
    if let Some(priority) = payload.priority {
        cmd = cmd.priority(priority);
    }
    if let Some(bps) = payload.allocation_rate_bps {
        cmd = cmd.allocation_rate_bps(bps);
    }

    let goal = state.engine.update_goal(cmd).await?;
    Ok(Json(view(goal)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    let id = parse_id(&id, "goal")?;
    state.engine.delete_goal(id, &user.username).await?;
    Ok(Json(MessageResponse {
        message: "Goal deleted successfully".to_string(),
    }))
}
