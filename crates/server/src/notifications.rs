//! Notifications API endpoints

use api_types::MessageResponse;
use api_types::notification::{
    NotificationKind as ApiKind, NotificationListResponse, NotificationNew,
    NotificationStatus as ApiStatus, NotificationView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{NotificationKind, NotificationNewCmd, NotificationStatus};

use crate::{ServerError, parse_id, required, server::ServerState, user};

fn map_kind(kind: NotificationKind) -> ApiKind {
    match kind {
        NotificationKind::BudgetExceeded => ApiKind::BudgetExceeded,
        NotificationKind::GoalAllocation => ApiKind::GoalAllocation,
        NotificationKind::Reminder => ApiKind::Reminder,
        NotificationKind::UnusualSpending => ApiKind::UnusualSpending,
    }
}

fn map_kind_in(kind: ApiKind) -> NotificationKind {
    match kind {
        ApiKind::BudgetExceeded => NotificationKind::BudgetExceeded,
        ApiKind::GoalAllocation => NotificationKind::GoalAllocation,
        ApiKind::Reminder => NotificationKind::Reminder,
        ApiKind::UnusualSpending => NotificationKind::UnusualSpending,
    }
}

fn view(notification: engine::Notification) -> NotificationView {
    NotificationView {
        id: notification.id,
        message: notification.message,
        kind: map_kind(notification.kind),
        status: match notification.status {
            NotificationStatus::Unread => ApiStatus::Unread,
            NotificationStatus::Read => ApiStatus::Read,
        },
        created_at: notification.created_at,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<NotificationNew>,
) -> Result<(StatusCode, Json<NotificationView>), ServerError> {
    let message = required(payload.message, "message")?;
    let kind = required(payload.kind, "type")?;

    let notification = state
        .engine
        .new_notification(NotificationNewCmd::new(
            user.username,
            map_kind_in(kind),
            message,
        ))
        .await?;
    Ok((StatusCode::CREATED, Json(view(notification))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<NotificationListResponse>, ServerError> {
    let notifications = state.engine.notifications(&user.username).await?;
    Ok(Json(NotificationListResponse {
        notifications: notifications.into_iter().map(view).collect(),
    }))
}

pub async fn mark_read(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<NotificationView>, ServerError> {
    let id = parse_id(&id, "notification")?;
    let notification = state
        .engine
        .mark_notification_read(id, &user.username)
        .await?;
    Ok(Json(view(notification)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    let id = parse_id(&id, "notification")?;
    state.engine.delete_notification(id, &user.username).await?;
    Ok(Json(MessageResponse {
        message: "Notification deleted successfully".to_string(),
    }))
}
