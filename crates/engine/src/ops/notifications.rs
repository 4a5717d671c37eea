use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Notification, NotificationKind, NotificationNewCmd, NotificationStatus,
    ResultEngine, notifications, util::ensure_owner,
};

use super::{Engine, with_tx};

/// Append a notification for `user_id`.
pub(super) async fn insert_notification<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    kind: NotificationKind,
    message: String,
) -> ResultEngine<Notification> {
    let notification = Notification {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        message,
        kind,
        status: NotificationStatus::Unread,
        created_at: Utc::now(),
    };
    notifications::ActiveModel {
        id: ActiveValue::Set(notification.id),
        user_id: ActiveValue::Set(notification.user_id.clone()),
        message: ActiveValue::Set(notification.message.clone()),
        kind: ActiveValue::Set(kind.as_str().to_string()),
        status: ActiveValue::Set(notification.status.as_str().to_string()),
        created_at: ActiveValue::Set(notification.created_at),
    }
    .insert(db)
    .await?;
    tracing::debug!(user_id, kind = kind.as_str(), "notification created");
    Ok(notification)
}

async fn require_notification<C: ConnectionTrait>(
    db: &C,
    notification_id: Uuid,
    user_id: &str,
) -> ResultEngine<notifications::Model> {
    let model = notifications::Entity::find_by_id(notification_id)
        .one(db)
        .await?;
    ensure_owner(model, |m| m.user_id.as_str(), user_id, "notification")
}

impl Engine {
    /// Create a notification for the caller.
    pub async fn new_notification(&self, cmd: NotificationNewCmd) -> ResultEngine<Notification> {
        let message = cmd.message.trim();
        if message.is_empty() {
            return Err(EngineError::MissingField(
                "message must not be empty".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let notification =
                insert_notification(&db_tx, &cmd.user_id, cmd.kind, message.to_string()).await?;
            Ok(notification)
        })
    }

    /// Notifications of `user_id`, newest first.
    pub async fn notifications(&self, user_id: &str) -> ResultEngine<Vec<Notification>> {
        let models = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .order_by_desc(notifications::Column::CreatedAt)
            .order_by_desc(notifications::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Notification::try_from).collect()
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Notification> {
        with_tx!(self, |db_tx| {
            let model = require_notification(&db_tx, notification_id, user_id).await?;
            let mut active: notifications::ActiveModel = model.into();
            active.status = ActiveValue::Set(NotificationStatus::Read.as_str().to_string());
            let model = active.update(&db_tx).await?;
            Notification::try_from(model)
        })
    }

    pub async fn delete_notification(
        &self,
        notification_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            require_notification(&db_tx, notification_id, user_id).await?;
            notifications::Entity::delete_by_id(notification_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
