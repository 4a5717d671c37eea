use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Report, ReportData, ReportNewCmd, ResultEngine, reports, transactions,
    util::{day_range_bounds, ensure_owner, normalize_category},
};

use super::{Engine, transactions::hydrate, with_tx};

async fn require_report<C: ConnectionTrait>(
    db: &C,
    report_id: Uuid,
    user_id: &str,
) -> ResultEngine<reports::Model> {
    let model = reports::Entity::find_by_id(report_id).one(db).await?;
    ensure_owner(model, |m| m.user_id.as_str(), user_id, "report")
}

impl Engine {
    /// Aggregate the owner's transactions between two dates (both
    /// inclusive) and store the result.
    ///
    /// A non-empty `categories` restricts the report to those categories,
    /// compared by normalized key.
    pub async fn new_report(&self, cmd: ReportNewCmd) -> ResultEngine<Report> {
        let (from, to) = day_range_bounds(Some(cmd.start_date), Some(cmd.end_date))?;

        let mut labels: Vec<String> = Vec::with_capacity(cmd.categories.len());
        let mut keys: Vec<String> = Vec::with_capacity(cmd.categories.len());
        for category in &cmd.categories {
            let (display, key) = normalize_category(category)?;
            if !keys.contains(&key) {
                labels.push(display);
                keys.push(key);
            }
        }

        with_tx!(self, |db_tx| {
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(cmd.user_id.as_str()))
                .order_by_asc(transactions::Column::OccurredAt)
                .order_by_asc(transactions::Column::CreatedAt);
            if let Some(from) = from {
                query = query.filter(transactions::Column::OccurredAt.gte(from));
            }
            if let Some(to) = to {
                query = query.filter(transactions::Column::OccurredAt.lt(to));
            }
            if !keys.is_empty() {
                query = query.filter(transactions::Column::CategoryNorm.is_in(keys.clone()));
            }
            let txs = hydrate(&db_tx, query.all(&db_tx).await?).await?;
            let data = ReportData::aggregate(&txs)?;

            let report = Report {
                id: Uuid::new_v4(),
                user_id: cmd.user_id.clone(),
                kind: cmd.kind,
                start_date: cmd.start_date,
                end_date: cmd.end_date,
                categories: labels.clone(),
                data,
                created_at: Utc::now(),
            };

            reports::ActiveModel {
                id: ActiveValue::Set(report.id),
                user_id: ActiveValue::Set(report.user_id.clone()),
                kind: ActiveValue::Set(report.kind.as_str().to_string()),
                start_date: ActiveValue::Set(report.start_date),
                end_date: ActiveValue::Set(report.end_date),
                categories: ActiveValue::Set(serde_json::to_string(&report.categories)?),
                data: ActiveValue::Set(serde_json::to_string(&report.data)?),
                created_at: ActiveValue::Set(report.created_at),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(
                user_id = %report.user_id,
                report_id = %report.id,
                transactions = txs.len(),
                "report generated"
            );
            Ok(report)
        })
    }

    /// Reports of `user_id`, newest first.
    pub async fn reports(&self, user_id: &str) -> ResultEngine<Vec<Report>> {
        let models = reports::Entity::find()
            .filter(reports::Column::UserId.eq(user_id))
            .order_by_desc(reports::Column::CreatedAt)
            .order_by_desc(reports::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Report::try_from).collect()
    }

    pub async fn report(&self, report_id: Uuid, user_id: &str) -> ResultEngine<Report> {
        let model = require_report(&self.database, report_id, user_id).await?;
        Report::try_from(model)
    }

    pub async fn delete_report(&self, report_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            require_report(&db_tx, report_id, user_id).await?;
            reports::Entity::delete_by_id(report_id).exec(&db_tx).await?;
            Ok(())
        })
    }
}
