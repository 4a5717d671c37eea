//! Reports API endpoints

use api_types::MessageResponse;
use api_types::report::{
    ReportDataView, ReportKind as ApiKind, ReportListResponse, ReportNew, ReportView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{ReportKind, ReportNewCmd};

use crate::{ServerError, parse_id, required, server::ServerState, user};

fn view(report: engine::Report) -> ReportView {
    ReportView {
        id: report.id,
        kind: match report.kind {
            ReportKind::Monthly => ApiKind::Monthly,
            ReportKind::Yearly => ApiKind::Yearly,
            ReportKind::Custom => ApiKind::Custom,
        },
        start_date: report.start_date,
        end_date: report.end_date,
        categories: report.categories,
        data: ReportDataView {
            total_income_minor: report.data.total_income_minor,
            total_expense_minor: report.data.total_expense_minor,
            net_balance_minor: report.data.net_balance_minor,
            category_breakdown: report.data.category_breakdown,
        },
        created_at: report.created_at,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ReportNew>,
) -> Result<(StatusCode, Json<ReportView>), ServerError> {
    let start_date = required(payload.start_date, "start_date")?;
    let end_date = required(payload.end_date, "end_date")?;
    let kind = match payload.kind.unwrap_or(ApiKind::Custom) {
        ApiKind::Monthly => ReportKind::Monthly,
        ApiKind::Yearly => ReportKind::Yearly,
        ApiKind::Custom => ReportKind::Custom,
    };

    let mut cmd = ReportNewCmd::new(user.username, kind, start_date, end_date);
    if let Some(categories) = payload.categories {
        cmd = cmd.categories(categories);
    }

    let report = state.engine.new_report(cmd).await?;
    Ok((StatusCode::CREATED, Json(view(report))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<ReportListResponse>, ServerError> {
    let reports = state.engine.reports(&user.username).await?;
    Ok(Json(ReportListResponse {
        reports: reports.into_iter().map(view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<ReportView>, ServerError> {
    let id = parse_id(&id, "report")?;
    let report = state.engine.report(id, &user.username).await?;
    Ok(Json(view(report)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    let id = parse_id(&id, "report")?;
    state.engine.delete_report(id, &user.username).await?;
    Ok(Json(MessageResponse {
        message: "Report deleted successfully".to_string(),
    }))
}
