//! Transactions API endpoints

use api_types::MessageResponse;
use api_types::transaction::{
    Recurrence as ApiRecurrence, TransactionKind as ApiKind, TransactionListResponse,
    TransactionNew, TransactionQuery, TransactionUpdate, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{Currency, TransactionNewCmd, TransactionUpdateCmd};

use crate::{ServerError, parse_id, required, resolve_amount, server::ServerState, user};

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Income => ApiKind::Income,
        engine::TransactionKind::Expense => ApiKind::Expense,
    }
}

fn map_kind_in(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Income => engine::TransactionKind::Income,
        ApiKind::Expense => engine::TransactionKind::Expense,
    }
}

fn map_recurrence(recurrence: engine::Recurrence) -> ApiRecurrence {
    match recurrence {
        engine::Recurrence::None => ApiRecurrence::None,
        engine::Recurrence::Daily => ApiRecurrence::Daily,
        engine::Recurrence::Weekly => ApiRecurrence::Weekly,
        engine::Recurrence::Monthly => ApiRecurrence::Monthly,
    }
}

fn map_recurrence_in(recurrence: ApiRecurrence) -> engine::Recurrence {
    match recurrence {
        ApiRecurrence::None => engine::Recurrence::None,
        ApiRecurrence::Daily => engine::Recurrence::Daily,
        ApiRecurrence::Weekly => engine::Recurrence::Weekly,
        ApiRecurrence::Monthly => engine::Recurrence::Monthly,
    }
}

fn view(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: map_kind(tx.kind),
        amount_minor: tx.amount_minor,
        original_amount_minor: tx.original_amount_minor,
        currency: tx.currency.code().to_string(),
        category: tx.category,
        tags: tx.tags,
        recurrence: map_recurrence(tx.recurrence),
        date: tx.occurred_at,
        notes: tx.note,
        goal_id: tx.goal_id,
        source_transaction_id: tx.source_transaction_id,
        created_at: tx.created_at,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let amount_minor = required(resolve_amount(payload.amount_minor, payload.amount)?, "amount")?;
    let kind = required(payload.kind, "type")?;
    let category = required(payload.category, "category")?;
    let date = required(payload.date, "date")?;

    let mut cmd = TransactionNewCmd::new(
        user.username,
        map_kind_in(kind),
        amount_minor,
        category,
        date.with_timezone(&Utc),
    );
    if let Some(currency) = payload.currency {
        cmd = cmd.currency(Currency::try_from(currency.as_str())?);
    }
    if let Some(tags) = payload.tags {
        cmd = cmd.tags(tags);
    }
    if let Some(recurrence) = payload.recurrence {
        cmd = cmd.recurrence(map_recurrence_in(recurrence));
    }
    if let Some(notes) = payload.notes {
        cmd = cmd.note(notes);
    }

    let tx = state.engine.new_transaction(cmd).await?;
    Ok((StatusCode::CREATED, Json(view(tx))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let tags = query
        .tags
        .map(|tags| {
            tags.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    let filter = engine::TransactionListFilter {
        category: query.category,
        tags,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let txs = state.engine.transactions(&user.username, &filter).await?;
    Ok(Json(TransactionListResponse {
        transactions: txs.into_iter().map(view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionView>, ServerError> {
    let id = parse_id(&id, "transaction")?;
    let tx = state.engine.transaction(id, &user.username).await?;
    Ok(Json(view(tx)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let id = parse_id(&id, "transaction")?;

    let mut cmd = TransactionUpdateCmd::new(id, user.username);
    if let Some(kind) = payload.kind {
        cmd = cmd.kind(map_kind_in(kind));
    }
    if let Some(amount_minor) = resolve_amount(payload.amount_minor, payload.amount)? {
        cmd = cmd.amount_minor(amount_minor);
    }
    if let Some(currency) = payload.currency {
        cmd = cmd.currency(Currency::try_from(currency.as_str())?);
    }
    if let Some(category) = payload.category {
        cmd = cmd.category(category);
    }
    if let Some(tags) = payload.tags {
        cmd = cmd.tags(tags);
    }
    if let Some(recurrence) = payload.recurrence {
        cmd = cmd.recurrence(map_recurrence_in(recurrence));
    }
    if let Some(date) = payload.date {
        cmd = cmd.occurred_at(date.with_timezone(&Utc));
    }
    if let Some(notes) = payload.notes {
        cmd = cmd.note(notes);
    }

    let tx = state.engine.update_transaction(cmd).await?;
    Ok(Json(view(tx)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    let id = parse_id(&id, "transaction")?;
    state.engine.delete_transaction(id, &user.username).await?;
    Ok(Json(MessageResponse {
        message: "Transaction deleted successfully".to_string(),
    }))
}
