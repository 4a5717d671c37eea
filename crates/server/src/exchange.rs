//! Exchange rate lookup

use api_types::exchange::{ExchangeRateQuery, ExchangeRateView};
use axum::{
    Extension, Json,
    extract::{Query, State},
};

use crate::{ServerError, required, server::ServerState, user};

pub async fn rate(
    _: Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ExchangeRateQuery>,
) -> Result<Json<ExchangeRateView>, ServerError> {
    let base = required(query.base, "base")?;
    let target = required(query.target, "target")?;

    let rate = state.engine.exchange_rate(&base, &target).await?;
    Ok(Json(ExchangeRateView {
        base: base.trim().to_ascii_uppercase(),
        target: target.trim().to_ascii_uppercase(),
        rate,
    }))
}
