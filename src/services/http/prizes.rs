use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{invalid_payload, AppState};
use crate::models::prizes::{self, NewPrize, PrizeDraw};
use crate::services::{self, prizes::PrizeRequest, ServiceError};

pub async fn get_catalog() -> impl IntoResponse {
    Json(prizes::catalog())
}

pub async fn list_prizes(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let prizes = services::call("Http => Prizes", &state.prize_channel, |response| {
        PrizeRequest::ListPrizes { response }
    })
    .await?;

    Ok(Json(prizes))
}

pub async fn get_latest_prize(
    State(state): State<AppState>,
    Path(referrer_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let prize = services::call("Http => Prizes", &state.prize_channel, |response| {
        PrizeRequest::GetLatestPrize {
            referrer_id,
            response,
        }
    })
    .await?;

    Ok(Json(prize))
}

pub async fn record_prize(
    State(state): State<AppState>,
    payload: Result<Json<NewPrize>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(prize) = payload.map_err(invalid_payload)?;

    let prize = services::call("Http => Prizes", &state.prize_channel, |response| {
        PrizeRequest::RecordPrize { prize, response }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(prize)))
}

pub async fn draw_prize(
    State(state): State<AppState>,
    payload: Result<Json<PrizeDraw>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(draw) = payload.map_err(invalid_payload)?;

    let prize = services::call("Http => Prizes", &state.prize_channel, |response| {
        PrizeRequest::DrawPrize { draw, response }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(prize)))
}
